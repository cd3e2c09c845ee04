//! Prometheus metrics for the anti-cheat engine.
//!
//! This module describes and records every GeoGuard metric:
//! - Location validations and their verdicts
//! - Rate-limit denials
//! - Fail-open decisions taken during store outages
//! - Enforcement actions
//! - Store call retries
//!
//! # Example
//!
//! ```rust,no_run
//! use geoguard_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Serve `server.render()` on /metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should be bound to.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Describe all metrics and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the recorder cannot be installed for a reason other
    /// than one already being installed (which happens in tests).
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!(
        "geoguard_validations_total",
        "Location reports validated, labelled by verdict"
    );
    describe_counter!(
        "geoguard_rate_limit_denied_total",
        "Rate-limited actions that were denied"
    );
    describe_counter!(
        "geoguard_fail_open_total",
        "Operations answered without the store, labelled by operation"
    );
    describe_counter!(
        "geoguard_enforcement_total",
        "Warnings and bans issued, labelled by kind"
    );
    describe_counter!(
        "geoguard_store_retries_total",
        "Store calls retried after a transient failure"
    );
}

/// Validation metrics recorder.
pub struct ValidationMetrics;

impl ValidationMetrics {
    /// Record one verdict.
    pub fn record(valid: bool) {
        counter!("geoguard_validations_total", "valid" => if valid { "true" } else { "false" })
            .increment(1);
    }
}

/// Rate-limit metrics recorder.
pub struct RateLimitMetrics;

impl RateLimitMetrics {
    /// Record a denied action.
    pub fn record_denied() {
        counter!("geoguard_rate_limit_denied_total").increment(1);
    }
}

/// Fail-open metrics recorder.
pub struct FailOpenMetrics;

impl FailOpenMetrics {
    /// Record an operation answered without the store.
    pub fn record(operation: &'static str) {
        counter!("geoguard_fail_open_total", "operation" => operation).increment(1);
    }
}

/// Enforcement metrics recorder.
pub struct EnforcementMetrics;

impl EnforcementMetrics {
    /// Record an enforcement action (`warning`, `temp_ban`, `perm_ban`).
    pub fn record(kind: &'static str) {
        counter!("geoguard_enforcement_total", "kind" => kind).increment(1);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retried store call.
    pub fn record_attempt() {
        counter!("geoguard_store_retries_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[test]
    fn test_metrics_server_render() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        ValidationMetrics::record(false);
        FailOpenMetrics::record("check_rate_limit");
        EnforcementMetrics::record("warning");

        // Another test may have installed the recorder first.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("geoguard_validations_total"));
            assert!(rendered.contains("geoguard_fail_open_total"));
            assert!(rendered.contains("geoguard_enforcement_total"));
        }
    }
}
