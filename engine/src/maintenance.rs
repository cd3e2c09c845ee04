//! Scheduled maintenance.
//!
//! Prunes rate-limit windows nobody has touched within the retention
//! period. Pruning only deletes, and live checks always refresh
//! `last_attempt`, so it is safe to run alongside traffic.

use crate::config::MaintenanceConfig;
use crate::environment::Environment;
use crate::error::Result;
use crate::providers::RateLimitStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Delete rate-limit windows whose last attempt is older than `retention`.
///
/// # Errors
///
/// Returns error if the rate-limit store is unavailable.
pub async fn prune_rate_limits<E: Environment>(env: &E, retention: Duration) -> Result<usize> {
    let retention_millis = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
    let cutoff = env.clock().now_millis().saturating_sub(retention_millis);

    let removed = env.rate_limits().prune_stale(cutoff).await?;
    tracing::info!(removed, cutoff, "Pruned stale rate-limit windows");
    Ok(removed)
}

/// Runs [`prune_rate_limits`] on a fixed interval until shut down.
pub struct MaintenanceScheduler<E: Environment> {
    env: Arc<E>,
    config: MaintenanceConfig,
}

impl<E: Environment> MaintenanceScheduler<E> {
    /// Create a scheduler.
    #[must_use]
    pub const fn new(env: Arc<E>, config: MaintenanceConfig) -> Self {
        Self { env, config }
    }

    /// Run on a background task.
    #[must_use]
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` fires or its sender is dropped.
    ///
    /// The first run happens one interval after start. Failed runs are
    /// logged and the schedule continues.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            retention_secs = self.config.retention.as_secs(),
            "Maintenance scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = prune_rate_limits(self.env.as_ref(), self.config.retention).await {
                        tracing::error!(error = %e, "Rate-limit pruning failed, will retry next interval");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Maintenance scheduler stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::mocks::{InMemoryEnvironment, OutageSwitch};
    use crate::rate_limit::RateLimiter;
    use crate::model::UserId;
    use geoguard_testing::{test_clock, MockClock};

    #[tokio::test]
    async fn test_prune_respects_retention() {
        let clock = MockClock::from(test_clock());
        let env = Arc::new(InMemoryEnvironment::in_memory(EngineConfig::default(), Arc::new(clock.clone())));
        let limiter = RateLimiter::new(Arc::clone(&env));

        limiter.check(&UserId::from("idle"), "attack").await.unwrap();
        clock.advance(Duration::from_secs(50 * 60));
        limiter.check(&UserId::from("active"), "attack").await.unwrap();
        clock.advance(Duration::from_secs(11 * 60));

        let removed = prune_rate_limits(env.as_ref(), Duration::from_secs(60 * 60)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(env.rate_limits.len(), 1);
    }

    #[tokio::test]
    async fn test_scheduler_survives_failed_runs() {
        let clock = MockClock::from(test_clock());
        let outage = OutageSwitch::new();
        let env = Arc::new(InMemoryEnvironment::with_outage(
            EngineConfig::default(),
            Arc::new(clock.clone()),
            &outage,
        ));

        RateLimiter::new(Arc::clone(&env))
            .check(&UserId::from("idle"), "attack")
            .await
            .unwrap();
        clock.advance(Duration::from_secs(2 * 60 * 60));

        outage.take_down();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let config = MaintenanceConfig::new(Duration::from_secs(60 * 60), Duration::from_millis(10));
        let handle = MaintenanceScheduler::new(Arc::clone(&env), config).spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(env.rate_limits.len(), 1);

        outage.restore();
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(env.rate_limits.is_empty());

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
