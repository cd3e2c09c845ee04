//! # GeoGuard Runtime
//!
//! Resilience primitives for calls that cross the persistent-store boundary:
//!
//! - [`retry`]: bounded retry with exponential backoff and jitter
//! - [`deadline`]: caller-side time budget for a whole operation
//! - [`metrics`]: Prometheus recorder and GeoGuard metric names
//!
//! Both are policy-free: they report failure, and the caller decides whether
//! to fail open or surface the error.

pub mod metrics;
pub mod retry;

/// Caller-side deadlines.
pub mod deadline {
    use std::future::Future;
    use std::time::Duration;
    use thiserror::Error;

    /// The operation did not finish within its time budget.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
    #[error("deadline of {budget:?} exceeded")]
    pub struct DeadlineExceeded {
        /// The budget that was exceeded.
        pub budget: Duration,
    }

    /// Run `operation` with a time budget.
    ///
    /// The future is dropped when the budget elapses, which cancels any
    /// in-flight store round trip at its next await point.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineExceeded`] when the budget elapses first.
    pub async fn with_deadline<F>(budget: Duration, operation: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        tokio::time::timeout(budget, operation)
            .await
            .map_err(|_| DeadlineExceeded { budget })
    }

}

pub use deadline::{with_deadline, DeadlineExceeded};
pub use retry::{retry_if, RetryPolicy};
