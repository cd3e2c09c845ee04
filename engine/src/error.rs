//! Error types for the anti-cheat engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy for validation, scoring, rate limiting and enforcement.
///
/// Malformed telemetry is never an error: it produces a verdict with
/// saturated risk instead. Errors are reserved for caller identity,
/// unknown references and infrastructure failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // ═══════════════════════════════════════════════════════════
    // Caller Errors
    // ═══════════════════════════════════════════════════════════

    /// No authenticated caller identity was supplied.
    #[error("Caller is not authenticated")]
    Unauthenticated,

    /// Caller lacks the privilege required for the operation.
    #[error("Permission denied: requires {required}")]
    PermissionDenied {
        /// Claim that was missing
        required: String,
    },

    /// Request payload could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ═══════════════════════════════════════════════════════════
    // Review Errors
    // ═══════════════════════════════════════════════════════════

    /// Suspicious activity does not exist.
    #[error("Suspicious activity {0} not found")]
    ActivityNotFound(String),

    /// Suspicious activity has already been reviewed.
    #[error("Suspicious activity {0} has already been reviewed")]
    AlreadyReviewed(String),

    // ═══════════════════════════════════════════════════════════
    // Store Errors
    // ═══════════════════════════════════════════════════════════

    /// Optimistic update lost every race for the key.
    #[error("Concurrent update conflict on {key}")]
    Conflict {
        /// Store key that kept changing underneath us
        key: String,
    },

    /// Persistent store could not be reached or rejected the call.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Operation exceeded its caller-side time budget.
    #[error("Operation timed out")]
    Timeout,

    /// Stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not be exposed to players).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns `true` if retrying the operation may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geoguard_engine::EngineError;
    /// assert!(EngineError::Timeout.is_transient());
    /// assert!(!EngineError::Unauthenticated.is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Timeout | Self::Conflict { .. }
        )
    }

    /// Returns `true` if the error was caused by the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// # use geoguard_engine::EngineError;
    /// assert!(EngineError::Unauthenticated.is_caller_error());
    /// assert!(!EngineError::Timeout.is_caller_error());
    /// ```
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated
                | Self::PermissionDenied { .. }
                | Self::InvalidInput(_)
                | Self::ActivityNotFound(_)
                | Self::AlreadyReviewed(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<geoguard_runtime::DeadlineExceeded> for EngineError {
    fn from(_: geoguard_runtime::DeadlineExceeded) -> Self {
        Self::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_transient() {
        assert!(EngineError::StoreUnavailable("down".into()).is_transient());
        assert!(EngineError::Conflict { key: "k".into() }.is_transient());
        assert!(!EngineError::AlreadyReviewed("a".into()).is_transient());
        assert!(!EngineError::Serialization("bad".into()).is_transient());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            EngineError::PermissionDenied { required: "admin".into() }.to_string(),
            "Permission denied: requires admin"
        );
        assert_eq!(
            EngineError::ActivityNotFound("abc".into()).to_string(),
            "Suspicious activity abc not found"
        );
    }
}
