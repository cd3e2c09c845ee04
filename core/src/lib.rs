//! # GeoGuard Core
//!
//! Shared abstractions for the GeoGuard anti-cheat workspace.
//!
//! The engine never reads the system clock directly. Every component that
//! needs "now" receives a [`environment::Clock`] through its environment,
//! which keeps rate-limit windows, ban expiry and evidence timestamps
//! deterministic under test.
//!
//! ## Example
//!
//! ```
//! use geoguard_core::environment::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! assert!(clock.now_millis() > 0);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the component environment.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{DateTime, Utc};
    /// use geoguard_core::environment::Clock;
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Current time as Unix milliseconds.
        ///
        /// Telemetry and rate-limit windows are stored in milliseconds.
        fn now_millis(&self) -> i64 {
            self.now().timestamp_millis()
        }
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Convert Unix milliseconds to a UTC timestamp.
    ///
    /// Out-of-range values collapse to the Unix epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
    }
}
