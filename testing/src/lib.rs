//! # GeoGuard Testing
//!
//! Testing utilities and helpers for the GeoGuard workspace.
//!
//! This crate provides:
//! - Controllable [`Clock`] implementations
//! - Well-known coordinates for movement scenarios
//! - Property-based testing strategies
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```
//! use geoguard_testing::{test_clock, MockClock};
//! use geoguard_core::environment::Clock;
//! use std::time::Duration;
//!
//! let clock = MockClock::from(test_clock());
//! let start = clock.now_millis();
//! clock.advance(Duration::from_secs(30));
//! assert_eq!(clock.now_millis() - start, 30_000);
//! ```

use chrono::{DateTime, Utc};
use geoguard_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same instant, so a test can hold one handle while
    /// the engine holds another.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        millis: Arc<AtomicI64>,
    }

    impl MockClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                millis: Arc::new(AtomicI64::new(time.timestamp_millis())),
            }
        }

        /// Move the clock forward.
        #[allow(clippy::cast_possible_truncation)]
        pub fn advance(&self, by: Duration) {
            self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
        }

        /// Move the clock backward.
        #[allow(clippy::cast_possible_truncation)]
        pub fn rewind(&self, by: Duration) {
            self.millis.fetch_sub(by.as_millis() as i64, Ordering::SeqCst);
        }

        /// Jump to an absolute time.
        pub fn set(&self, time: DateTime<Utc>) {
            self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
        }
    }

    impl From<FixedClock> for MockClock {
        fn from(clock: FixedClock) -> Self {
            Self::new(clock.time)
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            geoguard_core::environment::from_millis(self.millis.load(Ordering::SeqCst))
        }

        fn now_millis(&self) -> i64 {
            self.millis.load(Ordering::SeqCst)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Well-known coordinates (latitude, longitude) for movement scenarios.
pub mod fixtures {
    /// Ferry Building, San Francisco.
    pub const SAN_FRANCISCO: (f64, f64) = (37.7955, -122.3937);

    /// Times Square, New York. Roughly 4,130 km from [`SAN_FRANCISCO`].
    pub const NEW_YORK: (f64, f64) = (40.7580, -73.9855);

    /// Trafalgar Square, London. Roughly 5,570 km from [`NEW_YORK`].
    pub const LONDON: (f64, f64) = (51.5080, -0.1281);

    /// Meters per degree of latitude, good enough for short test hops.
    pub const METERS_PER_DEGREE: f64 = 111_195.0;

    /// Offset a point northwards by `meters`.
    #[must_use]
    pub fn north_of(origin: (f64, f64), meters: f64) -> (f64, f64) {
        (origin.0 + meters / METERS_PER_DEGREE, origin.1)
    }

    /// A back-and-forth track: alternating hops north and south of `origin`.
    ///
    /// Every interior point reverses direction, which is what spoofing tools
    /// produce when they jitter around a fixed coordinate.
    #[must_use]
    pub fn zigzag_track(origin: (f64, f64), hop_meters: f64, points: usize) -> Vec<(f64, f64)> {
        (0..points)
            .map(|i| {
                if i % 2 == 0 {
                    origin
                } else {
                    north_of(origin, hop_meters)
                }
            })
            .collect()
    }

    /// A straight walk north in equal hops.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn straight_track(origin: (f64, f64), hop_meters: f64, points: usize) -> Vec<(f64, f64)> {
        (0..points)
            .map(|i| north_of(origin, hop_meters * i as f64))
            .collect()
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// Any valid latitude.
    pub fn latitude() -> impl Strategy<Value = f64> {
        -90.0f64..=90.0
    }

    /// Any valid longitude.
    pub fn longitude() -> impl Strategy<Value = f64> {
        -180.0f64..=180.0
    }

    /// Any valid (latitude, longitude) pair.
    pub fn coordinate() -> impl Strategy<Value = (f64, f64)> {
        (latitude(), longitude())
    }

    /// Trust deltas well beyond the score range.
    pub fn trust_delta() -> impl Strategy<Value = i32> {
        -1000i32..=1000
    }
}

/// Install a compact tracing subscriber for tests.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoguard=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock, MockClock};
