//! # GeoGuard Engine
//!
//! Server-side anti-cheat and trust scoring for location-based games.
//!
//! ## Features
//!
//! - **Location validation**: speed, teleport, movement-pattern and device checks
//! - **Rate limiting**: sliding window with cooldown, per player and action
//! - **Trust scoring**: bounded 0-100 score, tiers and automatic escalation
//! - **Evidence log**: suspicious activities with an admin review queue
//! - **Enforcement**: warnings, temporary and permanent bans
//!
//! ## Architecture
//!
//! Components are thin structs over a shared [`Environment`] that supplies
//! stores, clock and configuration. Every per-player write is an optimistic
//! compare-and-swap, so concurrent reports for one player never lose updates.
//!
//! ```text
//! AntiCheatService ──► LocationValidator ──► TrustScoreManager ──► EnforcementEngine
//!        │                     │                     │
//!        └──► RateLimiter ─────┴──► SuspiciousActivityLog ◄──┘
//! ```
//!
//! ## Example
//!
//! ```
//! use geoguard_engine::mocks::InMemoryEnvironment;
//! use geoguard_engine::model::{Caller, LocationReport};
//! use geoguard_engine::{AntiCheatService, EngineConfig};
//! use geoguard_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let env = InMemoryEnvironment::in_memory(EngineConfig::default(), Arc::new(SystemClock));
//! let service = AntiCheatService::new(Arc::new(env));
//!
//! let caller = Caller::authenticated("player-1", &[]);
//! let now = chrono::Utc::now().timestamp_millis();
//! let verdict = service
//!     .validate_location(&caller, LocationReport::new(37.7749, -122.4194, 10.0, now), None)
//!     .await
//!     .unwrap();
//! assert!(verdict.is_valid);
//! # });
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod activity;
pub mod audit;
pub mod config;
pub mod constants;
pub mod enforcement;
pub mod environment;
pub mod error;
pub mod geo;
pub mod maintenance;
pub mod model;
pub mod providers;
pub mod rate_limit;
pub mod service;
pub mod stores;
pub mod trust;
pub mod validator;

/// In-memory stores for tests and local development.
#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use activity::SuspiciousActivityLog;
pub use config::{EngineConfig, MaintenanceConfig};
pub use enforcement::EnforcementEngine;
pub use environment::{Environment, GuardEnvironment};
pub use error::{EngineError, Result};
pub use maintenance::MaintenanceScheduler;
pub use rate_limit::RateLimiter;
pub use service::AntiCheatService;
pub use stores::RedisEnvironment;
pub use trust::TrustScoreManager;
pub use validator::LocationValidator;
