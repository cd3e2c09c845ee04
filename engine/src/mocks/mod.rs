//! In-memory store implementations.
//!
//! Used by unit and integration tests and by the server's `memory` backend.
//! State lives for the lifetime of the process only.

pub mod activity;
pub mod store;

pub use activity::InMemoryActivityStore;
pub use store::{InMemoryRateLimitStore, InMemoryStore, OutageSwitch};

use crate::config::EngineConfig;
use crate::environment::GuardEnvironment;
use crate::model::{AccountRecord, UserLocationHistory, UserTrustScore};
use geoguard_core::environment::Clock;
use std::sync::Arc;

/// Environment backed entirely by in-memory stores.
pub type InMemoryEnvironment = GuardEnvironment<
    InMemoryStore<UserLocationHistory>,
    InMemoryStore<UserTrustScore>,
    InMemoryRateLimitStore,
    InMemoryActivityStore,
    InMemoryStore<AccountRecord>,
>;

impl InMemoryEnvironment {
    /// Fresh in-memory environment.
    #[must_use]
    pub fn in_memory(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_outage(config, clock, &OutageSwitch::new())
    }

    /// Fresh in-memory environment whose stores all obey `outage`.
    #[must_use]
    pub fn with_outage(config: EngineConfig, clock: Arc<dyn Clock>, outage: &OutageSwitch) -> Self {
        Self::new(
            InMemoryStore::with_outage(outage.clone()),
            InMemoryStore::with_outage(outage.clone()),
            InMemoryRateLimitStore::with_outage(outage.clone()),
            InMemoryActivityStore::with_outage(outage.clone()),
            InMemoryStore::with_outage(outage.clone()),
            clock,
            Arc::new(config),
        )
    }
}
