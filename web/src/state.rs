//! Shared handler state.

use geoguard_engine::{AntiCheatService, Environment};
use std::sync::Arc;

/// State shared by every handler.
pub struct AppState<E: Environment> {
    /// Engine facade.
    pub service: AntiCheatService<E>,
}

impl<E: Environment> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<E: Environment> AppState<E> {
    /// Wrap an environment.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self {
            service: AntiCheatService::new(env),
        }
    }
}
