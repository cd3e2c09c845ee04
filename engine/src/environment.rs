//! Engine environment.
//!
//! Everything a component needs from the outside world: the five stores,
//! a clock and the immutable configuration. Components are cheap views over
//! an `Arc` of the environment, so they can construct one another freely.

use crate::config::EngineConfig;
use crate::providers::{
    AccountStore, ActivityStore, LocationHistoryStore, RateLimitStore, TrustScoreStore,
};
use geoguard_core::environment::Clock;
use std::sync::Arc;

/// Dependencies of the engine components.
pub trait Environment: Send + Sync + 'static {
    /// Location history store.
    type Histories: LocationHistoryStore;
    /// Trust score store.
    type TrustScores: TrustScoreStore;
    /// Rate-limit window store.
    type RateLimits: RateLimitStore;
    /// Suspicious activity store.
    type Activities: ActivityStore;
    /// Account restriction store.
    type Accounts: AccountStore;

    /// Location histories.
    fn histories(&self) -> &Self::Histories;
    /// Trust scores.
    fn trust_scores(&self) -> &Self::TrustScores;
    /// Rate-limit windows.
    fn rate_limits(&self) -> &Self::RateLimits;
    /// Suspicious activities.
    fn activities(&self) -> &Self::Activities;
    /// Account restrictions.
    fn accounts(&self) -> &Self::Accounts;
    /// Time source.
    fn clock(&self) -> &dyn Clock;
    /// Immutable configuration.
    fn config(&self) -> &EngineConfig;
}

/// Concrete environment assembled from store implementations.
///
/// # Type Parameters
///
/// - `H`: location history store
/// - `T`: trust score store
/// - `R`: rate-limit store
/// - `A`: suspicious activity store
/// - `AC`: account store
pub struct GuardEnvironment<H, T, R, A, AC> {
    /// Location histories.
    pub histories: H,
    /// Trust scores.
    pub trust_scores: T,
    /// Rate-limit windows.
    pub rate_limits: R,
    /// Suspicious activities.
    pub activities: A,
    /// Account restrictions.
    pub accounts: AC,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Immutable configuration.
    pub config: Arc<EngineConfig>,
}

impl<H, T, R, A, AC> GuardEnvironment<H, T, R, A, AC>
where
    H: LocationHistoryStore + 'static,
    T: TrustScoreStore + 'static,
    R: RateLimitStore + 'static,
    A: ActivityStore + 'static,
    AC: AccountStore + 'static,
{
    /// Assemble an environment.
    #[must_use]
    pub fn new(
        histories: H,
        trust_scores: T,
        rate_limits: R,
        activities: A,
        accounts: AC,
        clock: Arc<dyn Clock>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            histories,
            trust_scores,
            rate_limits,
            activities,
            accounts,
            clock,
            config,
        }
    }
}

impl<H, T, R, A, AC> Environment for GuardEnvironment<H, T, R, A, AC>
where
    H: LocationHistoryStore + 'static,
    T: TrustScoreStore + 'static,
    R: RateLimitStore + 'static,
    A: ActivityStore + 'static,
    AC: AccountStore + 'static,
{
    type Histories = H;
    type TrustScores = T;
    type RateLimits = R;
    type Activities = A;
    type Accounts = AC;

    fn histories(&self) -> &H {
        &self.histories
    }

    fn trust_scores(&self) -> &T {
        &self.trust_scores
    }

    fn rate_limits(&self) -> &R {
        &self.rate_limits
    }

    fn activities(&self) -> &A {
        &self.activities
    }

    fn accounts(&self) -> &AC {
        &self.accounts
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn config(&self) -> &EngineConfig {
        &self.config
    }
}
