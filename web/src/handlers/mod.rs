//! HTTP request handlers, one module per operation group.

pub mod admin;
pub mod health;
pub mod location;
pub mod rate_limit;
pub mod trust;

pub use health::health_check;
