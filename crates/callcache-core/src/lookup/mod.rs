//! Call-sign queries and the lifecycle that keeps the cache populated.
//!
//! - `engine`: exact and partial (prefix, then contains) queries
//! - `service`: `CallsignLookup`, lazy one-time initialization and refresh

pub mod engine;
pub mod service;

pub use engine::DEFAULT_MAX_RESULTS;
pub use service::CallsignLookup;
