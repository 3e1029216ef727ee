//! Data models for the call-sign cache.
//!
//! - `CallsignEntry`: one operator row as stored
//! - `CallsignLookupResult`: an entry with its "Last, First" display name
//! - `PopulationMarker`, `CacheStatus`: load state of the local cache

pub mod callsign;

pub use callsign::{
    normalize_call_sign, CacheStatus, CallsignEntry, CallsignLookupResult, PopulationMarker,
};
