//! Offline call-sign lookup cache.
//!
//! Downloads the call-sign → operator-name dataset once, keeps it in a local
//! SQLite database and answers exact and partial lookups without touching
//! the network again until a refresh is requested.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use callcache_core::{CallsignLookup, Config};
//!
//! let config = Config::load()?.resolve()?;
//! let lookup = CallsignLookup::from_config(&config)?;
//! if let Some(op) = lookup.lookup_exact("w1aw").await? {
//!     println!("{}", op.full_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod lookup;
pub mod models;
pub mod store;

pub use config::{Config, LookupConfig};
pub use error::LookupError;
pub use loader::{DatasetLoader, DatasetSource, HttpDatasetSource, LoadReport};
pub use lookup::{CallsignLookup, DEFAULT_MAX_RESULTS};
pub use models::{CacheStatus, CallsignEntry, CallsignLookupResult};
pub use store::{RecordStore, SqliteStore};
