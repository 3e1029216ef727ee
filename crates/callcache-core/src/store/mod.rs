//! Durable on-device storage for the call-sign dataset.
//!
//! The `RecordStore` trait describes the synchronous storage operations:
//! exact-key reads, ordered range reads over the upper-cased call sign,
//! full scans, all-or-nothing batch writes and a small metadata table.
//! `SqliteStore` is the SQLite-backed implementation.
//!
//! `StoreHandle` is what the rest of the crate talks to. Every call it makes
//! runs on Tokio's blocking pool, so store I/O never stalls the async
//! executor.

pub mod sqlite;

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::models::CallsignEntry;

pub use sqlite::SqliteStore;

/// Metadata key for the population marker.
pub const DATA_LOADED_KEY: &str = "dataLoaded";

/// Sorts after every character a call sign can contain; appended to a prefix
/// to form the upper bound of a prefix range.
pub const HIGH_SENTINEL: char = char::MAX;

pub trait RecordStore: Send + Sync + 'static {
    /// Create or migrate the schema. Safe to call more than once.
    fn open(&self) -> Result<()>;

    /// Exact lookup. The caller passes an already normalized call sign.
    fn get_by_key(&self, call_sign: &str) -> Result<Option<CallsignEntry>>;

    /// Entries whose upper-cased call sign lies in `[low, high]`, ascending,
    /// at most `limit` of them.
    fn range_by_normalized(&self, low: &str, high: &str, limit: usize)
        -> Result<Vec<CallsignEntry>>;

    /// Visit every entry in storage order until the visitor breaks.
    fn scan_all(&self, visit: &mut dyn FnMut(CallsignEntry) -> ControlFlow<()>) -> Result<()>;

    /// Commit one batch atomically. Existing call signs are overwritten.
    fn write_batch(&self, entries: &[CallsignEntry]) -> Result<()>;

    /// Delete every entry and every metadata value.
    fn clear_all(&self) -> Result<()>;

    fn get_meta(&self, key: &str) -> Result<Option<serde_json::Value>>;

    fn set_meta(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    fn count(&self) -> Result<usize>;
}

/// Cheaply cloneable async front for a `RecordStore`.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn RecordStore>,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { inner: store }
    }

    /// Run a closure against the store on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn RecordStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(store.as_ref())).await?
    }

    pub async fn open(&self) -> Result<()> {
        self.run(|store| store.open()).await
    }

    pub async fn get_by_key(&self, call_sign: String) -> Result<Option<CallsignEntry>> {
        self.run(move |store| store.get_by_key(&call_sign)).await
    }

    pub async fn range_by_prefix(&self, prefix: String, limit: usize) -> Result<Vec<CallsignEntry>> {
        self.run(move |store| {
            let mut high = prefix.clone();
            high.push(HIGH_SENTINEL);
            store.range_by_normalized(&prefix, &high, limit)
        })
        .await
    }

    pub async fn write_batch(&self, entries: Vec<CallsignEntry>) -> Result<()> {
        self.run(move |store| store.write_batch(&entries)).await
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.run(|store| store.clear_all()).await
    }

    pub async fn count(&self) -> Result<usize> {
        self.run(|store| store.count()).await
    }

    pub async fn get_meta<T>(&self, key: &'static str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.run(move |store| match store.get_meta(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        })
        .await
    }

    pub async fn set_meta<T>(&self, key: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value)?;
        self.run(move |store| store.set_meta(key, &value)).await
    }
}
