//! Dataset loading: fetch the remote text, parse it, write it in batches.
//!
//! The population marker is written only after every batch has committed,
//! so an interrupted load is never mistaken for a complete one.

pub mod csv;
pub mod source;

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::models::{CallsignEntry, PopulationMarker};
use crate::store::{StoreHandle, DATA_LOADED_KEY};

pub use csv::{parse, ParsedDataset};
pub use source::{DatasetSource, HttpDatasetSource};

/// Default number of entries committed per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Summary of a completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub records: usize,
    pub batches: usize,
    pub skipped_lines: usize,
}

/// Sole writer of call-sign entries.
#[derive(Clone)]
pub struct DatasetLoader {
    source: Arc<dyn DatasetSource>,
    batch_size: usize,
}

impl DatasetLoader {
    pub fn new(source: Arc<dyn DatasetSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch, parse and store the full dataset, then set the marker.
    pub async fn load(&self, store: &StoreHandle) -> Result<LoadReport> {
        info!("Downloading callsign data...");
        let text = self.source.fetch_raw().await?;

        // Parsing tens of thousands of lines is CPU work; keep it off the executor
        let parsed = tokio::task::spawn_blocking(move || parse(&text)).await?;
        let records = parsed.entries.len();
        debug!(records, skipped = parsed.skipped_lines, "Parsed callsign dataset");

        let batches = self.store(store, parsed.entries).await?;

        store
            .set_meta(DATA_LOADED_KEY, &PopulationMarker::loaded(records))
            .await?;

        info!(records, batches, "Callsign data loaded successfully");
        Ok(LoadReport {
            records,
            batches,
            skipped_lines: parsed.skipped_lines,
        })
    }

    /// Write entries sequentially in fixed-size batches. Returns the number
    /// of batches committed. Stops at the first failed batch.
    pub async fn store(&self, store: &StoreHandle, mut entries: Vec<CallsignEntry>) -> Result<usize> {
        let mut batches = 0;
        while !entries.is_empty() {
            let rest = entries.split_off(self.batch_size.min(entries.len()));
            let batch = std::mem::replace(&mut entries, rest);
            let len = batch.len();

            store.write_batch(batch).await?;
            batches += 1;
            debug!(batch = batches, records = len, "Committed callsign batch");
        }
        Ok(batches)
    }
}
