//! `CallsignLookup`: the public face of the cache.
//!
//! Every public operation first calls `ensure_ready`, which opens the store
//! and downloads the dataset if it has never been fully loaded. The
//! initialization runs as a spawned task whose result is shared, so callers
//! that arrive while it is in flight wait on the same task instead of
//! starting a second download. A failed initialization is not cached: the
//! next call starts over.
//!
//! `force_refresh` clears the store and reloads it in a task of its own.
//! Once the cache is ready, lookups never wait on a refresh: they read
//! whatever is committed, which may be an empty or partially reloaded store.
//! Only the callers of `force_refresh` see a refresh's outcome.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::engine;
use crate::config::LookupConfig;
use crate::error::{LookupError, Result};
use crate::loader::{DatasetLoader, DatasetSource, HttpDatasetSource, LoadReport};
use crate::models::{CacheStatus, CallsignLookupResult, PopulationMarker};
use crate::store::{RecordStore, SqliteStore, StoreHandle, DATA_LOADED_KEY};

type SharedTask = Shared<BoxFuture<'static, Result<Option<LoadReport>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    Initialize,
    Refresh,
}

enum InitState {
    Uninitialized,
    Initializing { generation: u64, task: SharedTask },
    Ready,
}

struct Lifecycle {
    state: InitState,
    /// In-flight refresh, shared by concurrent `force_refresh` callers.
    refresh: Option<(u64, SharedTask)>,
    next_generation: u64,
}

struct Inner {
    store: StoreHandle,
    loader: DatasetLoader,
    lifecycle: Mutex<Lifecycle>,
}

/// Call-sign lookups backed by a local, lazily populated cache.
/// Clone is cheap; clones share the same store and initialization state.
#[derive(Clone)]
pub struct CallsignLookup {
    inner: Arc<Inner>,
}

impl CallsignLookup {
    pub fn new(store: Arc<dyn RecordStore>, source: Arc<dyn DatasetSource>, batch_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: StoreHandle::new(store),
                loader: DatasetLoader::new(source, batch_size),
                lifecycle: Mutex::new(Lifecycle {
                    state: InitState::Uninitialized,
                    refresh: None,
                    next_generation: 0,
                }),
            }),
        }
    }

    /// SQLite store at the configured path, HTTP source at the configured URL.
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(config.database_path.clone()));
        let source = Arc::new(HttpDatasetSource::new(config.dataset_url.clone())?);
        Ok(Self::new(store, source, config.batch_size))
    }

    // ===== Lifecycle =====

    /// Open and populate the store if that has not happened yet.
    pub async fn ensure_ready(&self) -> Result<()> {
        let (generation, task) = {
            let mut lifecycle = self.inner.lifecycle.lock().await;
            match &lifecycle.state {
                InitState::Ready => return Ok(()),
                InitState::Initializing { generation, task } => (*generation, task.clone()),
                InitState::Uninitialized => {
                    let (generation, task) = self.start_task(&mut lifecycle, TaskKind::Initialize);
                    lifecycle.state = InitState::Initializing {
                        generation,
                        task: task.clone(),
                    };
                    (generation, task)
                }
            }
        };
        self.settle(generation, task).await.map(|_| ())
    }

    /// Alias for `ensure_ready`, for consumers that want to warm the cache early.
    pub async fn initialize(&self) -> Result<()> {
        self.ensure_ready().await
    }

    /// Clear everything and download the dataset again.
    pub async fn force_refresh(&self) -> Result<LoadReport> {
        loop {
            let (generation, task, kind) = {
                let mut lifecycle = self.inner.lifecycle.lock().await;
                if let Some((generation, task)) = &lifecycle.refresh {
                    (*generation, task.clone(), TaskKind::Refresh)
                } else if let InitState::Initializing { generation, task } = &lifecycle.state {
                    (*generation, task.clone(), TaskKind::Initialize)
                } else {
                    let (generation, task) = self.start_task(&mut lifecycle, TaskKind::Refresh);
                    lifecycle.refresh = Some((generation, task.clone()));
                    // Before first use the refresh doubles as the initialization
                    if matches!(lifecycle.state, InitState::Uninitialized) {
                        lifecycle.state = InitState::Initializing {
                            generation,
                            task: task.clone(),
                        };
                    }
                    (generation, task, TaskKind::Refresh)
                }
            };

            match kind {
                TaskKind::Refresh => {
                    return self
                        .settle(generation, task)
                        .await?
                        .ok_or_else(|| LookupError::TaskFailed("Refresh finished without loading".to_string()));
                }
                TaskKind::Initialize => {
                    // Let the first-use initialization finish, then refresh on top of it
                    let _ = self.settle(generation, task).await;
                }
            }
        }
    }

    fn start_task(&self, lifecycle: &mut Lifecycle, kind: TaskKind) -> (u64, SharedTask) {
        let generation = lifecycle.next_generation;
        lifecycle.next_generation += 1;

        let inner = Arc::clone(&self.inner);
        // Spawned so the load finishes even if every caller stops waiting
        let handle = tokio::spawn(async move {
            match kind {
                TaskKind::Initialize => run_initialize(&inner).await,
                TaskKind::Refresh => run_refresh(&inner).await.map(Some),
            }
        });
        let task = handle
            .map(|joined| joined.unwrap_or_else(|e| Err(LookupError::from(e))))
            .boxed()
            .shared();
        (generation, task)
    }

    /// Wait for a task and record its outcome in whichever slots it still owns.
    async fn settle(&self, generation: u64, task: SharedTask) -> Result<Option<LoadReport>> {
        let result = task.await;

        let mut lifecycle = self.inner.lifecycle.lock().await;
        if matches!(lifecycle.refresh, Some((current, _)) if current == generation) {
            lifecycle.refresh = None;
        }
        if let InitState::Initializing { generation: current, .. } = &lifecycle.state {
            if *current == generation {
                lifecycle.state = match &result {
                    Ok(_) => InitState::Ready,
                    Err(_) => InitState::Uninitialized,
                };
            }
        }
        result
    }

    // ===== Queries =====

    /// Look up a call sign exactly, ignoring case.
    pub async fn lookup_exact(&self, call_sign: &str) -> Result<Option<CallsignLookupResult>> {
        self.ensure_ready().await?;
        engine::lookup_exact(&self.inner.store, call_sign).await
    }

    /// Prefix matches first, then substring matches, at most `max_results`.
    pub async fn search_partial(&self, term: &str, max_results: Option<usize>) -> Result<Vec<CallsignLookupResult>> {
        self.ensure_ready().await?;
        let max_results = max_results.unwrap_or(engine::DEFAULT_MAX_RESULTS);
        engine::search_partial(&self.inner.store, term, max_results).await
    }

    /// "Last, First" for a call sign, if known.
    pub async fn formatted_name(&self, call_sign: &str) -> Result<Option<String>> {
        Ok(self.lookup_exact(call_sign).await?.map(|r| r.full_name))
    }

    pub async fn is_populated(&self) -> Result<bool> {
        self.ensure_ready().await?;
        engine::is_populated(&self.inner.store).await
    }

    pub async fn status(&self) -> Result<CacheStatus> {
        self.ensure_ready().await?;
        let store = &self.inner.store;
        let marker: Option<PopulationMarker> = store.get_meta(DATA_LOADED_KEY).await?;
        Ok(CacheStatus {
            populated: marker.as_ref().is_some_and(|m| m.loaded),
            record_count: store.count().await?,
            loaded_at: marker.map(|m| m.loaded_at),
        })
    }
}

/// Open the store and load the dataset unless a complete load is recorded.
async fn run_initialize(inner: &Inner) -> Result<Option<LoadReport>> {
    inner.store.open().await?;

    if engine::is_populated(&inner.store).await? {
        info!("Using cached callsign data");
        return Ok(None);
    }

    // Rows left behind by an earlier failed load must not survive the retry
    inner.store.clear_all().await?;
    match inner.loader.load(&inner.store).await {
        Ok(report) => Ok(Some(report)),
        Err(e) => {
            warn!(error = %e, "Callsign data load failed");
            Err(e)
        }
    }
}

async fn run_refresh(inner: &Inner) -> Result<LoadReport> {
    inner.store.open().await?;
    inner.store.clear_all().await?;
    info!("Cleared callsign cache for refresh");

    inner.loader.load(&inner.store).await.map_err(|e| {
        warn!(error = %e, "Callsign data refresh failed");
        e
    })
}
