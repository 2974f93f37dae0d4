pub mod machine;
pub mod view;

use std::sync::Arc;
use std::time::Instant;

use crate::{
    catalog::QuestionCatalog,
    config::AppConfig,
    store::{SessionStore, memory::MemoryStore},
};

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the session store, the question catalog, and
/// the runtime configuration.
pub struct AppState {
    store: Arc<dyn SessionStore>,
    catalog: Arc<QuestionCatalog>,
    config: AppConfig,
    started_at: Instant,
}

impl AppState {
    /// Construct the state backed by the in-memory store, wrapped in an
    /// [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, catalog: QuestionCatalog) -> SharedState {
        let store = Arc::new(MemoryStore::new(config.change_channel_capacity));
        Self::with_store(config, catalog, store)
    }

    /// Construct the state over an explicit store implementation.
    pub fn with_store(
        config: AppConfig,
        catalog: QuestionCatalog,
        store: Arc<dyn SessionStore>,
    ) -> SharedState {
        Arc::new(Self {
            store,
            catalog: Arc::new(catalog),
            config,
            started_at: Instant::now(),
        })
    }

    /// Handle to the session store.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    /// The process-wide question catalog.
    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Seconds since the state was constructed, for health reporting.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
