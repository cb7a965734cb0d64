//! Shared application state for the Axum server.

use std::sync::Arc;

use tokio::sync::Mutex;

use orofacial_core::catalog::{BundledFile, ExerciseSource, NoBundle};
use orofacial_core::clock::{system_time, TimeSource};
use orofacial_core::error::Result;
use orofacial_core::{BlobStore, ExerciseCatalog, FileStore, SessionStore, TrackerConfig};

/// Session history and the catalog, each behind one async mutex so that
/// mutations are serialized.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Mutex<SessionStore>>,
    pub catalog: Arc<Mutex<ExerciseCatalog>>,
}

impl AppState {
    pub fn new(sessions: SessionStore, catalog: ExerciseCatalog) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions)),
            catalog: Arc::new(Mutex::new(catalog)),
        }
    }

    /// Open both stores against the same blob store.
    pub fn open(
        store: Arc<dyn BlobStore>,
        bundled: &dyn ExerciseSource,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let catalog = ExerciseCatalog::open(store.clone(), bundled, time.clone());
        let sessions = SessionStore::open(store, time);
        Self::new(sessions, catalog)
    }

    /// Open the file-backed stores described by `config`.
    pub fn from_config(config: &TrackerConfig) -> Result<Self> {
        let store: Arc<dyn BlobStore> = Arc::new(FileStore::open(&config.data_dir)?);
        let state = match &config.bundled_exercises {
            Some(path) => Self::open(store, &BundledFile::new(path), system_time()),
            None => Self::open(store, &NoBundle, system_time()),
        };
        Ok(state)
    }
}

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}
