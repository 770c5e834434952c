//! Durable artifact store.
//!
//! Trained models are opaque blobs to the store: it only moves bytes by key.
//! The file-backed implementation keeps one JSON file per key under a
//! configured directory; the in-memory one backs tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

pub const FORECAST_MODEL_KEY: &str = "forecast_model.json";
pub const DECISION_MODEL_KEY: &str = "decision_model.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store poisoned")]
    Poisoned,
}

pub trait ArtifactStore: Send + Sync {
    /// Returns the stored bytes for `key`, or `None` when nothing was saved.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// Loads and decodes a JSON artifact; absent keys stay `None`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn ArtifactStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.load(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(
    store: &dyn ArtifactStore,
    key: &str,
    artifact: &T,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(artifact)?;
    store.save(key, &bytes)
}

/// Filesystem store: one file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), bytes)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
