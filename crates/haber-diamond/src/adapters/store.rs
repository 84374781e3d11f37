//! # Diamond Stores
//!
//! Persistence adapters for `DiamondSnapshot`.
//!
//! - `InMemoryStore`: keeps the last snapshot in memory
//! - `JsonFileStore`: one JSON document on disk, replaced atomically by
//!   writing a sibling temp file and renaming it over the target

use crate::domain::entities::DiamondSnapshot;
use crate::errors::StoreError;
use crate::ports::outbound::DiamondStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Snapshot holder for tests and ephemeral diamonds.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    snapshot: Mutex<Option<DiamondSnapshot>>,
    saves: Mutex<u64>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        *self.saves.lock()
    }
}

#[async_trait]
impl DiamondStore for InMemoryStore {
    async fn load(&self) -> Result<Option<DiamondSnapshot>, StoreError> {
        Ok(self.snapshot.lock().clone())
    }

    async fn save(&self, snapshot: &DiamondSnapshot) -> Result<(), StoreError> {
        *self.snapshot.lock() = Some(snapshot.clone());
        *self.saves.lock() += 1;
        Ok(())
    }
}

// =============================================================================
// JSON FILE
// =============================================================================

/// Snapshot stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DiamondStore for JsonFileStore {
    async fn load(&self) -> Result<Option<DiamondSnapshot>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let snapshot = serde_json::from_slice(&raw)?;
        debug!(path = %self.path.display(), bytes = raw.len(), "Loaded diamond snapshot");
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &DiamondSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let raw = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &raw).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = raw.len(), "Saved diamond snapshot");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
