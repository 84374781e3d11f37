//! # Node Store
//!
//! Picks the snapshot backend from configuration: a JSON file when a state
//! path is set, memory otherwise.

use async_trait::async_trait;
use haber_diamond::adapters::{InMemoryStore, JsonFileStore};
use haber_diamond::domain::entities::DiamondSnapshot;
use haber_diamond::errors::StoreError;
use haber_diamond::ports::outbound::DiamondStore;

use crate::config::StorageConfig;

/// Snapshot backend selected at startup.
#[derive(Debug)]
pub enum NodeStore {
    /// State lives only as long as the process.
    Memory(InMemoryStore),
    /// State survives restarts.
    File(JsonFileStore),
}

impl NodeStore {
    /// Backend for `config`.
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        match &config.state_path {
            Some(path) => Self::File(JsonFileStore::new(path)),
            None => Self::Memory(InMemoryStore::new()),
        }
    }

    /// Short backend name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "json-file",
        }
    }
}

#[async_trait]
impl DiamondStore for NodeStore {
    async fn load(&self) -> Result<Option<DiamondSnapshot>, StoreError> {
        match self {
            Self::Memory(store) => store.load().await,
            Self::File(store) => store.load().await,
        }
    }

    async fn save(&self, snapshot: &DiamondSnapshot) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.save(snapshot).await,
            Self::File(store) => store.save(snapshot).await,
        }
    }
}
