pub mod disk;
pub mod memory;

use crate::core::config::{AppConfig, StorageKind};
use crate::core::project::{ProjectPatch, ProjectRecord};
use anyhow::Context;
use async_trait::async_trait;
use disk::DiskProjectStore;
use memory::MemoryProjectStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project {0} already exists")]
    Duplicate(i64),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Stored record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

impl From<fjall::Error> for StoreError {
    fn from(e: fjall::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// CRUD access to project records.
///
/// Each call is atomic on its own. `update` reads, merges and writes back, so
/// two concurrent updates of one project may overwrite each other.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_by_name_and_year(
        &self,
        name: &str,
        year: i32,
    ) -> Result<Vec<ProjectRecord>, StoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Vec<ProjectRecord>, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ProjectRecord>, StoreError>;

    /// Inserts a new record. Fails with [`StoreError::Duplicate`] when the id
    /// is taken.
    async fn create(&self, record: ProjectRecord) -> Result<ProjectRecord, StoreError>;

    /// Returns `false` when no project has this id.
    async fn update(&self, id: i64, patch: ProjectPatch) -> Result<bool, StoreError>;

    /// Returns `false` when no project has this id.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Opens the store selected by the configuration.
pub fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ProjectStore>> {
    match config.storage {
        StorageKind::Memory => {
            info!("Using in-memory project store");
            Ok(Arc::new(MemoryProjectStore::new()))
        }
        StorageKind::Disk => {
            let path = config.default_data_path()?.join("projects");
            info!("Using project store at {}", path.display());
            let store = DiskProjectStore::open(&path)
                .with_context(|| format!("Failed to open project store: {}", path.display()))?;
            Ok(Arc::new(store))
        }
    }
}
