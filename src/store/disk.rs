use super::{ProjectStore, StoreError};
use crate::core::project::{ProjectPatch, ProjectRecord};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "projects";

/// Project store persisted in a fjall keyspace. Records are JSON values keyed
/// by the big-endian project id.
pub struct DiskProjectStore {
    keyspace: Keyspace,
    projects: PartitionHandle,
    // Serializes writers so the duplicate check in `create` holds.
    write_lock: Mutex<()>,
}

fn key(id: i64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn read(projects: &PartitionHandle, id: i64) -> Result<Option<ProjectRecord>, StoreError> {
    match projects.get(key(id))? {
        Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
        None => Ok(None),
    }
}

fn write(
    keyspace: &Keyspace,
    projects: &PartitionHandle,
    record: &ProjectRecord,
) -> Result<(), StoreError> {
    projects.insert(key(record.project_id), serde_json::to_vec(record)?)?;
    keyspace.persist(PersistMode::SyncAll)?;
    Ok(())
}

impl DiskProjectStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::Backend(e.to_string()))?;

        let keyspace = fjall::Config::new(path).open()?;
        let projects = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            projects,
            write_lock: Mutex::new(()),
        })
    }

    /// Runs a write on the blocking pool. Every write ends in an fsync.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Keyspace, &PartitionHandle) -> Result<T, StoreError> + Send + 'static,
    {
        let keyspace = self.keyspace.clone();
        let projects = self.projects.clone();
        tokio::task::spawn_blocking(move || op(&keyspace, &projects))
            .await
            .map_err(|e| StoreError::Backend(format!("Store task failed: {e}")))?
    }

    fn scan<F>(&self, predicate: F) -> Result<Vec<ProjectRecord>, StoreError>
    where
        F: Fn(&ProjectRecord) -> bool,
    {
        let mut found = Vec::new();
        for item in self.projects.iter() {
            let (_, value) = item?;
            let record: ProjectRecord = serde_json::from_slice(&value)?;
            if predicate(&record) {
                found.push(record);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl ProjectStore for DiskProjectStore {
    async fn find_by_name_and_year(
        &self,
        name: &str,
        year: i32,
    ) -> Result<Vec<ProjectRecord>, StoreError> {
        self.scan(|p| p.project_name == name && p.year == year)
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<ProjectRecord>, StoreError> {
        self.scan(|p| p.project_name == name)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ProjectRecord>, StoreError> {
        read(&self.projects, id)
    }

    async fn create(&self, record: ProjectRecord) -> Result<ProjectRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.blocking(move |keyspace, projects| {
            if projects.contains_key(key(record.project_id))? {
                return Err(StoreError::Duplicate(record.project_id));
            }
            debug!(id = record.project_id, "Project INSERT");
            write(keyspace, projects, &record)?;
            Ok(record)
        })
        .await
    }

    async fn update(&self, id: i64, patch: ProjectPatch) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.blocking(move |keyspace, projects| {
            let Some(existing) = read(projects, id)? else {
                return Ok(false);
            };
            debug!(id, "Project UPDATE");
            write(keyspace, projects, &patch.merge_into(existing))?;
            Ok(true)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.blocking(move |keyspace, projects| {
            if !projects.contains_key(key(id))? {
                return Ok(false);
            }
            debug!(id, "Project DELETE");
            projects.remove(key(id))?;
            keyspace.persist(PersistMode::SyncAll)?;
            Ok(true)
        })
        .await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.projects.first_key_value()?;
        Ok(())
    }
}
