use super::{ProjectStore, StoreError};
use crate::core::project::{ProjectPatch, ProjectRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory project store, ordered by project id
#[derive(Default)]
pub struct MemoryProjectStore {
    inner: RwLock<BTreeMap<i64, ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find<F>(&self, predicate: F) -> Vec<ProjectRecord>
    where
        F: Fn(&ProjectRecord) -> bool,
    {
        let projects = self.inner.read().await;
        projects.values().filter(|p| predicate(p)).cloned().collect()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn find_by_name_and_year(
        &self,
        name: &str,
        year: i32,
    ) -> Result<Vec<ProjectRecord>, StoreError> {
        Ok(self
            .find(|p| p.project_name == name && p.year == year)
            .await)
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<ProjectRecord>, StoreError> {
        Ok(self.find(|p| p.project_name == name).await)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn create(&self, record: ProjectRecord) -> Result<ProjectRecord, StoreError> {
        let mut projects = self.inner.write().await;
        if projects.contains_key(&record.project_id) {
            return Err(StoreError::Duplicate(record.project_id));
        }
        debug!(id = record.project_id, "Project INSERT");
        projects.insert(record.project_id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, patch: ProjectPatch) -> Result<bool, StoreError> {
        let mut projects = self.inner.write().await;
        let Some(existing) = projects.get(&id).cloned() else {
            return Ok(false);
        };
        debug!(id, "Project UPDATE");
        projects.insert(id, patch.merge_into(existing));
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut projects = self.inner.write().await;
        debug!(id, "Project DELETE");
        Ok(projects.remove(&id).is_some())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
