//! In-memory batch repository implementation

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::batch::{BatchId, BatchProgress, BatchRepository, HospitalEntry};
use crate::domain::error::DomainError;

/// In-memory implementation of BatchRepository
#[derive(Debug, Clone)]
pub struct InMemoryBatchRepository {
    batches: Arc<RwLock<HashMap<String, BatchProgress>>>,
}

impl InMemoryBatchRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            batches: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryBatchRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn get(&self, id: &BatchId) -> Result<Option<BatchProgress>, DomainError> {
        let batches = self.batches.read().await;
        Ok(batches.get(id.as_str()).cloned())
    }

    async fn create(&self, batch: BatchProgress) -> Result<BatchProgress, DomainError> {
        let mut batches = self.batches.write().await;
        let id = batch.batch_id().as_str().to_string();

        if batches.contains_key(&id) {
            return Err(DomainError::conflict(format!(
                "Batch '{}' already exists",
                id
            )));
        }

        batches.insert(id, batch.clone());
        Ok(batch)
    }

    async fn update(&self, batch: &BatchProgress) -> Result<BatchProgress, DomainError> {
        let mut batches = self.batches.write().await;
        let id = batch.batch_id().as_str().to_string();

        if !batches.contains_key(&id) {
            return Err(DomainError::not_found(format!("Batch '{}'", id)));
        }

        batches.insert(id, batch.clone());
        Ok(batch.clone())
    }

    async fn list(&self) -> Result<Vec<BatchProgress>, DomainError> {
        let batches = self.batches.read().await;
        let mut all: Vec<BatchProgress> = batches.values().cloned().collect();
        all.sort_by(|a, b| b.started_at().cmp(&a.started_at()));
        Ok(all)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.batches.read().await.len())
    }

    async fn begin_retry(
        &self,
        id: &BatchId,
    ) -> Result<Option<Vec<HospitalEntry>>, DomainError> {
        // Check and transition under one write guard
        let mut batches = self.batches.write().await;

        match batches.get_mut(id.as_str()) {
            Some(batch) => batch.begin_retry().map(Some),
            None => Ok(None),
        }
    }
}
