//! Batch repository trait

use async_trait::async_trait;

use super::{BatchId, BatchProgress, HospitalEntry};
use crate::domain::error::DomainError;

/// Repository trait for import batches
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Get a batch by ID
    async fn get(&self, id: &BatchId) -> Result<Option<BatchProgress>, DomainError>;

    /// Store a new batch
    async fn create(&self, batch: BatchProgress) -> Result<BatchProgress, DomainError>;

    /// Replace an existing batch
    async fn update(&self, batch: &BatchProgress) -> Result<BatchProgress, DomainError>;

    /// List all batches, most recently started first
    async fn list(&self) -> Result<Vec<BatchProgress>, DomainError>;

    /// Number of stored batches
    async fn count(&self) -> Result<usize, DomainError>;

    /// Atomically move a batch into a retry pass (see
    /// `BatchProgress::begin_retry`). `None` when the batch does not exist.
    async fn begin_retry(
        &self,
        id: &BatchId,
    ) -> Result<Option<Vec<HospitalEntry>>, DomainError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::domain::batch::BatchStatus;
    use crate::domain::hospital::HospitalPayload;
    use serde_json::json;

    pub fn create_test_batch(total: usize) -> BatchProgress {
        BatchProgress::new(BatchId::generate(), total)
    }

    /// Test suite for BatchRepository implementations
    pub async fn test_repository_basic_crud<R: BatchRepository>(repo: &R) {
        let batch = create_test_batch(1);
        let id = batch.batch_id().clone();

        let created = repo.create(batch).await.expect("create should succeed");
        assert_eq!(created.batch_id(), &id);

        let mut fetched = repo
            .get(&id)
            .await
            .expect("get should succeed")
            .expect("batch should exist");
        assert_eq!(fetched.processed_hospitals(), 0);

        let payload = HospitalPayload::from_columns(Some("A"), Some("B"), None);
        fetched.record_entry(HospitalEntry::created(1, payload, None));
        repo.update(&fetched).await.expect("update should succeed");

        let updated = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(updated.processed_hospitals(), 1);
    }

    pub async fn test_repository_list<R: BatchRepository>(repo: &R) {
        let first = create_test_batch(1);
        let second = create_test_batch(2);
        let first_id = first.batch_id().clone();
        let second_id = second.batch_id().clone();

        repo.create(first).await.unwrap();
        repo.create(second).await.unwrap();

        let all = repo.list().await.expect("list should succeed");
        assert!(all.iter().any(|b| b.batch_id() == &first_id));
        assert!(all.iter().any(|b| b.batch_id() == &second_id));
    }

    pub async fn test_repository_count<R: BatchRepository>(repo: &R) {
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.create(create_test_batch(1)).await.unwrap();
        repo.create(create_test_batch(3)).await.unwrap();

        assert_eq!(repo.count().await.expect("count should succeed"), 2);
    }

    pub async fn test_repository_begin_retry<R: BatchRepository>(repo: &R) {
        let mut batch = create_test_batch(1);
        let id = batch.batch_id().clone();
        let payload = HospitalPayload::from_columns(Some("A"), Some("B"), None);
        batch.record_entry(HospitalEntry::create_failed(1, payload, json!({"detail": "x"})));
        repo.create(batch).await.unwrap();

        assert!(matches!(
            repo.begin_retry(&id).await,
            Err(DomainError::Conflict { .. })
        ));

        let mut stored = repo.get(&id).await.unwrap().unwrap();
        stored.complete(Some(1));
        repo.update(&stored).await.unwrap();

        let entries = repo
            .begin_retry(&id)
            .await
            .expect("begin_retry should succeed")
            .expect("batch should exist");
        assert_eq!(entries.len(), 1);

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), BatchStatus::Processing);

        assert!(matches!(
            repo.begin_retry(&id).await,
            Err(DomainError::Conflict { .. })
        ));
        assert!(repo.begin_retry(&BatchId::generate()).await.unwrap().is_none());
    }
}
