//! Batch service: runs bulk imports against the Hospital Directory and
//! tracks their progress

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::batch::{BatchId, BatchProgress, BatchRepository, HospitalEntry, ProgressEvent};
use crate::domain::error::DomainError;
use crate::domain::hospital::{CreateOutcome, HospitalDirectory, HospitalPayload};
use crate::infrastructure::observability::{record_batch_completed, record_row_outcome};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result of asking for a batch to be resumed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResumeOutcome {
    NothingToRetry {
        batch_id: BatchId,
        message: &'static str,
    },
    Scheduled {
        batch_id: BatchId,
        retry_count: usize,
        status: &'static str,
    },
}

impl ResumeOutcome {
    fn nothing_to_retry(batch_id: BatchId) -> Self {
        Self::NothingToRetry {
            batch_id,
            message: "nothing_to_retry",
        }
    }

    fn scheduled(batch_id: BatchId, retry_count: usize) -> Self {
        Self::Scheduled {
            batch_id,
            retry_count,
            status: "retry_scheduled",
        }
    }
}

/// A live view of a batch: the state at subscription time plus later events
pub struct BatchSubscription {
    pub snapshot: BatchProgress,
    pub events: broadcast::Receiver<ProgressEvent>,
}

/// Trait for batch service (for dynamic dispatch in AppState)
#[async_trait]
pub trait BatchServiceTrait: Send + Sync {
    /// Create a batch and process it in the background
    async fn start_batch(&self, rows: Vec<HospitalPayload>) -> Result<BatchProgress, DomainError>;

    /// Create a batch and process it before returning
    async fn run_batch(&self, rows: Vec<HospitalPayload>) -> Result<BatchProgress, DomainError>;

    /// Current progress of a batch
    async fn get_status(&self, id: &str) -> Result<Option<BatchProgress>, DomainError>;

    /// All known batches, most recent first
    async fn list(&self) -> Result<Vec<BatchProgress>, DomainError>;

    /// Number of known batches
    async fn batch_count(&self) -> Result<usize, DomainError>;

    /// Retry the failed rows of a completed batch in the background
    async fn resume_batch(&self, id: &str) -> Result<ResumeOutcome, DomainError>;

    /// Attach to a batch's progress events
    async fn subscribe(&self, id: &str) -> Result<Option<BatchSubscription>, DomainError>;
}

/// Batch service implementation
pub struct BatchService<R: BatchRepository> {
    repository: Arc<R>,
    directory: Arc<dyn HospitalDirectory>,
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<ProgressEvent>>>>,
}

impl<R: BatchRepository> Clone for BatchService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            directory: self.directory.clone(),
            channels: self.channels.clone(),
        }
    }
}

impl<R: BatchRepository + 'static> BatchService<R> {
    pub fn new(repository: Arc<R>, directory: Arc<dyn HospitalDirectory>) -> Self {
        Self {
            repository,
            directory,
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn parse_id(&self, id: &str) -> Result<BatchId, DomainError> {
        BatchId::new(id)
    }

    async fn get_required(&self, id: &BatchId) -> Result<BatchProgress, DomainError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Batch '{}' not found", id)))
    }

    async fn create_batch(&self, total: usize) -> Result<BatchProgress, DomainError> {
        let batch = BatchProgress::new(BatchId::generate(), total);
        let created = self.repository.create(batch).await?;

        info!(batch_id = %created.batch_id(), total_hospitals = total, "Created batch");
        Ok(created)
    }

    async fn broadcast(&self, batch_id: &BatchId, event: ProgressEvent) {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(batch_id.as_str()) {
            // No receivers is not an error
            let _ = sender.send(event);
        }
    }

    /// First pass over the uploaded rows
    async fn process_rows(
        &self,
        batch_id: BatchId,
        rows: Vec<HospitalPayload>,
    ) -> Result<BatchProgress, DomainError> {
        let started = Instant::now();

        for (idx, payload) in rows.into_iter().enumerate() {
            let entry = self.process_row(idx + 1, payload, &batch_id).await;
            self.record(&batch_id, entry).await?;
        }

        let elapsed = started.elapsed();
        let batch = self.finish(&batch_id, Some(elapsed.as_secs())).await?;
        record_batch_completed(batch.batch_activated(), elapsed);

        Ok(batch)
    }

    /// Retry pass over previously failed entries
    async fn retry_entries(
        &self,
        batch_id: BatchId,
        entries: Vec<HospitalEntry>,
    ) -> Result<BatchProgress, DomainError> {
        let started = Instant::now();

        for entry in entries {
            let retried = self.process_row(entry.row, entry.payload, &batch_id).await;
            self.record(&batch_id, retried).await?;
        }

        let batch = self.finish(&batch_id, None).await?;
        record_batch_completed(batch.batch_activated(), started.elapsed());

        Ok(batch)
    }

    async fn process_row(
        &self,
        row: usize,
        payload: HospitalPayload,
        batch_id: &BatchId,
    ) -> HospitalEntry {
        if !payload.is_complete() {
            debug!(batch_id = %batch_id, row, "Row missing name or address");
            return HospitalEntry::invalid(row, payload);
        }

        match self.directory.create_hospital(&payload, batch_id).await {
            Ok(CreateOutcome::Created { id }) => HospitalEntry::created(row, payload, id),
            Ok(CreateOutcome::Rejected { error }) => {
                HospitalEntry::create_failed(row, payload, error)
            }
            Err(e) => {
                warn!(batch_id = %batch_id, row, error = %e, "Hospital create request failed");
                HospitalEntry::request_error(row, payload, upstream_message(e))
            }
        }
    }

    async fn record(&self, batch_id: &BatchId, entry: HospitalEntry) -> Result<(), DomainError> {
        let mut batch = self.get_required(batch_id).await?;

        record_row_outcome(&entry.status);
        batch.record_entry(entry.clone());
        self.repository.update(&batch).await?;

        self.broadcast(batch_id, ProgressEvent::RowUpdate(entry)).await;
        Ok(())
    }

    async fn finish(
        &self,
        batch_id: &BatchId,
        processing_time_seconds: Option<u64>,
    ) -> Result<BatchProgress, DomainError> {
        let mut batch = self.get_required(batch_id).await?;
        let activated = batch.all_created() && self.activate(batch_id).await;

        batch.set_activated(activated);
        if activated {
            self.broadcast(
                batch_id,
                ProgressEvent::BatchActivated {
                    batch_activated: true,
                },
            )
            .await;
        }

        batch.complete(processing_time_seconds);
        let batch = self.repository.update(&batch).await?;

        info!(
            batch_id = %batch_id,
            processed = batch.processed_hospitals(),
            failed = batch.failed_hospitals(),
            activated = batch.batch_activated(),
            "Batch pass completed"
        );

        self.broadcast(batch_id, ProgressEvent::Completed(batch.clone()))
            .await;
        self.release_channel(batch_id).await;
        Ok(batch)
    }

    /// Drop a finished batch's channel once nobody listens to it
    async fn release_channel(&self, batch_id: &BatchId) {
        let mut channels = self.channels.write().await;

        if channels
            .get(batch_id.as_str())
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(batch_id.as_str());
        }
    }

    async fn activate(&self, batch_id: &BatchId) -> bool {
        match self.directory.activate_batch(batch_id).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(batch_id = %batch_id, "Hospital directory refused batch activation");
                false
            }
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "Batch activation request failed");
                false
            }
        }
    }

    /// Run a pass on its own task so it outlives the request that started it
    fn spawn<F>(&self, batch_id: BatchId, work: F) -> JoinHandle<Result<BatchProgress, DomainError>>
    where
        F: std::future::Future<Output = Result<BatchProgress, DomainError>> + Send + 'static,
    {
        tokio::spawn(async move {
            let result = work.await;
            if let Err(e) = &result {
                error!(batch_id = %batch_id, error = %e, "Batch processing aborted");
            }
            result
        })
    }
}

#[async_trait]
impl<R: BatchRepository + 'static> BatchServiceTrait for BatchService<R> {
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn start_batch(&self, rows: Vec<HospitalPayload>) -> Result<BatchProgress, DomainError> {
        let batch = self.create_batch(rows.len()).await?;
        let batch_id = batch.batch_id().clone();

        let this = self.clone();
        let id = batch_id.clone();
        self.spawn(batch_id, async move { this.process_rows(id, rows).await });

        Ok(batch)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn run_batch(&self, rows: Vec<HospitalPayload>) -> Result<BatchProgress, DomainError> {
        let batch = self.create_batch(rows.len()).await?;
        let batch_id = batch.batch_id().clone();

        let this = self.clone();
        let id = batch_id.clone();
        self.spawn(batch_id.clone(), async move { this.process_rows(id, rows).await })
            .await
            .map_err(|e| {
                DomainError::internal(format!("Batch '{}' task failed: {}", batch_id, e))
            })?
    }

    #[instrument(skip(self))]
    async fn get_status(&self, id: &str) -> Result<Option<BatchProgress>, DomainError> {
        let batch_id = self.parse_id(id)?;
        self.repository.get(&batch_id).await
    }

    async fn list(&self) -> Result<Vec<BatchProgress>, DomainError> {
        self.repository.list().await
    }

    async fn batch_count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    #[instrument(skip(self))]
    async fn resume_batch(&self, id: &str) -> Result<ResumeOutcome, DomainError> {
        let batch_id = self.parse_id(id)?;

        let to_retry = self
            .repository
            .begin_retry(&batch_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Batch '{}' not found", batch_id)))?;

        if to_retry.is_empty() {
            debug!(batch_id = %batch_id, "Nothing to retry");
            return Ok(ResumeOutcome::nothing_to_retry(batch_id));
        }

        let retry_count = to_retry.len();
        info!(batch_id = %batch_id, retry_count, "Scheduled batch retry");

        let this = self.clone();
        let id = batch_id.clone();
        self.spawn(batch_id.clone(), async move {
            this.retry_entries(id, to_retry).await
        });

        Ok(ResumeOutcome::scheduled(batch_id, retry_count))
    }

    async fn subscribe(&self, id: &str) -> Result<Option<BatchSubscription>, DomainError> {
        let batch_id = self.parse_id(id)?;

        // Subscribe before reading the snapshot so no event falls in between
        let events = {
            let mut channels = self.channels.write().await;
            channels.retain(|_, sender| sender.receiver_count() > 0);
            channels
                .entry(batch_id.to_string())
                .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0)
                .subscribe()
        };

        let snapshot = match self.repository.get(&batch_id).await? {
            Some(batch) => batch,
            None => {
                self.channels.write().await.remove(batch_id.as_str());
                return Ok(None);
            }
        };

        Ok(Some(BatchSubscription { snapshot, events }))
    }
}

fn upstream_message(error: DomainError) -> String {
    match error {
        DomainError::Upstream { message, .. } => message,
        other => other.to_string(),
    }
}
