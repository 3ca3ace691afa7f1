//! Bulk import API types

use serde::{Deserialize, Serialize};

use crate::domain::batch::{BatchId, BatchProgress, BatchStatus};

/// Query parameters for the bulk upload endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkUploadParams {
    /// Process the whole batch before responding (HTTP 200 with the final state)
    #[serde(default)]
    pub wait: bool,
}

/// Response when a batch is accepted for background processing (HTTP 202)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAccepted {
    pub batch_id: BatchId,
    pub total_hospitals: usize,
    pub status: BatchStatus,
}

impl From<&BatchProgress> for BatchAccepted {
    fn from(batch: &BatchProgress) -> Self {
        Self {
            batch_id: batch.batch_id().clone(),
            total_hospitals: batch.total_hospitals(),
            status: batch.status(),
        }
    }
}

/// Batch without its per-row entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub status: BatchStatus,
    pub total_hospitals: usize,
    pub processed_hospitals: usize,
    pub failed_hospitals: usize,
    pub batch_activated: bool,
    pub started_at: String,
}

impl From<&BatchProgress> for BatchSummary {
    fn from(batch: &BatchProgress) -> Self {
        Self {
            batch_id: batch.batch_id().clone(),
            status: batch.status(),
            total_hospitals: batch.total_hospitals(),
            processed_hospitals: batch.processed_hospitals(),
            failed_hospitals: batch.failed_hospitals(),
            batch_activated: batch.batch_activated(),
            started_at: batch.started_at().to_rfc3339(),
        }
    }
}

/// Response for listing batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchListResponse {
    pub batches: Vec<BatchSummary>,
}

impl BatchListResponse {
    pub fn from_batches(batches: &[BatchProgress]) -> Self {
        Self {
            batches: batches.iter().map(BatchSummary::from).collect(),
        }
    }
}
