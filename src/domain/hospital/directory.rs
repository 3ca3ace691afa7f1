//! Hospital Directory port

use async_trait::async_trait;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use super::HospitalPayload;
use crate::domain::batch::BatchId;
use crate::domain::error::DomainError;

/// Result of asking the directory to create a hospital
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// The directory accepted the hospital (HTTP 200/201)
    Created { id: Option<Value> },

    /// The directory answered with a non-success status
    Rejected { error: Value },
}

/// The upstream Hospital Directory API.
///
/// `Err` is reserved for transport failures (connect, timeout, body read);
/// a response with an error status is a `CreateOutcome::Rejected`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HospitalDirectory: Send + Sync {
    /// Create a single hospital tagged with its creation batch
    async fn create_hospital(
        &self,
        payload: &HospitalPayload,
        batch_id: &BatchId,
    ) -> Result<CreateOutcome, DomainError>;

    /// Activate every hospital created under the batch. Returns whether the
    /// directory confirmed the activation.
    async fn activate_batch(&self, batch_id: &BatchId) -> Result<bool, DomainError>;
}
