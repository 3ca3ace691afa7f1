//! Batch domain entities

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;
use crate::domain::hospital::HospitalPayload;

const REQUEST_ERROR_PREFIX: &str = "request_error: ";

/// Identifier of an import batch (UUID v4)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BatchId(String);

impl BatchId {
    /// Create a validated batch ID
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();

        if uuid::Uuid::parse_str(&id).is_err() {
            return Err(DomainError::invalid_id(format!(
                "Invalid batch ID '{}': must be a UUID",
                id
            )));
        }

        Ok(Self(id))
    }

    /// Generate a fresh batch ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BatchId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BatchId> for String {
    fn from(id: BatchId) -> Self {
        id.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntryStatus {
    Created,
    CreatedAndActivated,
    InvalidRow,
    CreateFailed,
    RequestError(String),
}

impl EntryStatus {
    /// The directory holds this hospital
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::CreatedAndActivated)
    }

    /// Worth sending to the directory again. Invalid rows never are.
    pub fn is_retryable(&self) -> bool {
        !self.is_success() && *self != Self::InvalidRow
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::CreatedAndActivated => write!(f, "created_and_activated"),
            Self::InvalidRow => write!(f, "invalid_row_missing_name_or_address"),
            Self::CreateFailed => write!(f, "create_failed"),
            Self::RequestError(message) => write!(f, "{}{}", REQUEST_ERROR_PREFIX, message),
        }
    }
}

impl TryFrom<String> for EntryStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "created" => Ok(Self::Created),
            "created_and_activated" => Ok(Self::CreatedAndActivated),
            "invalid_row_missing_name_or_address" => Ok(Self::InvalidRow),
            "create_failed" => Ok(Self::CreateFailed),
            other => other
                .strip_prefix(REQUEST_ERROR_PREFIX)
                .map(|message| Self::RequestError(message.to_string()))
                .ok_or_else(|| DomainError::validation(format!("Unknown entry status '{}'", other))),
        }
    }
}

impl From<EntryStatus> for String {
    fn from(status: EntryStatus) -> Self {
        status.to_string()
    }
}

/// Per-row record kept on the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalEntry {
    /// 1-based position in the upload
    pub row: usize,
    pub hospital_id: Option<Value>,
    pub name: Option<String>,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    pub payload: HospitalPayload,
}

impl HospitalEntry {
    pub fn created(row: usize, payload: HospitalPayload, hospital_id: Option<Value>) -> Self {
        Self {
            row,
            hospital_id,
            name: payload.display_name(),
            status: EntryStatus::Created,
            error: None,
            payload,
        }
    }

    pub fn invalid(row: usize, payload: HospitalPayload) -> Self {
        Self {
            row,
            hospital_id: None,
            name: payload.display_name(),
            status: EntryStatus::InvalidRow,
            error: None,
            payload,
        }
    }

    pub fn create_failed(row: usize, payload: HospitalPayload, error: Value) -> Self {
        Self {
            row,
            hospital_id: None,
            name: payload.display_name(),
            status: EntryStatus::CreateFailed,
            error: Some(error),
            payload,
        }
    }

    pub fn request_error(row: usize, payload: HospitalPayload, message: impl Into<String>) -> Self {
        Self {
            row,
            hospital_id: None,
            name: payload.display_name(),
            status: EntryStatus::RequestError(message.into()),
            error: None,
            payload,
        }
    }
}

/// Lifecycle of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Processing,
    Completed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Progress of an import batch.
///
/// The processed and failed counters are derived from the entries and
/// recomputed on every change, so they stay consistent across retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    batch_id: BatchId,
    total_hospitals: usize,
    processed_hospitals: usize,
    failed_hospitals: usize,
    processing_time_seconds: Option<u64>,
    batch_activated: bool,
    hospitals: Vec<HospitalEntry>,
    status: BatchStatus,
    started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<DateTime<Utc>>,
}

impl BatchProgress {
    /// Create a new batch in the processing state
    pub fn new(batch_id: BatchId, total_hospitals: usize) -> Self {
        Self {
            batch_id,
            total_hospitals,
            processed_hospitals: 0,
            failed_hospitals: 0,
            processing_time_seconds: None,
            batch_activated: false,
            hospitals: Vec::with_capacity(total_hospitals),
            status: BatchStatus::Processing,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    // Getters

    pub fn batch_id(&self) -> &BatchId {
        &self.batch_id
    }

    pub fn total_hospitals(&self) -> usize {
        self.total_hospitals
    }

    pub fn processed_hospitals(&self) -> usize {
        self.processed_hospitals
    }

    pub fn failed_hospitals(&self) -> usize {
        self.failed_hospitals
    }

    pub fn processing_time_seconds(&self) -> Option<u64> {
        self.processing_time_seconds
    }

    pub fn batch_activated(&self) -> bool {
        self.batch_activated
    }

    pub fn hospitals(&self) -> &[HospitalEntry] {
        &self.hospitals
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_processing(&self) -> bool {
        self.status == BatchStatus::Processing
    }

    /// Every row ended up in the directory
    pub fn all_created(&self) -> bool {
        self.failed_hospitals == 0 && self.hospitals.len() == self.total_hospitals
    }

    /// Add a row result, replacing any earlier result for the same row
    pub fn record_entry(&mut self, entry: HospitalEntry) {
        match self.hospitals.iter_mut().find(|e| e.row == entry.row) {
            Some(existing) => *existing = entry,
            None => self.hospitals.push(entry),
        }
        self.recount();
    }

    /// Entries that a resume should send again
    pub fn retryable_entries(&self) -> Vec<HospitalEntry> {
        self.hospitals
            .iter()
            .filter(|e| e.status.is_retryable())
            .cloned()
            .collect()
    }

    /// Move a completed batch back to processing for a retry pass and hand
    /// out the entries to send again. Nothing changes when no entry is
    /// retryable.
    pub fn begin_retry(&mut self) -> Result<Vec<HospitalEntry>, DomainError> {
        if self.is_processing() {
            return Err(DomainError::conflict(format!(
                "Batch '{}' is already processing",
                self.batch_id
            )));
        }

        let entries = self.retryable_entries();
        if !entries.is_empty() {
            self.status = BatchStatus::Processing;
            self.finished_at = None;
        }
        Ok(entries)
    }

    /// Record the activation result; on success created rows become activated
    pub fn set_activated(&mut self, activated: bool) {
        self.batch_activated = activated;

        if activated {
            for entry in &mut self.hospitals {
                if entry.status == EntryStatus::Created {
                    entry.status = EntryStatus::CreatedAndActivated;
                }
            }
        }
    }

    /// Finish the current pass. `processing_time_seconds` is only replaced
    /// when given, so a retry pass keeps the first pass's timing.
    pub fn complete(&mut self, processing_time_seconds: Option<u64>) {
        if processing_time_seconds.is_some() {
            self.processing_time_seconds = processing_time_seconds;
        }
        self.status = BatchStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    fn recount(&mut self) {
        self.processed_hospitals = self
            .hospitals
            .iter()
            .filter(|e| e.status.is_success())
            .count();
        self.failed_hospitals = self.hospitals.len() - self.processed_hospitals;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(name: &str) -> HospitalPayload {
        HospitalPayload::from_columns(Some(name), Some("Addr"), None)
    }

    #[test]
    fn test_batch_id_generate_is_valid() {
        let id = BatchId::generate();
        assert!(BatchId::new(id.as_str()).is_ok());
    }

    #[test]
    fn test_batch_id_invalid() {
        assert!(BatchId::new("").is_err());
        assert!(BatchId::new("batch-1").is_err());
    }

    #[test]
    fn test_entry_status_strings() {
        assert_eq!(EntryStatus::Created.to_string(), "created");
        assert_eq!(
            EntryStatus::InvalidRow.to_string(),
            "invalid_row_missing_name_or_address"
        );
        assert_eq!(
            EntryStatus::RequestError("timed out".into()).to_string(),
            "request_error: timed out"
        );

        let parsed: EntryStatus = serde_json::from_str("\"request_error: timed out\"").unwrap();
        assert_eq!(parsed, EntryStatus::RequestError("timed out".into()));
        assert!(serde_json::from_str::<EntryStatus>("\"bogus\"").is_err());
    }

    #[test]
    fn test_entry_status_retryable() {
        assert!(!EntryStatus::Created.is_retryable());
        assert!(!EntryStatus::CreatedAndActivated.is_retryable());
        assert!(!EntryStatus::InvalidRow.is_retryable());
        assert!(EntryStatus::CreateFailed.is_retryable());
        assert!(EntryStatus::RequestError("x".into()).is_retryable());
    }

    #[test]
    fn test_record_entry_recounts() {
        let mut batch = BatchProgress::new(BatchId::generate(), 3);
        batch.record_entry(HospitalEntry::created(1, payload("A"), Some(json!(1))));
        batch.record_entry(HospitalEntry::create_failed(2, payload("B"), json!({"detail": "x"})));
        batch.record_entry(HospitalEntry::invalid(3, payload("")));

        assert_eq!(batch.processed_hospitals(), 1);
        assert_eq!(batch.failed_hospitals(), 2);
        assert!(!batch.all_created());

        batch.record_entry(HospitalEntry::created(2, payload("B"), Some(json!(2))));
        assert_eq!(batch.hospitals().len(), 3);
        assert_eq!(batch.processed_hospitals(), 2);
        assert_eq!(batch.failed_hospitals(), 1);
    }

    #[test]
    fn test_retryable_entries_skip_invalid_rows() {
        let mut batch = BatchProgress::new(BatchId::generate(), 3);
        batch.record_entry(HospitalEntry::created(1, payload("A"), None));
        batch.record_entry(HospitalEntry::request_error(2, payload("B"), "timeout"));
        batch.record_entry(HospitalEntry::invalid(3, payload("")));

        let retry = batch.retryable_entries();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].row, 2);
    }

    #[test]
    fn test_activation_promotes_created_entries() {
        let mut batch = BatchProgress::new(BatchId::generate(), 1);
        batch.record_entry(HospitalEntry::created(1, payload("A"), Some(json!(7))));
        assert!(batch.all_created());

        batch.set_activated(true);
        assert!(batch.batch_activated());
        assert_eq!(batch.hospitals()[0].status, EntryStatus::CreatedAndActivated);
        assert_eq!(batch.processed_hospitals(), 1);
    }

    #[test]
    fn test_begin_retry_conflicts_while_processing() {
        let mut batch = BatchProgress::new(BatchId::generate(), 1);
        batch.record_entry(HospitalEntry::create_failed(1, payload("A"), json!({"detail": "x"})));
        assert!(matches!(
            batch.begin_retry(),
            Err(DomainError::Conflict { .. })
        ));

        batch.complete(Some(3));
        assert_eq!(batch.status(), BatchStatus::Completed);
        assert!(batch.finished_at().is_some());

        let entries = batch.begin_retry().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(batch.is_processing());
        assert!(batch.finished_at().is_none());

        batch.complete(None);
        assert_eq!(batch.processing_time_seconds(), Some(3));
    }

    #[test]
    fn test_begin_retry_without_failures_keeps_batch_completed() {
        let mut batch = BatchProgress::new(BatchId::generate(), 1);
        batch.record_entry(HospitalEntry::created(1, payload("A"), None));
        batch.complete(Some(1));

        assert!(batch.begin_retry().unwrap().is_empty());
        assert_eq!(batch.status(), BatchStatus::Completed);
        assert!(batch.finished_at().is_some());
    }

    #[test]
    fn test_progress_serialization_shape() {
        let mut batch = BatchProgress::new(BatchId::generate(), 1);
        batch.record_entry(HospitalEntry::created(1, payload("A"), Some(json!(10))));

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["total_hospitals"], 1);
        assert_eq!(json["processed_hospitals"], 1);
        assert_eq!(json["status"], "processing");
        assert_eq!(json["hospitals"][0]["status"], "created");
        assert_eq!(json["hospitals"][0]["hospital_id"], 10);
        assert!(json["processing_time_seconds"].is_null());
    }
}
