//! Progress events pushed to batch subscribers

use serde::{Deserialize, Serialize};

use super::{BatchProgress, HospitalEntry};

/// A progress message, serialized as `{"type": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Current state, sent once when a subscriber attaches
    Snapshot(BatchProgress),

    /// A row was processed or re-processed
    RowUpdate(HospitalEntry),

    /// The directory activated the batch
    BatchActivated { batch_activated: bool },

    /// The pass finished; carries the final state
    Completed(BatchProgress),
}

impl ProgressEvent {
    /// Subscribers stop listening after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::BatchId;
    use crate::domain::hospital::HospitalPayload;

    #[test]
    fn test_row_update_serialization() {
        let payload = HospitalPayload::from_columns(Some("A"), Some("B"), None);
        let event = ProgressEvent::RowUpdate(HospitalEntry::invalid(4, payload));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "row_update");
        assert_eq!(json["data"]["row"], 4);
        assert_eq!(json["data"]["status"], "invalid_row_missing_name_or_address");
    }

    #[test]
    fn test_batch_activated_serialization() {
        let event = ProgressEvent::BatchActivated {
            batch_activated: true,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_activated");
        assert_eq!(json["data"]["batch_activated"], true);
    }

    #[test]
    fn test_only_completed_is_terminal() {
        let batch = BatchProgress::new(BatchId::generate(), 0);
        assert!(ProgressEvent::Completed(batch.clone()).is_terminal());
        assert!(!ProgressEvent::Snapshot(batch).is_terminal());
    }
}
