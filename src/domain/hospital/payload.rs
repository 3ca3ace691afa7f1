//! Hospital payloads sent to the Hospital Directory

use serde::{Deserialize, Serialize};

/// A single hospital as read from an upload row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalPayload {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl HospitalPayload {
    /// Build a payload from raw column values, trimming whitespace.
    /// An empty phone is treated as absent.
    pub fn from_columns(name: Option<&str>, address: Option<&str>, phone: Option<&str>) -> Self {
        let phone = phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        Self {
            name: name.unwrap_or_default().trim().to_string(),
            address: address.unwrap_or_default().trim().to_string(),
            phone,
        }
    }

    /// A row can only be submitted upstream when both name and address are present
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.address.is_empty()
    }

    /// Name for reporting, `None` when blank
    pub fn display_name(&self) -> Option<String> {
        if self.name.is_empty() {
            None
        } else {
            Some(self.name.clone())
        }
    }
}

/// Body of the upstream create call: the payload tagged with its batch
#[derive(Debug, Serialize)]
pub struct CreateHospitalRequest<'a> {
    #[serde(flatten)]
    pub payload: &'a HospitalPayload,
    pub creation_batch_id: &'a str,
}
