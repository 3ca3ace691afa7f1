//! Hospital Directory client over HTTP

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::batch::BatchId;
use crate::domain::error::DomainError;
use crate::domain::hospital::{CreateHospitalRequest, CreateOutcome, HospitalDirectory, HospitalPayload};

const UPSTREAM: &str = "hospital_directory";

/// reqwest-backed client for the Hospital Directory API
#[derive(Debug, Clone)]
pub struct HttpHospitalDirectory {
    client: Client,
    base_url: String,
}

impl HttpHospitalDirectory {
    /// Create a client with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn create_url(&self) -> String {
        format!("{}/hospitals/", self.base_url)
    }

    fn activate_url(&self, batch_id: &BatchId) -> String {
        format!("{}/hospitals/batch/{}/activate", self.base_url, batch_id)
    }
}

#[async_trait]
impl HospitalDirectory for HttpHospitalDirectory {
    async fn create_hospital(
        &self,
        payload: &HospitalPayload,
        batch_id: &BatchId,
    ) -> Result<CreateOutcome, DomainError> {
        let body = CreateHospitalRequest {
            payload,
            creation_batch_id: batch_id.as_str(),
        };

        let response = self
            .client
            .post(self.create_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::upstream(UPSTREAM, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::upstream(UPSTREAM, e.to_string()))?;

        if status == StatusCode::OK || status == StatusCode::CREATED {
            let id = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("id").cloned());
            debug!(name = %payload.name, hospital_id = ?id, "Hospital created");
            return Ok(CreateOutcome::Created { id });
        }

        warn!(name = %payload.name, status = %status, "Hospital directory rejected create");
        let error = serde_json::from_str::<Value>(&text)
            .unwrap_or_else(|_| json!({ "status_code": status.as_u16(), "text": text }));

        Ok(CreateOutcome::Rejected { error })
    }

    async fn activate_batch(&self, batch_id: &BatchId) -> Result<bool, DomainError> {
        let response = self
            .client
            .patch(self.activate_url(batch_id))
            .send()
            .await
            .map_err(|e| DomainError::upstream(UPSTREAM, e.to_string()))?;

        let status = response.status();
        debug!(batch_id = %batch_id, status = %status, "Batch activation response");

        Ok(status == StatusCode::OK || status == StatusCode::NO_CONTENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> HospitalPayload {
        HospitalPayload::from_columns(Some("Alpha"), Some("Addr1"), Some("111"))
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpHospitalDirectory::with_client(Client::new(), "http://directory/");
        assert_eq!(client.base_url(), "http://directory");
        assert_eq!(client.create_url(), "http://directory/hospitals/");
    }

    #[tokio::test]
    async fn test_create_sends_batch_id_and_reads_id() {
        let server = MockServer::start().await;
        let batch_id = BatchId::generate();

        Mock::given(method("POST"))
            .and(path("/hospitals/"))
            .and(body_partial_json(json!({
                "name": "Alpha",
                "address": "Addr1",
                "phone": "111",
                "creation_batch_id": batch_id.as_str(),
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 10})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpHospitalDirectory::new(server.uri(), Duration::from_secs(5)).unwrap();
        let outcome = client.create_hospital(&payload(), &batch_id).await.unwrap();

        assert_eq!(outcome, CreateOutcome::Created { id: Some(json!(10)) });
    }

    #[tokio::test]
    async fn test_create_rejected_with_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hospitals/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "server error"})))
            .mount(&server)
            .await;

        let client = HttpHospitalDirectory::new(server.uri(), Duration::from_secs(5)).unwrap();
        let outcome = client
            .create_hospital(&payload(), &BatchId::generate())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CreateOutcome::Rejected {
                error: json!({"detail": "server error"})
            }
        );
    }

    #[tokio::test]
    async fn test_create_rejected_with_text_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hospitals/"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad things"))
            .mount(&server)
            .await;

        let client = HttpHospitalDirectory::new(server.uri(), Duration::from_secs(5)).unwrap();
        let outcome = client
            .create_hospital(&payload(), &BatchId::generate())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CreateOutcome::Rejected {
                error: json!({"status_code": 422, "text": "bad things"})
            }
        );
    }

    #[tokio::test]
    async fn test_create_transport_error() {
        let client =
            HttpHospitalDirectory::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result = client.create_hospital(&payload(), &BatchId::generate()).await;

        assert!(matches!(result, Err(DomainError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_activate_batch() {
        let server = MockServer::start().await;
        let batch_id = BatchId::generate();

        Mock::given(method("PATCH"))
            .and(path(format!("/hospitals/batch/{}/activate", batch_id)))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = HttpHospitalDirectory::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(client.activate_batch(&batch_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_batch_refused() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = HttpHospitalDirectory::new(server.uri(), Duration::from_secs(5)).unwrap();
        assert!(!client.activate_batch(&BatchId::generate()).await.unwrap());
    }
}
