//! Hospital Bulk Import
//!
//! Accepts CSV uploads of hospitals and creates them in the Hospital Directory API:
//! - Batch processing in the background, with polling and WebSocket progress
//! - Resuming a batch by retrying its failed rows
//! - Batch activation once every row is created
//! - Container packaging rendered from a typed image description

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod packaging;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::batch::InMemoryBatchRepository;
use infrastructure::hospital::HttpHospitalDirectory;
use infrastructure::services::BatchService;
use tracing::info;

/// Create application state from configuration
pub fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let directory = HttpHospitalDirectory::new(
        config.hospital_api.base_url.clone(),
        config.hospital_api.timeout(),
    )?;

    info!(
        base_url = %config.hospital_api.base_url,
        max_hospitals = config.hospital_api.max_hospitals,
        "Hospital Directory client configured"
    );

    let repository = Arc::new(InMemoryBatchRepository::new());
    let batch_service = BatchService::new(repository, Arc::new(directory));

    Ok(AppState::new(
        Arc::new(batch_service),
        config.hospital_api.max_hospitals,
    ))
}
