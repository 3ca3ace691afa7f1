//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::services::BatchServiceTrait;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub batch_service: Arc<dyn BatchServiceTrait>,
    /// Maximum rows accepted in one upload
    pub max_hospitals: usize,
}

impl AppState {
    pub fn new(batch_service: Arc<dyn BatchServiceTrait>, max_hospitals: usize) -> Self {
        Self {
            batch_service,
            max_hospitals,
        }
    }
}
