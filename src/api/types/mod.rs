//! API request and response types

pub mod batch;
pub mod error;

pub use batch::{BatchAccepted, BatchListResponse, BatchSummary, BulkUploadParams};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
