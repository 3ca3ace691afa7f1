//! Domain layer - Core business logic and entities

pub mod batch;
pub mod error;
pub mod hospital;

pub use batch::{
    BatchId, BatchProgress, BatchRepository, BatchStatus, EntryStatus, HospitalEntry,
    ProgressEvent,
};
pub use error::DomainError;
pub use hospital::{
    parse_upload, CreateHospitalRequest, CreateOutcome, HospitalDirectory, HospitalPayload,
};
