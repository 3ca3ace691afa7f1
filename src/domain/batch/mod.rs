//! Batch domain module for tracking bulk imports

mod entity;
mod event;
pub mod repository;

pub use entity::{BatchId, BatchProgress, BatchStatus, EntryStatus, HospitalEntry};
pub use event::ProgressEvent;
pub use repository::BatchRepository;
