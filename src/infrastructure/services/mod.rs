//! Application services

mod batch_service;

pub use batch_service::{BatchService, BatchServiceTrait, BatchSubscription, ResumeOutcome};
