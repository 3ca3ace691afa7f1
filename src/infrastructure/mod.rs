//! Infrastructure layer - Adapters for storage, upstream APIs and observability

pub mod batch;
pub mod hospital;
pub mod logging;
pub mod observability;
pub mod services;
