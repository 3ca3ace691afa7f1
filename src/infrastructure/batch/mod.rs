//! Batch infrastructure implementations

mod in_memory_repository;

pub use in_memory_repository::InMemoryBatchRepository;
