//! Store error shared by every repository trait, plus the in-memory
//! implementations the service and tests run against.

pub mod memory;

pub use memory::{InMemoryCatalog, InMemoryEnrollmentStore, InMemoryNotificationStore};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
