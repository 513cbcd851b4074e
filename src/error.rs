//! Error type for tracker operations and persistence.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the tracker engine.
///
/// Lookups that merely miss return `Option`/`bool` to the caller; `NotFound`
/// variants are reserved for mutations that require an existing target.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] serde_json::Error),
    #[error("task not found: {0}")]
    TaskNotFound(Uuid),
    #[error("milestone not found: {0}")]
    MilestoneNotFound(Uuid),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}
