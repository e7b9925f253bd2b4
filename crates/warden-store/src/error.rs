//! Error types for the store crate.

use thiserror::Error;
use uuid::Uuid;
use warden_core::QueryStatus;

/// Errors that can occur in query record storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists with the given ID.
    #[error("query {0} not found")]
    NotFound(Uuid),

    /// A record with the given ID already exists.
    #[error("query {0} already exists")]
    AlreadyExists(Uuid),

    /// The record already reached a terminal status.
    #[error("query {id} already {status}")]
    AlreadyResolved { id: Uuid, status: QueryStatus },

    /// The requested target status is not a valid transition.
    #[error("cannot transition query {id} to {status}")]
    InvalidTransition { id: Uuid, status: QueryStatus },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A lock guarding the record table was poisoned.
    #[error("lock poisoned")]
    LockPoisoned,
}
