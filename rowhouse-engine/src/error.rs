//! Error types for the engine layer.

use rowhouse_model::ModelError;
use rowhouse_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by engine operations.
///
/// Permission failures are always [`EngineError::Forbidden`], distinct from
/// [`EngineError::NotFound`], so callers can tell "hidden from you" apart
/// from "does not exist".
#[derive(Debug, Error)]
pub enum EngineError {
    /// The named entity, row or companion record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or state constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller lacks the required permission.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The input failed validation before any write.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The usage meter reported the tenant's limit reached.
    #[error("usage limit reached: {0}")]
    QuotaExceeded(String),

    /// No workflow step matches the row's current state and the action.
    #[error("invalid workflow transition: {0}")]
    InvalidTransition(String),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Runtime failure outside the operation's own logic.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        Self::Validation(err.to_string())
    }
}
