//! Core type definitions for Rowhouse.
//!
//! This crate defines the fundamental, schema-agnostic types used throughout
//! the engine:
//! - Identifier newtypes for every record family (UUID v7)
//! - Wall-clock millisecond timestamps
//! - The caller scope (tenant + actor) attached to every operation
//!
//! Domain model types (entities, properties, rows, views, workflows) belong
//! in `rowhouse-model`, not here.

mod ids;
mod scope;
mod timestamp;

pub use ids::{
    ApiKeyId, CommentId, EntityId, GrantId, GroupId, LogId, MediaId, PropertyId, RelationshipId,
    RoleId, RowId, RuleId, StateId, StepId, TagId, TaskId, TenantId, TransitionId, UserId, ViewId,
    WebhookId,
};
pub use scope::{Actor, Scope};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
