//! Identifier types used throughout the Rowhouse engine.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers. Every record
//! family gets its own newtype so ids cannot be mixed up across tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new identifier with the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Parses an identifier from a string.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(
    /// Identifier for a tenant (isolated workspace account).
    TenantId
);

define_id!(
    /// Identifier for a user.
    UserId
);

define_id!(
    /// Identifier for a programmatic API key.
    ApiKeyId
);

define_id!(
    /// Identifier for an entity definition in the catalog.
    EntityId
);

define_id!(
    /// Identifier for a property definition.
    PropertyId
);

define_id!(
    /// Identifier for a stored row.
    RowId
);

define_id!(
    /// Identifier for a declared entity-to-entity relationship.
    RelationshipId
);

define_id!(
    /// Identifier for a saved view.
    ViewId
);

define_id!(
    /// Identifier for a workflow state.
    StateId
);

define_id!(
    /// Identifier for a workflow step.
    StepId
);

define_id!(
    /// Identifier for an executed workflow transition record.
    TransitionId
);

define_id!(
    /// Identifier for an entity-scoped tag value.
    TagId
);

define_id!(
    /// Identifier for a role.
    RoleId
);

define_id!(
    /// Identifier for a user group.
    GroupId
);

define_id!(
    /// Identifier for an entity-level permission rule.
    RuleId
);

define_id!(
    /// Identifier for a row-level permission grant.
    GrantId
);

define_id!(
    /// Identifier for an entity webhook registration.
    WebhookId
);

define_id!(
    /// Identifier for a row comment.
    CommentId
);

define_id!(
    /// Identifier for a row task.
    TaskId
);

define_id!(
    /// Identifier for a media item attached to a row value.
    MediaId
);

define_id!(
    /// Identifier for an audit log entry.
    LogId
);
