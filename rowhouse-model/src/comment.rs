use rowhouse_types::{Actor, CommentId, RowId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// A comment on a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowComment {
    pub id: CommentId,
    pub row_id: RowId,
    pub author: Actor,
    pub body: String,
    pub created_at: Timestamp,
}

impl RowComment {
    /// Creates a comment stamped now.
    #[must_use]
    pub fn new(row_id: RowId, author: Actor, body: &str) -> Self {
        Self {
            id: CommentId::new(),
            row_id,
            author,
            body: body.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// A lightweight task attached to a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTask {
    pub id: TaskId,
    pub row_id: RowId,
    pub title: String,
    pub done: bool,
    pub created_by: Actor,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<Timestamp>,
}

impl RowTask {
    /// Creates an open task stamped now.
    #[must_use]
    pub fn new(row_id: RowId, created_by: Actor, title: &str) -> Self {
        Self {
            id: TaskId::new(),
            row_id,
            title: title.into(),
            done: false,
            created_by,
            created_at: Timestamp::now(),
            due_at: None,
        }
    }
}
