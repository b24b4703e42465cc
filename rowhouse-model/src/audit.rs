use rowhouse_types::{Actor, EntityId, LogId, RowId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

/// One immutable audit log record.
///
/// `action` carries the recorded verb (`Created`, `Updated`, `Deleted`, or
/// a workflow annotation like `From Pending to Done`); `detail` carries the
/// row's display summary at the time of the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: LogId,
    pub tenant_id: Option<TenantId>,
    pub actor: Actor,
    pub action: String,
    pub entity_id: EntityId,
    pub row_id: RowId,
    pub detail: String,
    pub created_at: Timestamp,
}

impl AuditEntry {
    /// Creates an entry stamped now.
    #[must_use]
    pub fn new(
        tenant_id: Option<TenantId>,
        actor: Actor,
        action: &str,
        entity_id: EntityId,
        row_id: RowId,
        detail: &str,
    ) -> Self {
        Self {
            id: LogId::new(),
            tenant_id,
            actor,
            action: action.into(),
            entity_id,
            row_id,
            detail: detail.into(),
            created_at: Timestamp::now(),
        }
    }
}
