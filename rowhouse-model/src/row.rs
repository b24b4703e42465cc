use crate::value::PropertyValue;
use rowhouse_types::{Actor, EntityId, PropertyId, RowId, StateId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

/// A stored record of some entity type.
///
/// The typed payload lives in [`RowValue`] records keyed by property; the
/// row itself carries only the fixed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub entity_id: EntityId,
    /// Owning tenant. `None` marks a global row visible under any tenant.
    pub tenant_id: Option<TenantId>,
    /// Display number, monotonic per (tenant, entity), starting at 1.
    pub folio: i64,
    /// Manual ordering position per (tenant, entity).
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_state_id: Option<StateId>,
    pub created_by: Actor,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Row {
    /// Creates a row shell. Folio and order stay zero until the store
    /// assigns them at insert.
    #[must_use]
    pub fn new(entity_id: EntityId, tenant_id: Option<TenantId>, created_by: Actor) -> Self {
        let now = Timestamp::now();
        Self {
            id: RowId::new(),
            entity_id,
            tenant_id,
            folio: 0,
            order: 0,
            workflow_state_id: None,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Renders the display number with the entity prefix, e.g. `CON-0001`.
    #[must_use]
    pub fn display_folio(&self, prefix: &str) -> String {
        format_folio(prefix, self.folio)
    }

    /// True when the row was created by the given actor.
    #[must_use]
    pub fn created_by_matches(&self, actor: &Actor) -> bool {
        match (&self.created_by, actor) {
            (Actor::User(a), Actor::User(b)) => a == b,
            (Actor::ApiKey(a), Actor::ApiKey(b)) => a == b,
            _ => false,
        }
    }
}

/// Renders a folio number with its entity prefix, zero-padded to four digits.
#[must_use]
pub fn format_folio(prefix: &str, folio: i64) -> String {
    format!("{prefix}-{folio:04}")
}

/// One stored value: a (row, property) pair plus its typed payload.
///
/// The pair is the key; writing a value for an existing pair replaces the
/// payload in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowValue {
    pub row_id: RowId,
    pub property_id: PropertyId,
    pub value: PropertyValue,
    pub updated_at: Timestamp,
}

impl RowValue {
    /// Creates a value record stamped now.
    #[must_use]
    pub fn new(row_id: RowId, property_id: PropertyId, value: PropertyValue) -> Self {
        Self {
            row_id,
            property_id,
            value,
            updated_at: Timestamp::now(),
        }
    }
}
