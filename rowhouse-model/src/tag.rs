use rowhouse_types::{EntityId, RowId, TagId, TenantId};
use serde::{Deserialize, Serialize};

/// An entity-scoped tag value.
///
/// Tags form a per-entity (and per-tenant) dictionary; applying an unknown
/// value creates the dictionary entry on the fly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTag {
    pub id: TagId,
    pub entity_id: EntityId,
    /// Tenant the dictionary entry belongs to; `None` for global tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    pub value: String,
    #[serde(default)]
    pub color: String,
}

impl EntityTag {
    /// Creates a tag value in the given scope.
    #[must_use]
    pub fn new(entity_id: EntityId, tenant_id: Option<TenantId>, value: &str) -> Self {
        Self {
            id: TagId::new(),
            entity_id,
            tenant_id,
            value: value.into(),
            color: String::new(),
        }
    }

    /// Sets the display color.
    #[must_use]
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.into();
        self
    }
}

/// A tag applied to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTag {
    pub row_id: RowId,
    pub tag_id: TagId,
}
