use rowhouse_types::{EntityId, RelationshipId, RowId, ViewId};
use serde::{Deserialize, Serialize};

/// A declared relationship between two entity types.
///
/// Instances link rows through [`RowRelationship`] join records. A
/// (parent, child, title) triple is unique so two differently-named
/// relationships may connect the same pair of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRelationship {
    pub id: RelationshipId,
    pub parent_entity_id: EntityId,
    pub child_entity_id: EntityId,
    pub cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub required: bool,
    /// Deleting a parent row also deletes linked child rows.
    pub cascade: bool,
    pub read_only: bool,
    /// Hide the relationship panel when no rows are linked.
    pub hidden_if_empty: bool,
    /// View used when listing child rows from the parent side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_view_id: Option<ViewId>,
    /// View used when listing parent rows from the child side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_view_id: Option<ViewId>,
    pub order: i64,
}

impl EntityRelationship {
    /// Creates a plain relationship with no cascade or display overrides.
    #[must_use]
    pub fn new(parent: EntityId, child: EntityId, cardinality: Cardinality) -> Self {
        Self {
            id: RelationshipId::new(),
            parent_entity_id: parent,
            child_entity_id: child,
            cardinality,
            title: None,
            required: false,
            cascade: false,
            read_only: false,
            hidden_if_empty: false,
            parent_view_id: None,
            child_view_id: None,
            order: 0,
        }
    }

    /// Enables cascade deletion of child rows.
    #[must_use]
    pub fn cascading(mut self) -> Self {
        self.cascade = true;
        self
    }

    /// Names the relationship, distinguishing it from others on the same pair.
    #[must_use]
    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Parent/child multiplicity of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// How one direction of a relationship is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipInput {
    /// At most one linked row; pickers preload candidates.
    SingleSelect,
    /// Any number of linked rows.
    MultiSelect,
}

impl Cardinality {
    /// Input control for choosing child rows from the parent side.
    #[must_use]
    pub const fn parent_input(&self) -> RelationshipInput {
        match self {
            Self::OneToOne | Self::ManyToOne => RelationshipInput::SingleSelect,
            Self::OneToMany | Self::ManyToMany => RelationshipInput::MultiSelect,
        }
    }

    /// Input control for choosing parent rows from the child side.
    #[must_use]
    pub const fn child_input(&self) -> RelationshipInput {
        match self {
            Self::OneToOne | Self::OneToMany => RelationshipInput::SingleSelect,
            Self::ManyToOne | Self::ManyToMany => RelationshipInput::MultiSelect,
        }
    }
}

/// One linked (parent row, child row) pair under a declared relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRelationship {
    pub relationship_id: RelationshipId,
    pub parent_row_id: RowId,
    pub child_row_id: RowId,
}
