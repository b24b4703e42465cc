use crate::value::PropertyValue;
use rowhouse_types::{RelationshipId, RowId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values, edges and tags submitted to create or update a row.
///
/// Property values are keyed by property name. `parents` and `children`
/// distinguish absent (`None`, leave edges alone) from present: a supplied
/// list replaces every existing edge of that direction, so `Some(vec![])`
/// clears them. Partial edge edits are not supported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowInput {
    #[serde(default)]
    pub values: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<EdgeSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<EdgeSpec>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl RowInput {
    /// An empty input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property value by name.
    #[must_use]
    pub fn with_value(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Links a parent row, marking the parent direction as supplied.
    #[must_use]
    pub fn with_parent(mut self, relationship_id: RelationshipId, row_id: RowId) -> Self {
        self.parents.get_or_insert_with(Vec::new).push(EdgeSpec {
            relationship_id,
            row_id,
        });
        self
    }

    /// Links a child row, marking the child direction as supplied.
    #[must_use]
    pub fn with_child(mut self, relationship_id: RelationshipId, row_id: RowId) -> Self {
        self.children.get_or_insert_with(Vec::new).push(EdgeSpec {
            relationship_id,
            row_id,
        });
        self
    }

    /// Marks a direction as supplied-but-empty, which clears its edges.
    #[must_use]
    pub fn clearing_parents(mut self) -> Self {
        self.parents.get_or_insert_with(Vec::new);
        self
    }

    /// Marks the child direction as supplied-but-empty.
    #[must_use]
    pub fn clearing_children(mut self) -> Self {
        self.children.get_or_insert_with(Vec::new);
        self
    }

    /// Applies a tag value.
    #[must_use]
    pub fn with_tag(mut self, value: &str) -> Self {
        self.tags.push(value.into());
        self
    }
}

/// One relationship edge to link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub relationship_id: RelationshipId,
    pub row_id: RowId,
}
