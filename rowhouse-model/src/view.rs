use rowhouse_types::{EntityId, TenantId, Timestamp, UserId, ViewId};
use serde::{Deserialize, Serialize};

/// A saved listing configuration for an entity: columns, filters, sorts,
/// layout and page size.
///
/// At most one view per scope may be the default. System views ship with
/// the entity and cannot be edited or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: ViewId,
    pub entity_id: EntityId,
    /// Name used by the `?v=` URL parameter.
    pub name: String,
    pub scope: ViewScope,
    pub layout: ViewLayout,
    /// Rows per page; 0 falls back to the engine default.
    pub page_size: i64,
    /// Property names shown as columns, in order.
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ViewFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sorts: Vec<ViewSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,
    pub is_default: bool,
    pub is_system: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntityView {
    /// Creates an empty table view in the given scope.
    #[must_use]
    pub fn new(entity_id: EntityId, name: &str, scope: ViewScope) -> Self {
        let now = Timestamp::now();
        Self {
            id: ViewId::new(),
            entity_id,
            name: name.into(),
            scope,
            layout: ViewLayout::Table,
            page_size: 0,
            columns: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
            group_by: None,
            is_default: false,
            is_system: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a filter clause.
    #[must_use]
    pub fn with_filter(mut self, name: &str, condition: FilterCondition, value: &str) -> Self {
        self.filters.push(ViewFilter {
            name: name.into(),
            condition,
            value: value.into(),
            match_mode: MatchMode::And,
        });
        self
    }

    /// Adds a sort clause.
    #[must_use]
    pub fn with_sort(mut self, name: &str, ascending: bool) -> Self {
        let order = self.sorts.len() as i64;
        self.sorts.push(ViewSort {
            name: name.into(),
            ascending,
            order,
        });
        self
    }

    /// Marks the view as the default for its scope.
    #[must_use]
    pub fn default_view(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Who a view belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewScope {
    /// Shipped with the entity, visible everywhere.
    Global,
    /// Shared across one tenant.
    Tenant { tenant_id: TenantId },
    /// Personal to one user within a tenant.
    User { tenant_id: TenantId, user_id: UserId },
}

/// How rows are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewLayout {
    #[default]
    Table,
    Board,
    Grid,
}

/// One stored filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilter {
    /// Property name the clause applies to.
    pub name: String,
    pub condition: FilterCondition,
    pub value: String,
    pub match_mode: MatchMode,
}

/// How a filter clause combines with the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    And,
    Or,
}

/// One stored sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSort {
    pub name: String,
    pub ascending: bool,
    pub order: i64,
}

/// Board/group column source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GroupBy {
    WorkflowState,
    /// Group by a select property's options.
    Property(String),
}

/// Comparison operators available to view and URL filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Eq,
    Ne,
    Contains,
    StartsWith,
    EndsWith,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
}

impl FilterCondition {
    /// Parses the operator names accepted in URL filter values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "contains" => Some(Self::Contains),
            "starts_with" => Some(Self::StartsWith),
            "ends_with" => Some(Self::EndsWith),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "in" => Some(Self::In),
            "not_in" => Some(Self::NotIn),
            _ => None,
        }
    }
}
