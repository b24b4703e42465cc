use rowhouse_types::{EntityId, GrantId, GroupId, RoleId, RowId, RuleId, TenantId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Strength of a row-level grant. Ordered: `Edit` implies `Comment` implies
/// `View`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    View,
    Comment,
    Edit,
}

/// Who a row grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Grantee {
    /// Anyone, signed in or not.
    Public,
    /// Every member of the tenant.
    Tenant(TenantId),
    /// Users holding the role.
    Role(RoleId),
    /// Members of the group.
    Group(GroupId),
    /// One user.
    User(UserId),
}

/// A sharing grant on a single row.
///
/// The row creator has implicit full access and is never written as a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: GrantId,
    pub row_id: RowId,
    pub grantee: Grantee,
    pub access: AccessLevel,
    pub created_at: Timestamp,
}

impl PermissionGrant {
    /// Creates a grant stamped now.
    #[must_use]
    pub fn new(row_id: RowId, grantee: Grantee, access: AccessLevel) -> Self {
        Self {
            id: GrantId::new(),
            row_id,
            grantee,
            access,
            created_at: Timestamp::now(),
        }
    }
}

/// Entity-level actions gated by permission rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityAction {
    View,
    Read,
    Create,
    Update,
    Delete,
}

impl EntityAction {
    /// Stable string form used in permission keys and audit text.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Declares that an entity+action pair requires a named permission.
///
/// Entities with no rule for an action are open for that action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRule {
    pub id: RuleId,
    pub entity_id: EntityId,
    pub action: EntityAction,
    /// Permission key the acting user must hold (e.g. `contacts.update`).
    pub permission: String,
}

impl EntityRule {
    /// Creates a rule requiring the given permission key.
    #[must_use]
    pub fn new(entity_id: EntityId, action: EntityAction, permission: &str) -> Self {
        Self {
            id: RuleId::new(),
            entity_id,
            action,
            permission: permission.into(),
        }
    }
}

/// Effective row-level capabilities for one caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowAccess {
    pub can_read: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl RowAccess {
    /// No access at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            can_read: false,
            can_update: false,
            can_delete: false,
        }
    }

    /// Full access, as held by the row creator.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            can_read: true,
            can_update: true,
            can_delete: true,
        }
    }

    /// Access conferred by a grant at the given level.
    #[must_use]
    pub const fn from_level(level: AccessLevel) -> Self {
        match level {
            AccessLevel::View | AccessLevel::Comment => Self {
                can_read: true,
                can_update: false,
                can_delete: false,
            },
            AccessLevel::Edit => Self::full(),
        }
    }

    /// Unions two capability sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            can_read: self.can_read || other.can_read,
            can_update: self.can_update || other.can_update,
            can_delete: self.can_delete || other.can_delete,
        }
    }
}
