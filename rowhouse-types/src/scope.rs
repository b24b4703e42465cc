//! Caller identity attached to every engine operation.
//!
//! A [`Scope`] names the tenant a call operates in and the [`Actor`] making
//! it. The permission resolver and the tenant-isolation filter both read
//! from it; nothing else carries caller identity.

use crate::{ApiKeyId, TenantId, UserId};
use serde::{Deserialize, Serialize};

/// The principal performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// An interactive user session.
    User(UserId),
    /// A programmatic API key.
    ApiKey(ApiKeyId),
    /// No principal: internal engine calls, migrations, seeds.
    System,
}

impl Actor {
    /// Returns the user id when the actor is a user.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the API key id when the actor is an API key.
    #[must_use]
    pub const fn api_key_id(&self) -> Option<ApiKeyId> {
        match self {
            Self::ApiKey(id) => Some(*id),
            _ => None,
        }
    }

    /// True for internal calls with no principal.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

/// Tenant plus actor context for a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Tenant the call operates in. `None` for global/system work.
    pub tenant_id: Option<TenantId>,
    /// The principal making the call.
    pub actor: Actor,
}

impl Scope {
    /// Creates a scope from parts.
    #[must_use]
    pub const fn new(tenant_id: Option<TenantId>, actor: Actor) -> Self {
        Self { tenant_id, actor }
    }

    /// Scope for a signed-in user within a tenant.
    #[must_use]
    pub const fn user(tenant_id: TenantId, user_id: UserId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            actor: Actor::User(user_id),
        }
    }

    /// Scope for an API key acting within a tenant.
    #[must_use]
    pub const fn api_key(tenant_id: TenantId, key_id: ApiKeyId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            actor: Actor::ApiKey(key_id),
        }
    }

    /// Scope for internal calls with no tenant or principal.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            tenant_id: None,
            actor: Actor::System,
        }
    }

    /// Returns the acting user id, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        self.actor.user_id()
    }
}
