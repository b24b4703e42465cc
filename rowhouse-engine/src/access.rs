//! Permission evaluation.
//!
//! Two layers guard every row operation. Entity-level rules gate whole
//! actions (view/read/create/update/delete) behind named permissions the
//! acting user must hold, directly or through a linked tenant. Row-level
//! grants then decide what the caller may do with each individual row.
//!
//! The lifecycle API routes every check through [`PermissionResolver`];
//! nothing else decides access.

use crate::error::{EngineError, EngineResult};
use crate::task::run_blocking;
use rowhouse_model::{
    AccessLevel, EntityAction, EntityDef, EntityRule, Grantee, PermissionGrant, Row, RowAccess,
};
use rowhouse_store::{Database, PermissionStore, StoreResult};
use rowhouse_types::{EntityId, GroupId, RoleId, RowId, Scope, TenantId, UserId};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Evaluates entity rules and row grants for the engine.
#[derive(Clone)]
pub struct PermissionResolver {
    store: PermissionStore,
}

impl PermissionResolver {
    pub fn new(db: &Database) -> Self {
        Self {
            store: PermissionStore::new(db),
        }
    }

    /// Checks an entity-level action against the registered rules.
    ///
    /// Passes when no rule covers the (entity, action) pair, or when the
    /// scope carries no tenant and no user. Otherwise the acting user must
    /// hold the rule's permission in their tenant or in any tenant reachable
    /// through tenant links.
    pub async fn check_entity_action(
        &self,
        scope: &Scope,
        entity: &EntityDef,
        action: EntityAction,
    ) -> EngineResult<()> {
        if scope.tenant_id.is_none() && scope.user_id().is_none() {
            return Ok(());
        }

        let store = self.store.clone();
        let entity_id = entity.id;
        let rule = run_blocking(move || store.get_rule(entity_id, action)).await?;
        let Some(rule) = rule else {
            return Ok(());
        };

        let denied = || {
            EngineError::Forbidden(format!(
                "'{}' on '{}' requires permission '{}'",
                action.as_str(),
                entity.name,
                rule.permission
            ))
        };
        let (Some(tenant), Some(user)) = (scope.tenant_id, scope.user_id()) else {
            return Err(denied());
        };

        let store = self.store.clone();
        let permission = rule.permission.clone();
        let allowed =
            run_blocking(move || holds_permission(&store, tenant, user, &permission)).await?;
        if allowed {
            Ok(())
        } else {
            debug!(entity = %entity.name, action = action.as_str(), "entity action denied");
            Err(denied())
        }
    }

    /// Loads grant and membership data for checking one row.
    pub async fn context_for_row(
        &self,
        scope: &Scope,
        row_id: RowId,
    ) -> EngineResult<AccessContext> {
        let (roles, groups) = self.memberships(scope).await?;
        let store = self.store.clone();
        let grants = run_blocking(move || store.list_grants(row_id)).await?;
        let mut by_row: HashMap<RowId, Vec<PermissionGrant>> = HashMap::new();
        by_row.insert(row_id, grants);
        Ok(AccessContext {
            scope: *scope,
            roles,
            groups,
            grants: by_row,
        })
    }

    /// Loads grant and membership data for filtering a whole entity listing.
    pub async fn context_for_entity(
        &self,
        scope: &Scope,
        entity_id: EntityId,
    ) -> EngineResult<AccessContext> {
        let (roles, groups) = self.memberships(scope).await?;
        let store = self.store.clone();
        let grants = run_blocking(move || store.list_grants_for_entity(entity_id)).await?;
        let mut by_row: HashMap<RowId, Vec<PermissionGrant>> = HashMap::new();
        for grant in grants {
            by_row.entry(grant.row_id).or_default().push(grant);
        }
        Ok(AccessContext {
            scope: *scope,
            roles,
            groups,
            grants: by_row,
        })
    }

    /// The grants attached to one row, for the `get_row` bundle.
    pub async fn grants_for_row(&self, row_id: RowId) -> EngineResult<Vec<PermissionGrant>> {
        let store = self.store.clone();
        run_blocking(move || store.list_grants(row_id)).await
    }

    async fn memberships(&self, scope: &Scope) -> EngineResult<(Vec<RoleId>, Vec<GroupId>)> {
        let Some(user) = scope.user_id() else {
            return Ok((Vec::new(), Vec::new()));
        };
        let tenant = scope.tenant_id;
        let store = self.store.clone();
        run_blocking(move || {
            let roles = match tenant {
                Some(tenant) => store.roles_for_user(tenant, user)?,
                None => Vec::new(),
            };
            let groups = store.groups_for_user(user)?;
            Ok((roles, groups))
        })
        .await
    }
}

/// Walks the tenant-link graph looking for the permission.
///
/// Links are bidirectional and may form cycles; the visited set keeps the
/// walk finite.
fn holds_permission(
    store: &PermissionStore,
    tenant: TenantId,
    user: UserId,
    permission: &str,
) -> StoreResult<bool> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back(tenant);
    while let Some(next) = queue.pop_front() {
        if !visited.insert(next) {
            continue;
        }
        if store.user_has_permission(next, user, permission)? {
            return Ok(true);
        }
        for linked in store.linked_tenants(next)? {
            if !visited.contains(&linked) {
                queue.push_back(linked);
            }
        }
    }
    Ok(false)
}

/// Preloaded grant and membership data for row-level decisions.
///
/// Built once per operation so listing a thousand rows costs three queries,
/// not three thousand.
pub struct AccessContext {
    scope: Scope,
    roles: Vec<RoleId>,
    groups: Vec<GroupId>,
    grants: HashMap<RowId, Vec<PermissionGrant>>,
}

impl AccessContext {
    /// Effective capabilities on one row.
    ///
    /// The creator always has full access. Everyone else gets the union of
    /// the grants that apply to them; View and Comment grants confer
    /// read-only access, Edit confers everything.
    #[must_use]
    pub fn access_for(&self, row: &Row) -> RowAccess {
        if row.created_by_matches(&self.scope.actor) {
            return RowAccess::full();
        }
        let mut access = RowAccess::none();
        for grant in self.row_grants(row.id) {
            if self.grant_applies(grant) {
                access = access.union(RowAccess::from_level(grant.access));
            }
        }
        access
    }

    /// True when the caller may comment: the creator, or any grant at
    /// Comment level or above.
    #[must_use]
    pub fn can_comment(&self, row: &Row) -> bool {
        if row.created_by_matches(&self.scope.actor) {
            return true;
        }
        self.row_grants(row.id)
            .iter()
            .any(|g| self.grant_applies(g) && g.access >= AccessLevel::Comment)
    }

    fn row_grants(&self, row_id: RowId) -> &[PermissionGrant] {
        self.grants.get(&row_id).map_or(&[], Vec::as_slice)
    }

    fn grant_applies(&self, grant: &PermissionGrant) -> bool {
        match grant.grantee {
            Grantee::Public => true,
            // Tenant grants cover members of the tenant, not anonymous
            // visitors browsing under its scope.
            Grantee::Tenant(tenant) => {
                self.scope.tenant_id == Some(tenant) && !self.scope.actor.is_system()
            }
            Grantee::Role(role) => self.roles.contains(&role),
            Grantee::Group(group) => self.groups.contains(&group),
            Grantee::User(user) => self.scope.user_id() == Some(user),
        }
    }
}

/// Seeding surface for the directory data permission checks read.
///
/// Hosts own users, roles, groups and tenant links; the engine only stores
/// the projections it needs to evaluate rules and grants.
#[derive(Clone)]
pub struct DirectoryService {
    store: PermissionStore,
}

impl DirectoryService {
    pub fn new(db: &Database) -> Self {
        Self {
            store: PermissionStore::new(db),
        }
    }

    /// Links two tenants; inherited permissions flow both ways.
    pub async fn link_tenants(&self, a: TenantId, b: TenantId) -> EngineResult<()> {
        let store = self.store.clone();
        run_blocking(move || store.add_tenant_link(a, b)).await
    }

    /// Removes a tenant link.
    pub async fn unlink_tenants(&self, a: TenantId, b: TenantId) -> EngineResult<()> {
        let store = self.store.clone();
        run_blocking(move || store.remove_tenant_link(a, b)).await
    }

    /// Tenants directly linked to the given one.
    pub async fn linked_tenants(&self, tenant: TenantId) -> EngineResult<Vec<TenantId>> {
        let store = self.store.clone();
        run_blocking(move || store.linked_tenants(tenant)).await
    }

    /// Records that a user holds a permission key within a tenant.
    pub async fn grant_permission(
        &self,
        tenant: TenantId,
        user: UserId,
        permission: &str,
    ) -> EngineResult<()> {
        let store = self.store.clone();
        let permission = permission.to_owned();
        run_blocking(move || store.grant_user_permission(tenant, user, &permission)).await
    }

    /// Assigns a role to a user within a tenant.
    pub async fn assign_role(
        &self,
        tenant: TenantId,
        user: UserId,
        role: RoleId,
    ) -> EngineResult<()> {
        let store = self.store.clone();
        run_blocking(move || store.assign_role(tenant, user, role)).await
    }

    /// Adds a user to a group.
    pub async fn add_group_member(&self, group: GroupId, user: UserId) -> EngineResult<()> {
        let store = self.store.clone();
        run_blocking(move || store.add_group_member(group, user)).await
    }

    /// Registers (or replaces) the permission rule for an entity action.
    pub async fn set_entity_rule(&self, rule: EntityRule) -> EngineResult<()> {
        let store = self.store.clone();
        run_blocking(move || store.upsert_rule(&rule)).await
    }

    /// The rules registered for an entity.
    pub async fn entity_rules(&self, entity_id: EntityId) -> EngineResult<Vec<EntityRule>> {
        let store = self.store.clone();
        run_blocking(move || store.list_rules(entity_id)).await
    }
}
