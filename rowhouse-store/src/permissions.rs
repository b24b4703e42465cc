//! Persistence for the access-control directory: row grants, entity rules,
//! tenant links and the user/role/group membership tables the host seeds.

use rowhouse_model::{AccessLevel, EntityAction, EntityRule, PermissionGrant};
use rowhouse_types::{EntityId, GrantId, GroupId, RoleId, RowId, TenantId, Timestamp, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::{id_col, json_col, json_param, Database};
use crate::error::StoreResult;

/// Store facade for permission records.
#[derive(Clone)]
pub struct PermissionStore {
    db: Database,
}

impl PermissionStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    // ── Row grants ──────────────────────────────────────────────────────────

    /// Inserts a grant, raising an existing one for the same grantee.
    pub fn upsert_grant(&self, grant: &PermissionGrant) -> StoreResult<()> {
        let grantee = json_param(&grant.grantee)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO permission_grants (id, row_id, grantee, access, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(row_id, grantee)
             DO UPDATE SET access = excluded.access",
            params![
                grant.id.to_string(),
                grant.row_id.to_string(),
                grantee,
                access_to_str(grant.access),
                grant.created_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_grant(&self, id: GrantId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM permission_grants WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(())
    }

    pub fn list_grants(&self, row_id: RowId) -> StoreResult<Vec<PermissionGrant>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, row_id, grantee, access, created_at FROM permission_grants
             WHERE row_id = ?1",
        )?;
        let grants = stmt
            .query_map(params![row_id.to_string()], map_grant)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(grants)
    }

    /// Grants for every row of an entity, for bulk visibility checks.
    pub fn list_grants_for_entity(&self, entity_id: EntityId) -> StoreResult<Vec<PermissionGrant>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT g.id, g.row_id, g.grantee, g.access, g.created_at
             FROM permission_grants g JOIN rows r ON r.id = g.row_id
             WHERE r.entity_id = ?1",
        )?;
        let grants = stmt
            .query_map(params![entity_id.to_string()], map_grant)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(grants)
    }

    // ── Entity rules ────────────────────────────────────────────────────────

    pub fn upsert_rule(&self, rule: &EntityRule) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO entity_rules (id, entity_id, action, permission)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_id, action)
             DO UPDATE SET permission = excluded.permission",
            params![
                rule.id.to_string(),
                rule.entity_id.to_string(),
                rule.action.as_str(),
                rule.permission,
            ],
        )?;
        Ok(())
    }

    pub fn get_rule(
        &self,
        entity_id: EntityId,
        action: EntityAction,
    ) -> StoreResult<Option<EntityRule>> {
        let conn = self.db.conn();
        let rule = conn
            .query_row(
                "SELECT id, entity_id, action, permission FROM entity_rules
                 WHERE entity_id = ?1 AND action = ?2",
                params![entity_id.to_string(), action.as_str()],
                map_rule,
            )
            .optional()?;
        Ok(rule)
    }

    pub fn list_rules(&self, entity_id: EntityId) -> StoreResult<Vec<EntityRule>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, action, permission FROM entity_rules WHERE entity_id = ?1",
        )?;
        let rules = stmt
            .query_map(params![entity_id.to_string()], map_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    // ── Tenant links ────────────────────────────────────────────────────────

    pub fn add_tenant_link(&self, parent: TenantId, child: TenantId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO tenant_links (parent_tenant_id, child_tenant_id)
             VALUES (?1, ?2)",
            params![parent.to_string(), child.to_string()],
        )?;
        Ok(())
    }

    pub fn remove_tenant_link(&self, parent: TenantId, child: TenantId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM tenant_links WHERE parent_tenant_id = ?1 AND child_tenant_id = ?2",
            params![parent.to_string(), child.to_string()],
        )?;
        Ok(())
    }

    /// Tenants linked to the given tenant, in either direction.
    pub fn linked_tenants(&self, tenant: TenantId) -> StoreResult<Vec<TenantId>> {
        let conn = self.db.conn();
        let key = tenant.to_string();
        let mut stmt = conn.prepare(
            "SELECT child_tenant_id FROM tenant_links WHERE parent_tenant_id = ?1
             UNION
             SELECT parent_tenant_id FROM tenant_links WHERE child_tenant_id = ?1",
        )?;
        let linked = stmt
            .query_map(params![key], |row| id_col(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(linked)
    }

    // ── User directory ──────────────────────────────────────────────────────

    pub fn grant_user_permission(
        &self,
        tenant: TenantId,
        user: UserId,
        permission: &str,
    ) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO user_permissions (tenant_id, user_id, permission)
             VALUES (?1, ?2, ?3)",
            params![tenant.to_string(), user.to_string(), permission],
        )?;
        Ok(())
    }

    pub fn user_has_permission(
        &self,
        tenant: TenantId,
        user: UserId,
        permission: &str,
    ) -> StoreResult<bool> {
        let conn = self.db.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_permissions
             WHERE tenant_id = ?1 AND user_id = ?2 AND permission = ?3",
            params![tenant.to_string(), user.to_string(), permission],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn assign_role(&self, tenant: TenantId, user: UserId, role: RoleId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (tenant_id, user_id, role_id)
             VALUES (?1, ?2, ?3)",
            params![tenant.to_string(), user.to_string(), role.to_string()],
        )?;
        Ok(())
    }

    pub fn roles_for_user(&self, tenant: TenantId, user: UserId) -> StoreResult<Vec<RoleId>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT role_id FROM user_roles WHERE tenant_id = ?1 AND user_id = ?2",
        )?;
        let roles = stmt
            .query_map(params![tenant.to_string(), user.to_string()], |row| {
                id_col(row, 0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roles)
    }

    pub fn add_group_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            params![group.to_string(), user.to_string()],
        )?;
        Ok(())
    }

    pub fn groups_for_user(&self, user: UserId) -> StoreResult<Vec<GroupId>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare("SELECT group_id FROM group_members WHERE user_id = ?1")?;
        let groups = stmt
            .query_map(params![user.to_string()], |row| id_col(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────────

fn map_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<PermissionGrant> {
    Ok(PermissionGrant {
        id: id_col::<GrantId>(row, 0)?,
        row_id: id_col(row, 1)?,
        grantee: json_col(row, 2)?,
        access: parse_access(&row.get::<_, String>(3)?),
        created_at: Timestamp::from_millis(row.get(4)?),
    })
}

fn map_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRule> {
    Ok(EntityRule {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        action: parse_entity_action(&row.get::<_, String>(2)?),
        permission: row.get(3)?,
    })
}

// ── Text forms ──────────────────────────────────────────────────────────────

pub(crate) fn access_to_str(access: AccessLevel) -> &'static str {
    match access {
        AccessLevel::View => "view",
        AccessLevel::Comment => "comment",
        AccessLevel::Edit => "edit",
    }
}

fn parse_access(s: &str) -> AccessLevel {
    match s {
        "comment" => AccessLevel::Comment,
        "edit" => AccessLevel::Edit,
        _ => AccessLevel::View,
    }
}

fn parse_entity_action(s: &str) -> EntityAction {
    match s {
        "read" => EntityAction::Read,
        "create" => EntityAction::Create,
        "update" => EntityAction::Update,
        "delete" => EntityAction::Delete,
        _ => EntityAction::View,
    }
}
