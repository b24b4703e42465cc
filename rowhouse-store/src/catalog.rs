//! Persistence for the entity catalog: entity definitions, properties,
//! declared relationships and webhook registrations.

use rowhouse_model::{
    Cardinality, EntityDef, EntityRelationship, EntityWebhook, Property, PropertyKind, Visibility,
    WebhookAction,
};
use rowhouse_types::{EntityId, PropertyId, RelationshipId, TenantId, Timestamp, WebhookId};
use rusqlite::{params, OptionalExtension};

use crate::database::{id_col, json_col, json_param, opt_id_col, Database};
use crate::error::StoreResult;

/// Store facade for catalog records.
#[derive(Clone)]
pub struct CatalogStore {
    db: Database,
}

impl CatalogStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    // ── Entities ────────────────────────────────────────────────────────────

    /// Inserts a new entity definition.
    pub fn insert_entity(&self, entity: &EntityDef) -> StoreResult<()> {
        let features = json_param(&entity.features)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO entities (id, name, slug, prefix, title, title_plural, position,
                 features, default_visibility, on_created, on_edit, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                entity.id.to_string(),
                entity.name,
                entity.slug,
                entity.prefix,
                entity.title,
                entity.title_plural,
                entity.order,
                features,
                visibility_to_str(entity.default_visibility),
                entity.on_created,
                entity.on_edit,
                entity.active,
                entity.created_at.as_millis(),
                entity.updated_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    /// Rewrites an existing entity definition.
    pub fn update_entity(&self, entity: &EntityDef) -> StoreResult<()> {
        let features = json_param(&entity.features)?;
        let conn = self.db.conn();
        conn.execute(
            "UPDATE entities SET name = ?2, slug = ?3, prefix = ?4, title = ?5,
                 title_plural = ?6, position = ?7, features = ?8, default_visibility = ?9,
                 on_created = ?10, on_edit = ?11, active = ?12, updated_at = ?13
             WHERE id = ?1",
            params![
                entity.id.to_string(),
                entity.name,
                entity.slug,
                entity.prefix,
                entity.title,
                entity.title_plural,
                entity.order,
                features,
                visibility_to_str(entity.default_visibility),
                entity.on_created,
                entity.on_edit,
                entity.active,
                entity.updated_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn get_entity(&self, id: EntityId) -> StoreResult<Option<EntityDef>> {
        let conn = self.db.conn();
        let entity = conn
            .query_row(
                &format!("{ENTITY_SELECT} WHERE id = ?1"),
                params![id.to_string()],
                map_entity,
            )
            .optional()?;
        Ok(entity)
    }

    pub fn get_entity_by_name(&self, name: &str) -> StoreResult<Option<EntityDef>> {
        let conn = self.db.conn();
        let entity = conn
            .query_row(
                &format!("{ENTITY_SELECT} WHERE name = ?1"),
                params![name],
                map_entity,
            )
            .optional()?;
        Ok(entity)
    }

    pub fn get_entity_by_slug(&self, slug: &str) -> StoreResult<Option<EntityDef>> {
        let conn = self.db.conn();
        let entity = conn
            .query_row(
                &format!("{ENTITY_SELECT} WHERE slug = ?1"),
                params![slug],
                map_entity,
            )
            .optional()?;
        Ok(entity)
    }

    /// Looks for an existing entity claiming any of the three unique keys.
    pub fn find_key_collision(
        &self,
        name: &str,
        slug: &str,
        prefix: &str,
    ) -> StoreResult<Option<EntityDef>> {
        let conn = self.db.conn();
        let entity = conn
            .query_row(
                &format!("{ENTITY_SELECT} WHERE name = ?1 OR slug = ?2 OR prefix = ?3"),
                params![name, slug, prefix],
                map_entity,
            )
            .optional()?;
        Ok(entity)
    }

    /// All entity definitions in catalog order.
    pub fn list_entities(&self) -> StoreResult<Vec<EntityDef>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!("{ENTITY_SELECT} ORDER BY position, name"))?;
        let entities = stmt
            .query_map([], map_entity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entities)
    }

    /// Removes an entity definition and its catalog companions. Row data is
    /// the caller's responsibility.
    pub fn delete_entity(&self, id: EntityId) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let key = id.to_string();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM properties WHERE entity_id = ?1", params![key])?;
        tx.execute(
            "DELETE FROM entity_relationships WHERE parent_entity_id = ?1 OR child_entity_id = ?1",
            params![key],
        )?;
        tx.execute("DELETE FROM views WHERE entity_id = ?1", params![key])?;
        tx.execute("DELETE FROM workflow_states WHERE entity_id = ?1", params![key])?;
        tx.execute("DELETE FROM workflow_steps WHERE entity_id = ?1", params![key])?;
        tx.execute("DELETE FROM entity_tags WHERE entity_id = ?1", params![key])?;
        tx.execute("DELETE FROM entity_webhooks WHERE entity_id = ?1", params![key])?;
        tx.execute("DELETE FROM entity_rules WHERE entity_id = ?1", params![key])?;
        tx.execute("DELETE FROM entities WHERE id = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }

    // ── Properties ──────────────────────────────────────────────────────────

    pub fn insert_property(&self, property: &Property) -> StoreResult<()> {
        let options = json_param(&property.options)?;
        let attributes = json_param(&property.attributes)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO properties (id, entity_id, tenant_id, name, title, kind, subtype,
                 position, is_dynamic, is_required, is_hidden, is_display, is_read_only,
                 can_update, show_in_create, formula_id, options, attributes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                property.id.to_string(),
                property.entity_id.to_string(),
                property.tenant_id.map(|t| t.to_string()),
                property.name,
                property.title,
                property.kind.to_string(),
                property.subtype,
                property.order,
                property.is_dynamic,
                property.is_required,
                property.is_hidden,
                property.is_display,
                property.is_read_only,
                property.can_update,
                property.show_in_create,
                property.formula_id,
                options,
                attributes,
                property.created_at.as_millis(),
                property.updated_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn update_property(&self, property: &Property) -> StoreResult<()> {
        let options = json_param(&property.options)?;
        let attributes = json_param(&property.attributes)?;
        let conn = self.db.conn();
        conn.execute(
            "UPDATE properties SET name = ?2, title = ?3, kind = ?4, subtype = ?5,
                 position = ?6, is_dynamic = ?7, is_required = ?8, is_hidden = ?9,
                 is_display = ?10, is_read_only = ?11, can_update = ?12, show_in_create = ?13,
                 formula_id = ?14, options = ?15, attributes = ?16, updated_at = ?17
             WHERE id = ?1",
            params![
                property.id.to_string(),
                property.name,
                property.title,
                property.kind.to_string(),
                property.subtype,
                property.order,
                property.is_dynamic,
                property.is_required,
                property.is_hidden,
                property.is_display,
                property.is_read_only,
                property.can_update,
                property.show_in_create,
                property.formula_id,
                options,
                attributes,
                property.updated_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn get_property(&self, id: PropertyId) -> StoreResult<Option<Property>> {
        let conn = self.db.conn();
        let property = conn
            .query_row(
                &format!("{PROPERTY_SELECT} WHERE id = ?1"),
                params![id.to_string()],
                map_property,
            )
            .optional()?;
        Ok(property)
    }

    /// Properties visible to a tenant: the global set plus the tenant's own
    /// dynamic additions, in declared order.
    pub fn list_properties(
        &self,
        entity_id: EntityId,
        tenant_id: Option<TenantId>,
    ) -> StoreResult<Vec<Property>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{PROPERTY_SELECT}
             WHERE entity_id = ?1 AND (tenant_id IS NULL OR tenant_id IS ?2)
             ORDER BY position, name"
        ))?;
        let properties = stmt
            .query_map(
                params![entity_id.to_string(), tenant_id.map(|t| t.to_string())],
                map_property,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(properties)
    }

    pub fn delete_property(&self, id: PropertyId) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let key = id.to_string();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM row_values WHERE property_id = ?1", params![key])?;
        tx.execute("DELETE FROM properties WHERE id = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }

    // ── Relationships ───────────────────────────────────────────────────────

    pub fn insert_relationship(&self, rel: &EntityRelationship) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO entity_relationships (id, parent_entity_id, child_entity_id,
                 cardinality, title, required, cascade_delete, read_only, hidden_if_empty,
                 parent_view_id, child_view_id, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                rel.id.to_string(),
                rel.parent_entity_id.to_string(),
                rel.child_entity_id.to_string(),
                cardinality_to_str(rel.cardinality),
                rel.title,
                rel.required,
                rel.cascade,
                rel.read_only,
                rel.hidden_if_empty,
                rel.parent_view_id.map(|v| v.to_string()),
                rel.child_view_id.map(|v| v.to_string()),
                rel.order,
            ],
        )?;
        Ok(())
    }

    pub fn get_relationship(&self, id: RelationshipId) -> StoreResult<Option<EntityRelationship>> {
        let conn = self.db.conn();
        let rel = conn
            .query_row(
                &format!("{RELATIONSHIP_SELECT} WHERE id = ?1"),
                params![id.to_string()],
                map_relationship,
            )
            .optional()?;
        Ok(rel)
    }

    /// Relationships where the entity appears on either side.
    pub fn list_relationships(&self, entity_id: EntityId) -> StoreResult<Vec<EntityRelationship>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{RELATIONSHIP_SELECT}
             WHERE parent_entity_id = ?1 OR child_entity_id = ?1
             ORDER BY position"
        ))?;
        let rels = stmt
            .query_map(params![entity_id.to_string()], map_relationship)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rels)
    }

    /// The declared relationship connecting two entity types, if any.
    pub fn find_relationship_between(
        &self,
        parent_entity_id: EntityId,
        child_entity_id: EntityId,
    ) -> StoreResult<Option<EntityRelationship>> {
        let conn = self.db.conn();
        let rel = conn
            .query_row(
                &format!(
                    "{RELATIONSHIP_SELECT}
                     WHERE parent_entity_id = ?1 AND child_entity_id = ?2
                     ORDER BY position LIMIT 1"
                ),
                params![parent_entity_id.to_string(), child_entity_id.to_string()],
                map_relationship,
            )
            .optional()?;
        Ok(rel)
    }

    pub fn delete_relationship(&self, id: RelationshipId) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let key = id.to_string();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM row_relationships WHERE relationship_id = ?1",
            params![key],
        )?;
        tx.execute("DELETE FROM entity_relationships WHERE id = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }

    // ── Webhooks ────────────────────────────────────────────────────────────

    pub fn insert_webhook(&self, webhook: &EntityWebhook) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO entity_webhooks (id, entity_id, action, method, endpoint, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                webhook.id.to_string(),
                webhook.entity_id.to_string(),
                webhook.action.to_string(),
                webhook.method,
                webhook.endpoint,
                webhook.active,
            ],
        )?;
        Ok(())
    }

    pub fn update_webhook(&self, webhook: &EntityWebhook) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE entity_webhooks SET action = ?2, method = ?3, endpoint = ?4, active = ?5
             WHERE id = ?1",
            params![
                webhook.id.to_string(),
                webhook.action.to_string(),
                webhook.method,
                webhook.endpoint,
                webhook.active,
            ],
        )?;
        Ok(())
    }

    pub fn list_webhooks(&self, entity_id: EntityId) -> StoreResult<Vec<EntityWebhook>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, action, method, endpoint, active
             FROM entity_webhooks WHERE entity_id = ?1 ORDER BY action",
        )?;
        let webhooks = stmt
            .query_map(params![entity_id.to_string()], map_webhook)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(webhooks)
    }

    /// The webhook registered for one lifecycle action, if any.
    pub fn webhook_for_action(
        &self,
        entity_id: EntityId,
        action: WebhookAction,
    ) -> StoreResult<Option<EntityWebhook>> {
        let conn = self.db.conn();
        let webhook = conn
            .query_row(
                "SELECT id, entity_id, action, method, endpoint, active
                 FROM entity_webhooks WHERE entity_id = ?1 AND action = ?2",
                params![entity_id.to_string(), action.to_string()],
                map_webhook,
            )
            .optional()?;
        Ok(webhook)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────────

const ENTITY_SELECT: &str = "SELECT id, name, slug, prefix, title, title_plural, position,
    features, default_visibility, on_created, on_edit, active, created_at, updated_at
    FROM entities";

fn map_entity(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityDef> {
    Ok(EntityDef {
        id: id_col(row, 0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        prefix: row.get(3)?,
        title: row.get(4)?,
        title_plural: row.get(5)?,
        order: row.get(6)?,
        features: json_col(row, 7)?,
        default_visibility: parse_visibility(&row.get::<_, String>(8)?),
        on_created: row.get(9)?,
        on_edit: row.get(10)?,
        active: row.get(11)?,
        created_at: Timestamp::from_millis(row.get(12)?),
        updated_at: Timestamp::from_millis(row.get(13)?),
    })
}

const PROPERTY_SELECT: &str = "SELECT id, entity_id, tenant_id, name, title, kind, subtype,
    position, is_dynamic, is_required, is_hidden, is_display, is_read_only, can_update,
    show_in_create, formula_id, options, attributes, created_at, updated_at
    FROM properties";

fn map_property(row: &rusqlite::Row<'_>) -> rusqlite::Result<Property> {
    Ok(Property {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        tenant_id: opt_id_col(row, 2)?,
        name: row.get(3)?,
        title: row.get(4)?,
        kind: parse_kind(&row.get::<_, String>(5)?),
        subtype: row.get(6)?,
        order: row.get(7)?,
        is_dynamic: row.get(8)?,
        is_required: row.get(9)?,
        is_hidden: row.get(10)?,
        is_display: row.get(11)?,
        is_read_only: row.get(12)?,
        can_update: row.get(13)?,
        show_in_create: row.get(14)?,
        formula_id: row.get(15)?,
        options: json_col(row, 16)?,
        attributes: json_col(row, 17)?,
        created_at: Timestamp::from_millis(row.get(18)?),
        updated_at: Timestamp::from_millis(row.get(19)?),
    })
}

const RELATIONSHIP_SELECT: &str = "SELECT id, parent_entity_id, child_entity_id, cardinality,
    title, required, cascade_delete, read_only, hidden_if_empty, parent_view_id, child_view_id,
    position
    FROM entity_relationships";

fn map_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityRelationship> {
    Ok(EntityRelationship {
        id: id_col(row, 0)?,
        parent_entity_id: id_col(row, 1)?,
        child_entity_id: id_col(row, 2)?,
        cardinality: parse_cardinality(&row.get::<_, String>(3)?),
        title: row.get(4)?,
        required: row.get(5)?,
        cascade: row.get(6)?,
        read_only: row.get(7)?,
        hidden_if_empty: row.get(8)?,
        parent_view_id: opt_id_col(row, 9)?,
        child_view_id: opt_id_col(row, 10)?,
        order: row.get(11)?,
    })
}

fn map_webhook(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityWebhook> {
    Ok(EntityWebhook {
        id: id_col::<WebhookId>(row, 0)?,
        entity_id: id_col(row, 1)?,
        action: parse_webhook_action(&row.get::<_, String>(2)?),
        method: row.get(3)?,
        endpoint: row.get(4)?,
        active: row.get(5)?,
    })
}

// ── Text forms ──────────────────────────────────────────────────────────────

fn visibility_to_str(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Private => "private",
        Visibility::Tenant => "tenant",
        Visibility::LinkedAccounts => "linked_accounts",
        Visibility::Public => "public",
    }
}

fn parse_visibility(s: &str) -> Visibility {
    match s {
        "tenant" => Visibility::Tenant,
        "linked_accounts" => Visibility::LinkedAccounts,
        "public" => Visibility::Public,
        _ => Visibility::Private,
    }
}

fn parse_kind(s: &str) -> PropertyKind {
    match s {
        "number" => PropertyKind::Number,
        "date" => PropertyKind::Date,
        "boolean" => PropertyKind::Boolean,
        "select" => PropertyKind::Select,
        "multi_select" => PropertyKind::MultiSelect,
        "multi_text" => PropertyKind::MultiText,
        "media" => PropertyKind::Media,
        "range_number" => PropertyKind::RangeNumber,
        "range_date" => PropertyKind::RangeDate,
        "formula" => PropertyKind::Formula,
        _ => PropertyKind::Text,
    }
}

fn cardinality_to_str(cardinality: Cardinality) -> &'static str {
    match cardinality {
        Cardinality::OneToOne => "one_to_one",
        Cardinality::OneToMany => "one_to_many",
        Cardinality::ManyToOne => "many_to_one",
        Cardinality::ManyToMany => "many_to_many",
    }
}

fn parse_cardinality(s: &str) -> Cardinality {
    match s {
        "one_to_one" => Cardinality::OneToOne,
        "one_to_many" => Cardinality::OneToMany,
        "many_to_one" => Cardinality::ManyToOne,
        _ => Cardinality::ManyToMany,
    }
}

fn parse_webhook_action(s: &str) -> WebhookAction {
    match s {
        "updated" => WebhookAction::Updated,
        "deleted" => WebhookAction::Deleted,
        _ => WebhookAction::Created,
    }
}
