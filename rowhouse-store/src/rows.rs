//! Persistence for rows and everything scoped to a row: dynamic values,
//! relationship edges, tags, comments and tasks.
//!
//! Folio and position assignment happens inside the insert transaction, so
//! the read-max-then-insert is atomic under the shared connection mutex.

use rowhouse_model::{
    EntityTag, PermissionGrant, Row, RowComment, RowRelationship, RowTag, RowTask, RowValue,
};
use rowhouse_types::{EntityId, RowId, StateId, TagId, TaskId, TenantId, Timestamp};
use rusqlite::{params, OptionalExtension, Transaction};

use crate::database::{id_col, json_col, json_param, opt_id_col, Database};
use crate::error::{StoreError, StoreResult};
use crate::permissions::access_to_str;

/// Store facade for row data.
#[derive(Clone)]
pub struct RowStore {
    db: Database,
}

impl RowStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    // ── Rows ────────────────────────────────────────────────────────────────

    /// Inserts a row together with its values, edges and initial grants in
    /// one transaction. Assigns `folio` and `order` from the current maxima
    /// of the row's (entity, tenant) scope, so both are written back to
    /// `row` before the insert.
    pub fn create_row(
        &self,
        row: &mut Row,
        values: &[RowValue],
        edges: &[RowRelationship],
        grants: &[PermissionGrant],
    ) -> StoreResult<()> {
        let created_by = json_param(&row.created_by)?;
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;

        let entity_key = row.entity_id.to_string();
        let tenant_key = row.tenant_id.map(|t| t.to_string());
        row.folio = tx.query_row(
            "SELECT COALESCE(MAX(folio), 0) + 1 FROM rows
             WHERE entity_id = ?1 AND tenant_id IS ?2",
            params![entity_key, tenant_key],
            |r| r.get(0),
        )?;
        row.order = tx.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM rows
             WHERE entity_id = ?1 AND tenant_id IS ?2",
            params![entity_key, tenant_key],
            |r| r.get(0),
        )?;

        tx.execute(
            "INSERT INTO rows (id, entity_id, tenant_id, folio, position, workflow_state_id,
                 created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                row.id.to_string(),
                entity_key,
                tenant_key,
                row.folio,
                row.order,
                row.workflow_state_id.map(|s| s.to_string()),
                created_by,
                row.created_at.as_millis(),
                row.updated_at.as_millis(),
            ],
        )?;
        for value in values {
            insert_value(&tx, value)?;
        }
        for edge in edges {
            insert_edge_tx(&tx, edge)?;
        }
        for grant in grants {
            insert_grant_tx(&tx, grant)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_row(&self, id: RowId) -> StoreResult<Option<Row>> {
        let conn = self.db.conn();
        let row = conn
            .query_row(
                &format!("{ROW_SELECT} WHERE id = ?1"),
                params![id.to_string()],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All rows of an entity, newest position first. Callers apply access
    /// filtering; the stable sort upstream keeps this order for ties.
    pub fn list_rows(&self, entity_id: EntityId) -> StoreResult<Vec<Row>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{ROW_SELECT} WHERE entity_id = ?1 ORDER BY position DESC, created_at DESC"
        ))?;
        let rows = stmt
            .query_map(params![entity_id.to_string()], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// The most recently positioned rows of an entity, capped. Used by
    /// relationship pickers.
    pub fn list_recent_rows(&self, entity_id: EntityId, limit: i64) -> StoreResult<Vec<Row>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{ROW_SELECT} WHERE entity_id = ?1
             ORDER BY position DESC, created_at DESC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![entity_id.to_string(), limit], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Upserts dynamic values and optionally replaces relationship edges.
    ///
    /// When a direction is supplied every existing edge of that direction is
    /// deleted and the supplied set inserted; passing `None` leaves the
    /// direction untouched. Runs as one transaction and touches the row's
    /// `updated_at`.
    pub fn update_row(
        &self,
        row_id: RowId,
        values: &[RowValue],
        replace_parents: Option<&[RowRelationship]>,
        replace_children: Option<&[RowRelationship]>,
        updated_at: Timestamp,
    ) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let key = row_id.to_string();

        for value in values {
            insert_value(&tx, value)?;
        }
        if let Some(parents) = replace_parents {
            tx.execute("DELETE FROM row_relationships WHERE child_row_id = ?1", params![key])?;
            for edge in parents {
                insert_edge_tx(&tx, edge)?;
            }
        }
        if let Some(children) = replace_children {
            tx.execute("DELETE FROM row_relationships WHERE parent_row_id = ?1", params![key])?;
            for edge in children {
                insert_edge_tx(&tx, edge)?;
            }
        }
        tx.execute(
            "UPDATE rows SET updated_at = ?2 WHERE id = ?1",
            params![key, updated_at.as_millis()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn set_workflow_state(
        &self,
        row_id: RowId,
        state_id: StateId,
        updated_at: Timestamp,
    ) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE rows SET workflow_state_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![row_id.to_string(), state_id.to_string(), updated_at.as_millis()],
        )?;
        Ok(())
    }

    /// Deletes a set of rows and all their row-scoped records in one
    /// transaction. Callers compute the cascade closure first.
    pub fn delete_rows(&self, ids: &[RowId]) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        for id in ids {
            let key = id.to_string();
            tx.execute("DELETE FROM row_values WHERE row_id = ?1", params![key])?;
            tx.execute(
                "DELETE FROM row_relationships WHERE parent_row_id = ?1 OR child_row_id = ?1",
                params![key],
            )?;
            tx.execute("DELETE FROM permission_grants WHERE row_id = ?1", params![key])?;
            tx.execute("DELETE FROM row_tags WHERE row_id = ?1", params![key])?;
            tx.execute("DELETE FROM row_comments WHERE row_id = ?1", params![key])?;
            tx.execute("DELETE FROM row_tasks WHERE row_id = ?1", params![key])?;
            tx.execute(
                "DELETE FROM row_workflow_transitions WHERE row_id = ?1",
                params![key],
            )?;
            tx.execute("DELETE FROM rows WHERE id = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Places a row at an explicit position, as drag-and-drop reordering
    /// does. Collisions are tolerated; the next swap renumbers the scope.
    pub fn set_position(&self, row_id: RowId, position: i64) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE rows SET position = ?2 WHERE id = ?1",
            params![row_id.to_string(), position],
        )?;
        Ok(())
    }

    /// Swaps a row's position with its neighbor one step up or down.
    ///
    /// When other rows share the row's current position the whole
    /// (entity, tenant) sequence is renumbered instead and no swap happens;
    /// the return value reports which path ran.
    pub fn swap_position(&self, row_id: RowId, up: bool) -> StoreResult<bool> {
        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        let key = row_id.to_string();

        let (entity_key, tenant_key, position): (String, Option<String>, i64) = tx
            .query_row(
                "SELECT entity_id, tenant_id, position FROM rows WHERE id = ?1",
                params![key],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("row {row_id}")))?;

        let duplicates: i64 = tx.query_row(
            "SELECT COUNT(*) FROM rows
             WHERE entity_id = ?1 AND tenant_id IS ?2 AND position = ?3",
            params![entity_key, tenant_key, position],
            |r| r.get(0),
        )?;
        if duplicates > 1 {
            renumber_positions(&tx, &entity_key, tenant_key.as_deref())?;
            tx.commit()?;
            return Ok(false);
        }

        let target = if up { position + 1 } else { position - 1 };
        let neighbor: Option<String> = tx
            .query_row(
                "SELECT id FROM rows
                 WHERE entity_id = ?1 AND tenant_id IS ?2 AND position = ?3",
                params![entity_key, tenant_key, target],
                |r| r.get(0),
            )
            .optional()?;
        let Some(neighbor_key) = neighbor else {
            tx.commit()?;
            return Ok(false);
        };

        tx.execute(
            "UPDATE rows SET position = ?2 WHERE id = ?1",
            params![neighbor_key, position],
        )?;
        tx.execute(
            "UPDATE rows SET position = ?2 WHERE id = ?1",
            params![key, target],
        )?;
        tx.commit()?;
        Ok(true)
    }

    // ── Values ──────────────────────────────────────────────────────────────

    pub fn get_values(&self, row_id: RowId) -> StoreResult<Vec<RowValue>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT row_id, property_id, value, updated_at FROM row_values WHERE row_id = ?1",
        )?;
        let values = stmt
            .query_map(params![row_id.to_string()], map_value)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }

    /// Every stored value of every row of an entity, for bulk evaluation.
    pub fn list_values(&self, entity_id: EntityId) -> StoreResult<Vec<RowValue>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT v.row_id, v.property_id, v.value, v.updated_at
             FROM row_values v JOIN rows r ON r.id = v.row_id
             WHERE r.entity_id = ?1",
        )?;
        let values = stmt
            .query_map(params![entity_id.to_string()], map_value)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }

    // ── Relationship edges ──────────────────────────────────────────────────

    pub fn insert_edge(&self, edge: &RowRelationship) -> StoreResult<()> {
        let conn = self.db.conn();
        insert_edge_conn(&conn, edge)
    }

    pub fn delete_edge(&self, edge: &RowRelationship) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM row_relationships
             WHERE relationship_id = ?1 AND parent_row_id = ?2 AND child_row_id = ?3",
            params![
                edge.relationship_id.to_string(),
                edge.parent_row_id.to_string(),
                edge.child_row_id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Edges where the row is the parent.
    pub fn edges_for_parent(&self, row_id: RowId) -> StoreResult<Vec<RowRelationship>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT relationship_id, parent_row_id, child_row_id
             FROM row_relationships WHERE parent_row_id = ?1",
        )?;
        let edges = stmt
            .query_map(params![row_id.to_string()], map_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Edges where the row is the child.
    pub fn edges_for_child(&self, row_id: RowId) -> StoreResult<Vec<RowRelationship>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT relationship_id, parent_row_id, child_row_id
             FROM row_relationships WHERE child_row_id = ?1",
        )?;
        let edges = stmt
            .query_map(params![row_id.to_string()], map_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Edges whose child row belongs to the given entity.
    pub fn list_edges_for_entity(&self, entity_id: EntityId) -> StoreResult<Vec<RowRelationship>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT e.relationship_id, e.parent_row_id, e.child_row_id
             FROM row_relationships e
             JOIN rows r ON r.id = e.child_row_id
             WHERE r.entity_id = ?1",
        )?;
        let edges = stmt
            .query_map(params![entity_id.to_string()], map_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    // ── Tags ────────────────────────────────────────────────────────────────

    pub fn insert_tag(&self, tag: &EntityTag) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO entity_tags (id, entity_id, tenant_id, value, color)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tag.id.to_string(),
                tag.entity_id.to_string(),
                tag.tenant_id.map(|t| t.to_string()),
                tag.value,
                tag.color,
            ],
        )?;
        Ok(())
    }

    pub fn get_tag_by_value(
        &self,
        entity_id: EntityId,
        tenant_id: Option<TenantId>,
        value: &str,
    ) -> StoreResult<Option<EntityTag>> {
        let conn = self.db.conn();
        let tag = conn
            .query_row(
                "SELECT id, entity_id, tenant_id, value, color FROM entity_tags
                 WHERE entity_id = ?1 AND tenant_id IS ?2 AND value = ?3",
                params![
                    entity_id.to_string(),
                    tenant_id.map(|t| t.to_string()),
                    value
                ],
                map_tag,
            )
            .optional()?;
        Ok(tag)
    }

    /// Tags usable in a tenant: the global set plus the tenant's own.
    pub fn list_tags(
        &self,
        entity_id: EntityId,
        tenant_id: Option<TenantId>,
    ) -> StoreResult<Vec<EntityTag>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, entity_id, tenant_id, value, color FROM entity_tags
             WHERE entity_id = ?1 AND (tenant_id IS NULL OR tenant_id IS ?2)
             ORDER BY value",
        )?;
        let tags = stmt
            .query_map(
                params![entity_id.to_string(), tenant_id.map(|t| t.to_string())],
                map_tag,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    pub fn delete_tag(&self, tag_id: TagId) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let key = tag_id.to_string();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM row_tags WHERE tag_id = ?1", params![key])?;
        tx.execute("DELETE FROM entity_tags WHERE id = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }

    pub fn add_row_tag(&self, row_id: RowId, tag_id: TagId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT OR IGNORE INTO row_tags (row_id, tag_id) VALUES (?1, ?2)",
            params![row_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    pub fn remove_row_tag(&self, row_id: RowId, tag_id: TagId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "DELETE FROM row_tags WHERE row_id = ?1 AND tag_id = ?2",
            params![row_id.to_string(), tag_id.to_string()],
        )?;
        Ok(())
    }

    pub fn tags_for_row(&self, row_id: RowId) -> StoreResult<Vec<EntityTag>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.entity_id, t.tenant_id, t.value, t.color
             FROM entity_tags t JOIN row_tags rt ON rt.tag_id = t.id
             WHERE rt.row_id = ?1 ORDER BY t.value",
        )?;
        let tags = stmt
            .query_map(params![row_id.to_string()], map_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Every (row, tag) join for an entity, for bulk tag filtering.
    pub fn list_row_tags(&self, entity_id: EntityId) -> StoreResult<Vec<RowTag>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT rt.row_id, rt.tag_id
             FROM row_tags rt JOIN rows r ON r.id = rt.row_id
             WHERE r.entity_id = ?1",
        )?;
        let joins = stmt
            .query_map(params![entity_id.to_string()], |row| {
                Ok(RowTag {
                    row_id: id_col(row, 0)?,
                    tag_id: id_col(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(joins)
    }

    // ── Comments and tasks ──────────────────────────────────────────────────

    pub fn insert_comment(&self, comment: &RowComment) -> StoreResult<()> {
        let author = json_param(&comment.author)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO row_comments (id, row_id, author, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id.to_string(),
                comment.row_id.to_string(),
                author,
                comment.body,
                comment.created_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn list_comments(&self, row_id: RowId) -> StoreResult<Vec<RowComment>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, row_id, author, body, created_at FROM row_comments
             WHERE row_id = ?1 ORDER BY created_at",
        )?;
        let comments = stmt
            .query_map(params![row_id.to_string()], |row| {
                Ok(RowComment {
                    id: id_col(row, 0)?,
                    row_id: id_col(row, 1)?,
                    author: json_col(row, 2)?,
                    body: row.get(3)?,
                    created_at: Timestamp::from_millis(row.get(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    pub fn insert_task(&self, task: &RowTask) -> StoreResult<()> {
        let created_by = json_param(&task.created_by)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO row_tasks (id, row_id, title, done, created_by, created_at, due_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id.to_string(),
                task.row_id.to_string(),
                task.title,
                task.done,
                created_by,
                task.created_at.as_millis(),
                task.due_at.map(|t| t.as_millis()),
            ],
        )?;
        Ok(())
    }

    pub fn set_task_done(&self, task_id: TaskId, done: bool) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute(
            "UPDATE row_tasks SET done = ?2 WHERE id = ?1",
            params![task_id.to_string(), done],
        )?;
        Ok(())
    }

    pub fn list_tasks(&self, row_id: RowId) -> StoreResult<Vec<RowTask>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, row_id, title, done, created_by, created_at, due_at FROM row_tasks
             WHERE row_id = ?1 ORDER BY created_at",
        )?;
        let tasks = stmt
            .query_map(params![row_id.to_string()], |row| {
                Ok(RowTask {
                    id: id_col(row, 0)?,
                    row_id: id_col(row, 1)?,
                    title: row.get(2)?,
                    done: row.get(3)?,
                    created_by: json_col(row, 4)?,
                    created_at: Timestamp::from_millis(row.get(5)?),
                    due_at: row.get::<_, Option<i64>>(6)?.map(Timestamp::from_millis),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}

// ── Shared statement helpers ────────────────────────────────────────────────

const ROW_SELECT: &str = "SELECT id, entity_id, tenant_id, folio, position, workflow_state_id,
    created_by, created_at, updated_at
    FROM rows";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    Ok(Row {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        tenant_id: opt_id_col(row, 2)?,
        folio: row.get(3)?,
        order: row.get(4)?,
        workflow_state_id: opt_id_col(row, 5)?,
        created_by: json_col(row, 6)?,
        created_at: Timestamp::from_millis(row.get(7)?),
        updated_at: Timestamp::from_millis(row.get(8)?),
    })
}

fn map_value(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowValue> {
    Ok(RowValue {
        row_id: id_col(row, 0)?,
        property_id: id_col(row, 1)?,
        value: json_col(row, 2)?,
        updated_at: Timestamp::from_millis(row.get(3)?),
    })
}

fn map_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowRelationship> {
    Ok(RowRelationship {
        relationship_id: id_col(row, 0)?,
        parent_row_id: id_col(row, 1)?,
        child_row_id: id_col(row, 2)?,
    })
}

fn map_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityTag> {
    Ok(EntityTag {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        tenant_id: opt_id_col(row, 2)?,
        value: row.get(3)?,
        color: row.get(4)?,
    })
}

fn insert_value(tx: &Transaction<'_>, value: &RowValue) -> StoreResult<()> {
    let json = json_param(&value.value)?;
    tx.execute(
        "INSERT INTO row_values (row_id, property_id, value, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(row_id, property_id)
         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![
            value.row_id.to_string(),
            value.property_id.to_string(),
            json,
            value.updated_at.as_millis(),
        ],
    )?;
    Ok(())
}

fn insert_edge_tx(tx: &Transaction<'_>, edge: &RowRelationship) -> StoreResult<()> {
    tx.execute(
        "INSERT OR IGNORE INTO row_relationships (relationship_id, parent_row_id, child_row_id)
         VALUES (?1, ?2, ?3)",
        params![
            edge.relationship_id.to_string(),
            edge.parent_row_id.to_string(),
            edge.child_row_id.to_string(),
        ],
    )?;
    Ok(())
}

fn insert_edge_conn(conn: &rusqlite::Connection, edge: &RowRelationship) -> StoreResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO row_relationships (relationship_id, parent_row_id, child_row_id)
         VALUES (?1, ?2, ?3)",
        params![
            edge.relationship_id.to_string(),
            edge.parent_row_id.to_string(),
            edge.child_row_id.to_string(),
        ],
    )?;
    Ok(())
}

fn insert_grant_tx(tx: &Transaction<'_>, grant: &PermissionGrant) -> StoreResult<()> {
    let grantee = json_param(&grant.grantee)?;
    tx.execute(
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

/// Gives every row of the scope a distinct position, keeping relative order.
fn renumber_positions(
    tx: &Transaction<'_>,
    entity_key: &str,
    tenant_key: Option<&str>,
) -> StoreResult<()> {
    let mut stmt = tx.prepare(
        "SELECT id FROM rows WHERE entity_id = ?1 AND tenant_id IS ?2
         ORDER BY position, created_at",
    )?;
    let ids = stmt
        .query_map(params![entity_key, tenant_key], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    drop(stmt);
    for (index, id) in ids.iter().enumerate() {
        tx.execute(
            "UPDATE rows SET position = ?2 WHERE id = ?1",
            params![id, (index + 1) as i64],
        )?;
    }
    Ok(())
}
