//! Persistence for saved views.

use rowhouse_model::{EntityView, ViewLayout};
use rowhouse_types::{EntityId, Timestamp, ViewId};
use rusqlite::{params, OptionalExtension};

use crate::database::{id_col, json_col, json_param, opt_json_col, Database};
use crate::error::{StoreError, StoreResult};

/// Store facade for view records.
#[derive(Clone)]
pub struct ViewStore {
    db: Database,
}

impl ViewStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub fn insert_view(&self, view: &EntityView) -> StoreResult<()> {
        let scope = json_param(&view.scope)?;
        let columns = json_param(&view.columns)?;
        let filters = json_param(&view.filters)?;
        let sorts = json_param(&view.sorts)?;
        let group_by = view.group_by.as_ref().map(json_param).transpose()?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO views (id, entity_id, name, scope, layout, page_size, columns,
                 filters, sorts, group_by, is_default, is_system, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                view.id.to_string(),
                view.entity_id.to_string(),
                view.name,
                scope,
                layout_to_str(view.layout),
                view.page_size,
                columns,
                filters,
                sorts,
                group_by,
                view.is_default,
                view.is_system,
                view.created_at.as_millis(),
                view.updated_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn update_view(&self, view: &EntityView) -> StoreResult<()> {
        let scope = json_param(&view.scope)?;
        let columns = json_param(&view.columns)?;
        let filters = json_param(&view.filters)?;
        let sorts = json_param(&view.sorts)?;
        let group_by = view.group_by.as_ref().map(json_param).transpose()?;
        let conn = self.db.conn();
        conn.execute(
            "UPDATE views SET name = ?2, scope = ?3, layout = ?4, page_size = ?5,
                 columns = ?6, filters = ?7, sorts = ?8, group_by = ?9, is_default = ?10,
                 is_system = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                view.id.to_string(),
                view.name,
                scope,
                layout_to_str(view.layout),
                view.page_size,
                columns,
                filters,
                sorts,
                group_by,
                view.is_default,
                view.is_system,
                view.updated_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn get_view(&self, id: ViewId) -> StoreResult<Option<EntityView>> {
        let conn = self.db.conn();
        let view = conn
            .query_row(
                &format!("{VIEW_SELECT} WHERE id = ?1"),
                params![id.to_string()],
                map_view,
            )
            .optional()?;
        Ok(view)
    }

    /// All views declared for an entity, across scopes. Callers narrow by
    /// visibility.
    pub fn list_views(&self, entity_id: EntityId) -> StoreResult<Vec<EntityView>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!("{VIEW_SELECT} WHERE entity_id = ?1 ORDER BY name"))?;
        let views = stmt
            .query_map(params![entity_id.to_string()], map_view)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(views)
    }

    pub fn delete_view(&self, id: ViewId) -> StoreResult<()> {
        let conn = self.db.conn();
        conn.execute("DELETE FROM views WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    /// Makes the view its scope's default, clearing any previous default of
    /// the same (entity, scope) pair.
    pub fn set_default(&self, id: ViewId) -> StoreResult<()> {
        let mut conn = self.db.conn();
        let key = id.to_string();
        let tx = conn.transaction()?;
        let (entity_key, scope_key): (String, String) = tx
            .query_row(
                "SELECT entity_id, scope FROM views WHERE id = ?1",
                params![key],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("view {id}")))?;
        tx.execute(
            "UPDATE views SET is_default = 0 WHERE entity_id = ?1 AND scope = ?2",
            params![entity_key, scope_key],
        )?;
        tx.execute("UPDATE views SET is_default = 1 WHERE id = ?1", params![key])?;
        tx.commit()?;
        Ok(())
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────────

const VIEW_SELECT: &str = "SELECT id, entity_id, name, scope, layout, page_size, columns,
    filters, sorts, group_by, is_default, is_system, created_at, updated_at
    FROM views";

fn map_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntityView> {
    Ok(EntityView {
        id: id_col(row, 0)?,
        entity_id: id_col(row, 1)?,
        name: row.get(2)?,
        scope: json_col(row, 3)?,
        layout: parse_layout(&row.get::<_, String>(4)?),
        page_size: row.get(5)?,
        columns: json_col(row, 6)?,
        filters: json_col(row, 7)?,
        sorts: json_col(row, 8)?,
        group_by: opt_json_col(row, 9)?,
        is_default: row.get(10)?,
        is_system: row.get(11)?,
        created_at: Timestamp::from_millis(row.get(12)?),
        updated_at: Timestamp::from_millis(row.get(13)?),
    })
}

// ── Text forms ──────────────────────────────────────────────────────────────

fn layout_to_str(layout: ViewLayout) -> &'static str {
    match layout {
        ViewLayout::Table => "table",
        ViewLayout::Board => "board",
        ViewLayout::Grid => "grid",
    }
}

fn parse_layout(s: &str) -> ViewLayout {
    match s {
        "board" => ViewLayout::Board,
        "grid" => ViewLayout::Grid,
        _ => ViewLayout::Table,
    }
}
