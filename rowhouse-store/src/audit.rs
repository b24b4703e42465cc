//! Append-only audit log.
//!
//! Entries are never updated or deleted; browsing is newest-first with
//! LIMIT/OFFSET paging.

use rowhouse_model::AuditEntry;
use rowhouse_types::{RowId, TenantId, Timestamp};
use rusqlite::params;

use crate::database::{id_col, json_col, json_param, opt_id_col, Database};
use crate::error::StoreResult;

/// Store facade for the audit trail.
#[derive(Clone)]
pub struct AuditStore {
    db: Database,
}

impl AuditStore {
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        let actor = json_param(&entry.actor)?;
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO audit_log (id, tenant_id, actor, action, entity_id, row_id, detail,
                 created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id.to_string(),
                entry.tenant_id.map(|t| t.to_string()),
                actor,
                entry.action,
                entry.entity_id.to_string(),
                entry.row_id.to_string(),
                entry.detail,
                entry.created_at.as_millis(),
            ],
        )?;
        Ok(())
    }

    /// Every entry touching one row, newest first. Same-millisecond entries
    /// keep insertion order via the rowid.
    pub fn list_for_row(&self, row_id: RowId) -> StoreResult<Vec<AuditEntry>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{AUDIT_SELECT} WHERE row_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let entries = stmt
            .query_map(params![row_id.to_string()], map_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// A page of a tenant's trail, newest first.
    pub fn list_recent(
        &self,
        tenant_id: Option<TenantId>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<AuditEntry>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(&format!(
            "{AUDIT_SELECT} WHERE tenant_id IS ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        ))?;
        let entries = stmt
            .query_map(
                params![tenant_id.map(|t| t.to_string()), limit, offset],
                map_entry,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn count(&self, tenant_id: Option<TenantId>) -> StoreResult<i64> {
        let conn = self.db.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE tenant_id IS ?1",
            params![tenant_id.map(|t| t.to_string())],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────────

const AUDIT_SELECT: &str = "SELECT id, tenant_id, actor, action, entity_id, row_id, detail,
    created_at
    FROM audit_log";

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: id_col(row, 0)?,
        tenant_id: opt_id_col(row, 1)?,
        actor: json_col(row, 2)?,
        action: row.get(3)?,
        entity_id: id_col(row, 4)?,
        row_id: id_col(row, 5)?,
        detail: row.get(6)?,
        created_at: Timestamp::from_millis(row.get(7)?),
    })
}
