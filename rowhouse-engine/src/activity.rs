//! Browsing the audit trail.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::query::Pagination;
use crate::task::run_blocking;
use rowhouse_model::AuditEntry;
use rowhouse_store::{AuditStore, Database};
use rowhouse_types::{RowId, TenantId};

/// One page of audit entries, newest first.
#[derive(Debug, Clone)]
pub struct ActivityPage {
    pub entries: Vec<AuditEntry>,
    pub pagination: Pagination,
}

/// Read access to the audit trail.
#[derive(Clone)]
pub struct ActivityLog {
    store: AuditStore,
    page_size: i64,
}

impl ActivityLog {
    pub(crate) fn new(db: &Database, config: &EngineConfig) -> Self {
        Self {
            store: AuditStore::new(db),
            page_size: config.audit_page_size,
        }
    }

    /// Every entry recorded for one row, newest first.
    pub async fn for_row(&self, row_id: RowId) -> EngineResult<Vec<AuditEntry>> {
        let store = self.store.clone();
        run_blocking(move || store.list_for_row(row_id)).await
    }

    /// One page of a tenant's trail. Pages are 1-based; entries deleted
    /// between requests shift pages, which browsing tolerates.
    pub async fn recent(
        &self,
        tenant_id: Option<TenantId>,
        page: i64,
    ) -> EngineResult<ActivityPage> {
        let page = page.max(1);
        let page_size = self.page_size;
        let offset = (page - 1) * page_size;

        let store = self.store.clone();
        let entries_fut = run_blocking(move || store.list_recent(tenant_id, page_size, offset));
        let store = self.store.clone();
        let count_fut = run_blocking(move || store.count(tenant_id));
        let (entries, total) = tokio::try_join!(entries_fut, count_fut)?;

        let total_pages = ((total + page_size - 1) / page_size).max(1);
        Ok(ActivityPage {
            entries,
            pagination: Pagination {
                page: page.min(total_pages),
                page_size,
                total,
                total_pages,
            },
        })
    }
}
