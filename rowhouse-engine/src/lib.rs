//! Schema-driven row engine for Rowhouse.
//!
//! Hosts define entity types at runtime (properties, relationships, views,
//! workflow); the engine stores rows of those types and answers queries
//! over them. Nothing here knows about HTTP or rendering: the embedding
//! host maps its requests onto engine calls and its sessions onto
//! [`Scope`](rowhouse_types::Scope) values.
//!
//! # Components
//!
//! - **Catalog**: entity definitions with their properties, relationships,
//!   views and workflow, served through a shared cache
//! - **Rows**: the row lifecycle (list, get, create, update, delete) plus
//!   tags, comments, tasks, sharing and ordering
//! - **Access**: entity-level permission rules and row-level grants
//! - **Query**: view plus URL-parameter driven filtering, search, sorting
//!   and pagination
//! - **Workflow**: state machines over rows
//! - **Activity**: the audit trail
//!
//! # Example
//!
//! ```no_run
//! use rowhouse_engine::{Engine, EntityRef, UrlParams};
//! use rowhouse_store::Database;
//! use rowhouse_types::Scope;
//!
//! # async fn demo() -> rowhouse_engine::EngineResult<()> {
//! let db = Database::open_in_memory()?;
//! let engine = Engine::new(&db);
//!
//! let scope = Scope::system();
//! let page = engine
//!     .rows()
//!     .list_rows(&EntityRef::name("contact"), &scope, &UrlParams::new(), None, None)
//!     .await?;
//! println!("{} contacts", page.pagination.total);
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod activity;
pub mod catalog;
mod config;
mod display;
mod error;
pub mod hooks;
pub mod query;
pub mod rows;
mod task;
pub mod workflow;

pub use access::{AccessContext, DirectoryService, PermissionResolver};
pub use activity::{ActivityLog, ActivityPage};
pub use catalog::{CatalogService, EntityRef, EntityWithDetails};
pub use config::EngineConfig;
pub use display::display_summary;
pub use error::{EngineError, EngineResult};
pub use hooks::{
    EmptyDirectory, InlineMedia, LifecycleHooks, MediaStore, NoopHooks, NullSink, Unmetered,
    UsageMeter, UsageVerdict, UserDirectory, UserProfile, WebhookSink,
};
pub use query::{Pagination, QueryScope, StateFilter, UrlParams};
pub use rows::{
    MutationOptions, OrderDirection, PickerRow, RelationshipPicker, RowBundle, RowEngine,
    RowItem, RowPage,
};
pub use workflow::WorkflowEngine;

use rowhouse_store::Database;
use std::sync::Arc;

/// Everything wired together over one database.
///
/// Hosts construct one `Engine` at startup, attach their hook
/// implementations, and call the services it exposes. All services share
/// the same connection and catalog cache.
pub struct Engine {
    catalog: CatalogService,
    rows: RowEngine,
    activity: ActivityLog,
    directory: DirectoryService,
}

impl Engine {
    /// Builds an engine with default configuration and no-op hooks.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self::with_config(db, EngineConfig::default())
    }

    /// Builds an engine with explicit configuration.
    #[must_use]
    pub fn with_config(db: &Database, config: EngineConfig) -> Self {
        let catalog = CatalogService::new(db);
        let rows = RowEngine::new(db, config.clone(), catalog.clone());
        let activity = ActivityLog::new(db, &config);
        let directory = DirectoryService::new(db);
        Self {
            catalog,
            rows,
            activity,
            directory,
        }
    }

    /// Installs lifecycle hooks invoked around row mutations and reads.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.rows.hooks = Arc::new(hooks);
        self
    }

    /// Installs the media store that uploads pending attachments.
    #[must_use]
    pub fn with_media_store(mut self, media: impl MediaStore + 'static) -> Self {
        self.rows.media = Arc::new(media);
        self
    }

    /// Installs the usage meter consulted before creates.
    #[must_use]
    pub fn with_usage_meter(mut self, usage: impl UsageMeter + 'static) -> Self {
        self.rows.usage = Arc::new(usage);
        self
    }

    /// Installs the sink that delivers webhook payloads.
    #[must_use]
    pub fn with_webhook_sink(mut self, sink: impl WebhookSink + 'static) -> Self {
        self.rows.webhooks = Arc::new(sink);
        self
    }

    /// Installs the directory used to resolve creators for search.
    #[must_use]
    pub fn with_user_directory(mut self, directory: impl UserDirectory + 'static) -> Self {
        self.rows.directory = Arc::new(directory);
        self
    }

    /// Entity definitions, properties, relationships, views and workflow.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// The row lifecycle.
    #[must_use]
    pub fn rows(&self) -> &RowEngine {
        &self.rows
    }

    /// The audit trail.
    #[must_use]
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Tenant links, permissions, roles, groups and entity rules.
    #[must_use]
    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }
}
