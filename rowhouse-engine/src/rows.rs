//! The row lifecycle API.
//!
//! Every operation resolves the entity, routes through the permission
//! resolver, then touches the store. Companion reads are issued
//! concurrently; side effects (media, webhooks, usage reporting) are
//! best-effort and never roll back a committed mutation.

use crate::access::PermissionResolver;
use crate::catalog::{CatalogService, EntityRef, EntityWithDetails};
use crate::config::EngineConfig;
use crate::display::display_summary;
use crate::error::{EngineError, EngineResult};
use crate::hooks::{
    EmptyDirectory, InlineMedia, LifecycleHooks, MediaStore, NoopHooks, NullSink, Unmetered,
    UsageMeter, UserDirectory, WebhookSink,
};
use crate::query::{self, CandidateRow, Pagination, UrlParams};
use crate::task::run_blocking;
use crate::workflow::{self, WorkflowEngine};
use rowhouse_model::{
    AccessLevel, AuditEntry, EntityAction, EntityDef, EntityRelationship, EntityTag, EntityView,
    Grantee, PermissionGrant, PropertyValue, RelationshipInput, Row, RowAccess, RowComment,
    RowInput, RowMedia, RowRelationship, RowTask, RowValue, ViewScope, Visibility, WebhookAction,
    WorkflowState, WorkflowStep,
};
use rowhouse_store::{AuditStore, CatalogStore, Database, PermissionStore, RowStore};
use rowhouse_types::{
    EntityId, GrantId, PropertyId, RelationshipId, RowId, Scope, TagId, TaskId, TenantId,
    Timestamp, UserId, ViewId,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Flags for trusted internal mutations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationOptions {
    /// Skip entity- and row-level permission checks.
    pub bypass_permissions: bool,
    /// Skip the audit entry for this mutation.
    pub suppress_audit: bool,
}

/// Which way `change_order` moves a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Up,
    Down,
}

/// One row as returned to callers.
#[derive(Debug, Clone)]
pub struct RowItem {
    pub row: Row,
    /// Display folio, e.g. `CON-0001`.
    pub folio: String,
    /// Values keyed by property name.
    pub values: BTreeMap<String, PropertyValue>,
    pub tags: Vec<EntityTag>,
    /// Rendering of the entity's display properties.
    pub summary: String,
}

/// A listing page plus the companion data listings render with.
#[derive(Debug, Clone)]
pub struct RowPage {
    pub items: Vec<RowItem>,
    pub pagination: Pagination,
    /// Tag dictionary of the entity in the caller's scope.
    pub tags: Vec<EntityTag>,
    pub workflow_states: Vec<WorkflowState>,
    /// Views visible in the caller's scope.
    pub views: Vec<EntityView>,
    pub current_view: Option<EntityView>,
    /// The whole catalog, for navigation.
    pub entities: Vec<EntityDef>,
}

/// A single row plus everything its detail surface shows.
#[derive(Debug, Clone)]
pub struct RowBundle {
    pub item: RowItem,
    pub access: RowAccess,
    pub logs: Vec<AuditEntry>,
    pub comments: Vec<RowComment>,
    pub tasks: Vec<RowTask>,
    pub permissions: Vec<PermissionGrant>,
    /// Workflow steps available from the row's current state.
    pub next_steps: Vec<WorkflowStep>,
}

/// A candidate row offered by a relationship picker.
#[derive(Debug, Clone)]
pub struct PickerRow {
    pub id: RowId,
    pub folio: String,
    pub summary: String,
}

/// Preloaded candidates for one single-select relationship.
#[derive(Debug, Clone)]
pub struct RelationshipPicker {
    pub relationship: EntityRelationship,
    /// The entity on the other side of the relationship.
    pub entity: EntityDef,
    pub rows: Vec<PickerRow>,
}

/// Orchestrates reads and writes of rows.
pub struct RowEngine {
    config: EngineConfig,
    catalog: CatalogService,
    resolver: PermissionResolver,
    workflow: WorkflowEngine,
    rows: RowStore,
    permissions: PermissionStore,
    audit: AuditStore,
    catalog_store: CatalogStore,
    pub(crate) hooks: Arc<dyn LifecycleHooks>,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) usage: Arc<dyn UsageMeter>,
    pub(crate) webhooks: Arc<dyn WebhookSink>,
    pub(crate) directory: Arc<dyn UserDirectory>,
}

impl RowEngine {
    pub(crate) fn new(db: &Database, config: EngineConfig, catalog: CatalogService) -> Self {
        Self {
            config,
            catalog,
            resolver: PermissionResolver::new(db),
            workflow: WorkflowEngine::new(db),
            rows: RowStore::new(db),
            permissions: PermissionStore::new(db),
            audit: AuditStore::new(db),
            catalog_store: CatalogStore::new(db),
            hooks: Arc::new(NoopHooks),
            media: Arc::new(InlineMedia),
            usage: Arc::new(Unmetered),
            webhooks: Arc::new(NullSink),
            directory: Arc::new(EmptyDirectory),
        }
    }

    // ── Listing ──────────────────────────────────────────────────

    /// Lists rows under the active view and URL parameters.
    ///
    /// The active view is the explicit override, else the `?v=` parameter,
    /// else the most specific default for the caller's scope. Only rows the
    /// caller can read are considered; filtering and sorting run after
    /// visibility, pagination last.
    pub async fn list_rows(
        &self,
        entity: &EntityRef,
        scope: &Scope,
        params: &UrlParams,
        view_override: Option<ViewId>,
        page_size: Option<i64>,
    ) -> EngineResult<RowPage> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.resolver
            .check_entity_action(scope, &details.def, EntityAction::View)
            .await?;
        self.hooks.before_list(&details.def).await?;

        let current_view = resolve_view(&details, scope, params, view_override)?;
        let parent_keys = self.parent_keys(&details).await?;
        let qscope = query::build_query_scope(
            &details,
            current_view.as_ref(),
            params,
            &parent_keys,
            page_size,
            &self.config,
        )?;

        let ((candidates, tag_dict), entities) = tokio::try_join!(
            self.load_candidates(&details, scope, qscope.search.is_some()),
            self.catalog.list_entities(),
        )?;
        let (page_rows, pagination) = query::apply(&qscope, &details, candidates);
        let listed: Vec<Row> = page_rows.iter().map(|c| c.row.clone()).collect();
        let items = page_rows
            .into_iter()
            .map(|c| make_item(&details, c.row, c.values, c.tags))
            .collect();

        self.hooks.after_list(&details.def, &listed).await;
        Ok(RowPage {
            items,
            pagination,
            tags: tag_dict,
            workflow_states: details.workflow_states.clone(),
            views: details
                .views
                .iter()
                .filter(|v| view_visible_in_scope(v, scope))
                .cloned()
                .collect(),
            current_view,
            entities,
        })
    }

    /// Counts the rows a listing with these parameters would return.
    pub async fn count(
        &self,
        entity: &EntityRef,
        scope: &Scope,
        params: &UrlParams,
    ) -> EngineResult<i64> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.resolver
            .check_entity_action(scope, &details.def, EntityAction::View)
            .await?;
        let parent_keys = self.parent_keys(&details).await?;
        let qscope =
            query::build_query_scope(&details, None, params, &parent_keys, None, &self.config)?;
        let (candidates, _) = self
            .load_candidates(&details, scope, qscope.search.is_some())
            .await?;
        Ok(query::filter_candidates(&qscope, &details, candidates).len() as i64)
    }

    // ── Reading ──────────────────────────────────────────────────

    /// Loads one row with its companion records.
    ///
    /// A row hidden from the caller is [`EngineError::Forbidden`], not
    /// NotFound: the row exists, it just is not shared with them.
    pub async fn get_row(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
    ) -> EngineResult<RowBundle> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.resolver
            .check_entity_action(scope, &details.def, EntityAction::Read)
            .await?;
        self.hooks.before_get(&details.def, id).await?;
        let row = self.require_row(id, details.def.id).await?;
        let ctx = self.resolver.context_for_row(scope, id).await?;
        let access = ctx.access_for(&row);
        if !access.can_read {
            return Err(EngineError::Forbidden(format!(
                "row {} is not shared with you",
                row.display_folio(&details.def.prefix)
            )));
        }

        let store = self.rows.clone();
        let values_fut = run_blocking(move || store.get_values(id));
        let store = self.rows.clone();
        let tags_fut = run_blocking(move || store.tags_for_row(id));
        let store = self.rows.clone();
        let comments_fut = run_blocking(move || store.list_comments(id));
        let store = self.rows.clone();
        let tasks_fut = run_blocking(move || store.list_tasks(id));
        let audit = self.audit.clone();
        let logs_fut = run_blocking(move || audit.list_for_row(id));
        let grants_fut = self.resolver.grants_for_row(id);
        let (values, tags, comments, tasks, logs, permissions) = tokio::try_join!(
            values_fut,
            tags_fut,
            comments_fut,
            tasks_fut,
            logs_fut,
            grants_fut
        )?;

        let next_steps = workflow::next_steps(&details, &row);
        let values = values_by_name(&details, values);
        self.hooks.after_get(&details.def, &row).await;
        Ok(RowBundle {
            item: make_item(&details, row, values, tags),
            access,
            logs,
            comments,
            tasks,
            permissions,
            next_steps,
        })
    }

    // ── Creating ─────────────────────────────────────────────────

    /// Creates a row from submitted values, edges and tags.
    ///
    /// Folio and order are assigned inside the insert transaction, so
    /// concurrent creates in the same (tenant, entity) scope get distinct,
    /// increasing folios. Default sharing follows the entity's
    /// `default_visibility`. Media upload, usage reporting and webhook
    /// delivery happen after the commit and never fail the create.
    pub async fn create_row(
        &self,
        entity: &EntityRef,
        scope: &Scope,
        input: RowInput,
        options: MutationOptions,
    ) -> EngineResult<RowItem> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !options.bypass_permissions {
            self.resolver
                .check_entity_action(scope, &details.def, EntityAction::Create)
                .await?;
        }
        self.hooks.before_create(&details.def, &input).await?;

        let verdict = self
            .usage
            .check_limit(scope.tenant_id, &details.def.name)
            .await;
        if verdict.limit_reached {
            return Err(EngineError::QuotaExceeded(verdict.message));
        }
        if !input.tags.is_empty() && !details.def.features.tags {
            return Err(EngineError::Validation(format!(
                "'{}' does not use tags",
                details.def.name
            )));
        }

        let mut row = Row::new(details.def.id, scope.tenant_id, scope.actor);
        if details.def.features.workflow {
            row.workflow_state_id = details.initial_state().map(|s| s.id);
        }
        let values = build_values(&details, row.id, &input, true)?;
        let (parent_edges, child_edges) = build_edges(&details, row.id, &input)?;
        let mut edges = parent_edges.unwrap_or_default();
        edges.extend(child_edges.unwrap_or_default());

        let linked = match (details.def.default_visibility, scope.tenant_id) {
            (Visibility::LinkedAccounts, Some(tenant)) => {
                let store = self.permissions.clone();
                run_blocking(move || store.linked_tenants(tenant)).await?
            }
            _ => Vec::new(),
        };
        let grants = default_grants(&details.def, &row, &linked);

        let row = {
            let store = self.rows.clone();
            let values = values.clone();
            run_blocking(move || {
                let mut row = row;
                store.create_row(&mut row, &values, &edges, &grants)?;
                Ok(row)
            })
            .await?
        };
        let folio = row.display_folio(&details.def.prefix);
        info!(entity = %details.def.name, row = %folio, "row created");

        let tags = self.apply_tags(&details, &row, &input.tags).await?;
        self.persist_media(&details, row.id, &values).await;

        let store = self.rows.clone();
        let row_id = row.id;
        let stored = run_blocking(move || store.get_values(row_id)).await?;
        let values = values_by_name(&details, stored);
        let item = make_item(&details, row, values, tags);

        if !options.suppress_audit {
            self.append_audit(&item, scope, "Created").await?;
        }
        self.usage.report(scope.tenant_id, &details.def.name).await;
        self.emit_webhook(&details, &item.row, WebhookAction::Created)
            .await;
        self.hooks.after_create(&details.def, &item.row).await;
        Ok(item)
    }

    // ── Updating ─────────────────────────────────────────────────

    /// Applies new values, edges and tags to a row.
    ///
    /// Supplied values replace existing ones in place, keyed by property.
    /// Supplying a direction of edges (even empty) replaces every edge of
    /// that direction; leaving it out keeps them. Tags are additive.
    pub async fn update_row(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        input: RowInput,
        options: MutationOptions,
    ) -> EngineResult<RowItem> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !options.bypass_permissions {
            self.resolver
                .check_entity_action(scope, &details.def, EntityAction::Update)
                .await?;
        }
        let row = self.require_row(id, details.def.id).await?;
        if !options.bypass_permissions {
            let ctx = self.resolver.context_for_row(scope, id).await?;
            if !ctx.access_for(&row).can_update {
                return Err(EngineError::Forbidden(format!(
                    "row {} is not editable by you",
                    row.display_folio(&details.def.prefix)
                )));
            }
        }
        self.hooks.before_update(&details.def, &row, &input).await?;
        if !input.tags.is_empty() && !details.def.features.tags {
            return Err(EngineError::Validation(format!(
                "'{}' does not use tags",
                details.def.name
            )));
        }

        let values = build_values(&details, id, &input, false)?;
        let (parent_edges, child_edges) = build_edges(&details, id, &input)?;

        let store = self.rows.clone();
        let written = values.clone();
        run_blocking(move || {
            store.update_row(
                id,
                &written,
                parent_edges.as_deref(),
                child_edges.as_deref(),
                Timestamp::now(),
            )
        })
        .await?;
        debug!(row = %id, values = values.len(), "row updated");

        self.apply_tags(&details, &row, &input.tags).await?;
        self.persist_media(&details, id, &values).await;

        let row = self.require_row(id, details.def.id).await?;
        let store = self.rows.clone();
        let stored = run_blocking(move || store.get_values(id)).await?;
        let store = self.rows.clone();
        let tags = run_blocking(move || store.tags_for_row(id)).await?;
        let item = make_item(&details, row, values_by_name(&details, stored), tags);

        if !options.suppress_audit {
            self.append_audit(&item, scope, "Updated").await?;
        }
        self.emit_webhook(&details, &item.row, WebhookAction::Updated)
            .await;
        self.hooks.after_update(&details.def, &item.row).await;
        Ok(item)
    }

    // ── Deleting ─────────────────────────────────────────────────

    /// Deletes a row and the closure of rows linked through cascading
    /// relationships.
    ///
    /// The audit entry is written before the physical delete so the trail
    /// records what the row was. Cascaded children are removed in the same
    /// transaction without entries of their own.
    pub async fn delete_row(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        options: MutationOptions,
    ) -> EngineResult<()> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !options.bypass_permissions {
            self.resolver
                .check_entity_action(scope, &details.def, EntityAction::Delete)
                .await?;
        }
        let row = self.require_row(id, details.def.id).await?;
        if !options.bypass_permissions {
            let ctx = self.resolver.context_for_row(scope, id).await?;
            if !ctx.access_for(&row).can_delete {
                return Err(EngineError::Forbidden(format!(
                    "row {} is not deletable by you",
                    row.display_folio(&details.def.prefix)
                )));
            }
        }
        self.hooks.before_delete(&details.def, &row).await?;

        let store = self.rows.clone();
        let values = run_blocking(move || store.get_values(id)).await?;
        let values_map = values_by_name(&details, values.clone());
        let folio = row.display_folio(&details.def.prefix);

        if !options.suppress_audit {
            let summary = display_summary(&details.properties, &values_map);
            let entry = AuditEntry::new(
                row.tenant_id,
                scope.actor,
                "Deleted",
                details.def.id,
                id,
                audit_detail(&summary, &folio),
            );
            let audit = self.audit.clone();
            run_blocking(move || audit.append(&entry)).await?;
        }

        let closure = self.cascade_closure(&row).await?;
        let cascaded = closure.len() - 1;
        let store = self.rows.clone();
        let ids = closure;
        run_blocking(move || store.delete_rows(&ids)).await?;
        info!(entity = %details.def.name, row = %folio, cascaded, "row deleted");

        for value in &values {
            if let PropertyValue::Media(items) = &value.value {
                for item in items {
                    if let Err(err) = self.media.delete_media(id, item).await {
                        warn!(media = %item.name, error = %err, "media delete failed");
                    }
                }
            }
        }
        self.emit_webhook(&details, &row, WebhookAction::Deleted).await;
        self.hooks.after_delete(&details.def, &row).await;
        Ok(())
    }

    // ── Ordering ─────────────────────────────────────────────────

    /// Swaps the row's position with its neighbor in the given direction.
    ///
    /// When several rows share the row's position the whole (tenant,
    /// entity) scope is renumbered instead, healing the duplicates.
    pub async fn change_order(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        direction: OrderDirection,
    ) -> EngineResult<()> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.resolver
            .check_entity_action(scope, &details.def, EntityAction::Update)
            .await?;
        let row = self.require_row(id, details.def.id).await?;
        let ctx = self.resolver.context_for_row(scope, id).await?;
        if !ctx.access_for(&row).can_update {
            return Err(EngineError::Forbidden(format!(
                "row {} is not editable by you",
                row.display_folio(&details.def.prefix)
            )));
        }

        let up = matches!(direction, OrderDirection::Up);
        let store = self.rows.clone();
        let swapped = run_blocking(move || store.swap_position(id, up)).await?;
        if !swapped {
            debug!(row = %id, "no position swap performed");
        }
        Ok(())
    }

    // ── Tags ─────────────────────────────────────────────────────

    /// Creates a dictionary tag without applying it to any row.
    pub async fn create_tag(
        &self,
        entity: &EntityRef,
        scope: &Scope,
        value: &str,
        color: &str,
    ) -> EngineResult<EntityTag> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !details.def.features.tags {
            return Err(EngineError::Validation(format!(
                "'{}' does not use tags",
                details.def.name
            )));
        }
        if value.trim().is_empty() {
            return Err(EngineError::Validation("tag value is empty".into()));
        }

        let store = self.rows.clone();
        let entity_id = details.def.id;
        let tenant_id = scope.tenant_id;
        let probe = value.to_owned();
        let existing =
            run_blocking(move || store.get_tag_by_value(entity_id, tenant_id, &probe)).await?;
        if existing.is_some() {
            return Err(EngineError::Conflict(format!("tag '{value}' already exists")));
        }

        let tag = EntityTag::new(entity_id, tenant_id, value).with_color(color);
        let store = self.rows.clone();
        let stored = tag.clone();
        run_blocking(move || store.insert_tag(&stored)).await?;
        Ok(tag)
    }

    /// Tags usable in the caller's scope: global entries plus the tenant's
    /// own.
    pub async fn list_tags(
        &self,
        entity: &EntityRef,
        scope: &Scope,
    ) -> EngineResult<Vec<EntityTag>> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        let store = self.rows.clone();
        let entity_id = details.def.id;
        let tenant_id = scope.tenant_id;
        run_blocking(move || store.list_tags(entity_id, tenant_id)).await
    }

    /// Deletes a dictionary tag along with every row association.
    pub async fn delete_tag(
        &self,
        entity: &EntityRef,
        scope: &Scope,
        tag_id: TagId,
    ) -> EngineResult<()> {
        self.catalog.resolve(entity, scope.tenant_id).await?;
        let store = self.rows.clone();
        run_blocking(move || store.delete_tag(tag_id)).await
    }

    /// Applies a tag to a row, creating the dictionary entry on first use.
    pub async fn add_tag(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        value: &str,
    ) -> EngineResult<EntityTag> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !details.def.features.tags {
            return Err(EngineError::Validation(format!(
                "'{}' does not use tags",
                details.def.name
            )));
        }
        let row = self.require_editable(id, &details, scope).await?;
        let mut applied = self.apply_tags(&details, &row, &[value.to_owned()]).await?;
        applied
            .pop()
            .ok_or_else(|| EngineError::Internal("tag was not applied".into()))
    }

    /// Removes a tag from a row, leaving the dictionary entry alone.
    pub async fn remove_tag(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        tag_id: TagId,
    ) -> EngineResult<()> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.require_editable(id, &details, scope).await?;
        let store = self.rows.clone();
        run_blocking(move || store.remove_row_tag(id, tag_id)).await
    }

    // ── Comments and tasks ───────────────────────────────────────

    /// Adds a comment. Requires Comment-level access or better.
    pub async fn add_comment(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        body: &str,
    ) -> EngineResult<RowComment> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !details.def.features.comments {
            return Err(EngineError::Validation(format!(
                "comments are not enabled on '{}'",
                details.def.name
            )));
        }
        if body.trim().is_empty() {
            return Err(EngineError::Validation("comment body is empty".into()));
        }
        let row = self.require_row(id, details.def.id).await?;
        let ctx = self.resolver.context_for_row(scope, id).await?;
        if !ctx.can_comment(&row) {
            return Err(EngineError::Forbidden(format!(
                "row {} is not commentable by you",
                row.display_folio(&details.def.prefix)
            )));
        }

        let comment = RowComment::new(id, scope.actor, body);
        let store = self.rows.clone();
        let stored = comment.clone();
        run_blocking(move || store.insert_comment(&stored)).await?;
        Ok(comment)
    }

    /// Adds an open task to a row.
    pub async fn add_task(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        title: &str,
    ) -> EngineResult<RowTask> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !details.def.features.tasks {
            return Err(EngineError::Validation(format!(
                "tasks are not enabled on '{}'",
                details.def.name
            )));
        }
        if title.trim().is_empty() {
            return Err(EngineError::Validation("task title is empty".into()));
        }
        self.require_editable(id, &details, scope).await?;

        let task = RowTask::new(id, scope.actor, title);
        let store = self.rows.clone();
        let stored = task.clone();
        run_blocking(move || store.insert_task(&stored)).await?;
        Ok(task)
    }

    /// Flips a task's done flag.
    pub async fn set_task_done(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        task_id: TaskId,
        done: bool,
    ) -> EngineResult<()> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.require_editable(id, &details, scope).await?;
        let store = self.rows.clone();
        run_blocking(move || store.set_task_done(task_id, done)).await
    }

    // ── Sharing ──────────────────────────────────────────────────

    /// Grants access on a row to a grantee, replacing any previous grant
    /// for the same grantee.
    pub async fn share_row(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        grantee: Grantee,
        access: AccessLevel,
    ) -> EngineResult<PermissionGrant> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.require_editable(id, &details, scope).await?;
        let grant = PermissionGrant::new(id, grantee, access);
        let store = self.permissions.clone();
        let stored = grant;
        run_blocking(move || store.upsert_grant(&stored)).await?;
        Ok(grant)
    }

    /// Removes a grant from a row.
    pub async fn revoke_grant(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        grant_id: GrantId,
    ) -> EngineResult<()> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        self.require_editable(id, &details, scope).await?;
        let store = self.permissions.clone();
        run_blocking(move || store.delete_grant(grant_id)).await
    }

    // ── Relationships ────────────────────────────────────────────

    /// Links two rows under the relationship declared between their
    /// entity types.
    pub async fn create_relationship(
        &self,
        parent_row_id: RowId,
        child_row_id: RowId,
        scope: &Scope,
    ) -> EngineResult<RowRelationship> {
        let (child, rel) = self
            .resolve_edge(parent_row_id, child_row_id, scope)
            .await?;
        if rel.read_only {
            return Err(EngineError::Validation(
                "the relationship is read only".into(),
            ));
        }
        let edge = RowRelationship {
            relationship_id: rel.id,
            parent_row_id,
            child_row_id: child.id,
        };
        let store = self.rows.clone();
        run_blocking(move || store.insert_edge(&edge)).await?;
        Ok(edge)
    }

    /// Unlinks two rows.
    pub async fn delete_relationship(
        &self,
        parent_row_id: RowId,
        child_row_id: RowId,
        scope: &Scope,
    ) -> EngineResult<()> {
        let (child, rel) = self
            .resolve_edge(parent_row_id, child_row_id, scope)
            .await?;
        let edge = RowRelationship {
            relationship_id: rel.id,
            parent_row_id,
            child_row_id: child.id,
        };
        let store = self.rows.clone();
        run_blocking(move || store.delete_edge(&edge)).await
    }

    /// Preloads candidate rows for every single-select relationship of the
    /// entity, capped and filtered to what the caller may read.
    pub async fn get_relationship_rows(
        &self,
        entity: &EntityRef,
        scope: &Scope,
    ) -> EngineResult<Vec<RelationshipPicker>> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        let mut pickers = Vec::new();
        for rel in &details.relationships {
            let (other_id, input) = if rel.child_entity_id == details.def.id {
                (rel.parent_entity_id, rel.cardinality.child_input())
            } else {
                (rel.child_entity_id, rel.cardinality.parent_input())
            };
            if input != RelationshipInput::SingleSelect {
                continue;
            }

            let other = self
                .catalog
                .resolve(&EntityRef::Id(other_id), scope.tenant_id)
                .await?;
            let cap = self.config.picker_row_cap;
            let store = self.rows.clone();
            let rows_fut = run_blocking(move || store.list_recent_rows(other_id, cap));
            let store = self.rows.clone();
            let values_fut = run_blocking(move || store.list_values(other_id));
            let ctx_fut = self.resolver.context_for_entity(scope, other_id);
            let (rows, values, ctx) = tokio::try_join!(rows_fut, values_fut, ctx_fut)?;

            let names: HashMap<PropertyId, &str> = other
                .properties
                .iter()
                .map(|p| (p.id, p.name.as_str()))
                .collect();
            let mut values_by_row: HashMap<RowId, BTreeMap<String, PropertyValue>> =
                HashMap::new();
            for value in values {
                if let Some(name) = names.get(&value.property_id) {
                    values_by_row
                        .entry(value.row_id)
                        .or_default()
                        .insert((*name).to_owned(), value.value);
                }
            }

            let picker_rows = rows
                .into_iter()
                .filter(|row| ctx.access_for(row).can_read)
                .map(|row| {
                    let values = values_by_row.remove(&row.id).unwrap_or_default();
                    let summary = display_summary(&other.properties, &values);
                    let folio = row.display_folio(&other.def.prefix);
                    PickerRow {
                        id: row.id,
                        summary: if summary.is_empty() {
                            folio.clone()
                        } else {
                            summary
                        },
                        folio,
                    }
                })
                .collect();
            pickers.push(RelationshipPicker {
                relationship: rel.clone(),
                entity: other.def.clone(),
                rows: picker_rows,
            });
        }
        Ok(pickers)
    }

    // ── Workflow ─────────────────────────────────────────────────

    /// Performs a workflow action on a row.
    ///
    /// Who may perform which step is the caller's policy; the engine only
    /// validates the step against the row's current state.
    pub async fn perform_transition(
        &self,
        id: RowId,
        entity: &EntityRef,
        scope: &Scope,
        action: &str,
    ) -> EngineResult<WorkflowState> {
        let details = self.catalog.resolve(entity, scope.tenant_id).await?;
        if !details.def.features.workflow {
            return Err(EngineError::Validation(format!(
                "'{}' has no workflow",
                details.def.name
            )));
        }
        let row = self.require_row(id, details.def.id).await?;
        self.workflow
            .perform_transition(&details, &row, action, scope)
            .await
    }

    // ── Internals ────────────────────────────────────────────────

    async fn require_row(&self, id: RowId, entity_id: EntityId) -> EngineResult<Row> {
        let store = self.rows.clone();
        let row = run_blocking(move || store.get_row(id)).await?;
        match row {
            Some(row) if row.entity_id == entity_id => Ok(row),
            _ => Err(EngineError::NotFound(format!("row {id}"))),
        }
    }

    /// Loads the row and demands update access.
    async fn require_editable(
        &self,
        id: RowId,
        details: &EntityWithDetails,
        scope: &Scope,
    ) -> EngineResult<Row> {
        let row = self.require_row(id, details.def.id).await?;
        let ctx = self.resolver.context_for_row(scope, id).await?;
        if !ctx.access_for(&row).can_update {
            return Err(EngineError::Forbidden(format!(
                "row {} is not editable by you",
                row.display_folio(&details.def.prefix)
            )));
        }
        Ok(row)
    }

    /// Resolves the declared relationship behind a (parent row, child row)
    /// pair and checks the caller may edit the child.
    async fn resolve_edge(
        &self,
        parent_row_id: RowId,
        child_row_id: RowId,
        scope: &Scope,
    ) -> EngineResult<(Row, EntityRelationship)> {
        let parent = self.any_row(parent_row_id).await?;
        let child = self.any_row(child_row_id).await?;
        let store = self.catalog_store.clone();
        let (parent_entity, child_entity) = (parent.entity_id, child.entity_id);
        let rel = run_blocking(move || {
            store.find_relationship_between(parent_entity, child_entity)
        })
        .await?
        .ok_or_else(|| {
            EngineError::NotFound("no relationship declared between those entities".into())
        })?;

        let ctx = self.resolver.context_for_row(scope, child.id).await?;
        if !ctx.access_for(&child).can_update {
            return Err(EngineError::Forbidden(format!("row {} is not editable by you", child.id)));
        }
        Ok((child, rel))
    }

    async fn any_row(&self, id: RowId) -> EngineResult<Row> {
        let store = self.rows.clone();
        run_blocking(move || store.get_row(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("row {id}")))
    }

    /// `<parentEntityName>_id` keys accepted by listings of this entity.
    async fn parent_keys(
        &self,
        details: &Arc<EntityWithDetails>,
    ) -> EngineResult<Vec<(String, RelationshipId)>> {
        let mut keys = Vec::new();
        for rel in details.parent_relationships() {
            let parent = self.catalog.get_def(&EntityRef::Id(rel.parent_entity_id)).await?;
            keys.push((parent.name, rel.id));
        }
        Ok(keys)
    }

    /// Loads every readable row of the entity with values, tags and parent
    /// edges attached, plus the tag dictionary.
    async fn load_candidates(
        &self,
        details: &Arc<EntityWithDetails>,
        scope: &Scope,
        with_creators: bool,
    ) -> EngineResult<(Vec<CandidateRow>, Vec<EntityTag>)> {
        let entity_id = details.def.id;
        let tenant_id = scope.tenant_id;

        let store = self.rows.clone();
        let rows_fut = run_blocking(move || store.list_rows(entity_id));
        let store = self.rows.clone();
        let values_fut = run_blocking(move || store.list_values(entity_id));
        let store = self.rows.clone();
        let row_tags_fut = run_blocking(move || store.list_row_tags(entity_id));
        let store = self.rows.clone();
        let dict_fut = run_blocking(move || store.list_tags(entity_id, tenant_id));
        let store = self.rows.clone();
        let edges_fut = run_blocking(move || store.list_edges_for_entity(entity_id));
        let ctx_fut = self.resolver.context_for_entity(scope, entity_id);
        let (rows, values, row_tags, dict, edges, ctx) = tokio::try_join!(
            rows_fut, values_fut, row_tags_fut, dict_fut, edges_fut, ctx_fut
        )?;

        let names: HashMap<PropertyId, &str> = details
            .properties
            .iter()
            .map(|p| (p.id, p.name.as_str()))
            .collect();
        let mut values_by_row: HashMap<RowId, BTreeMap<String, PropertyValue>> = HashMap::new();
        for value in values {
            if let Some(name) = names.get(&value.property_id) {
                values_by_row
                    .entry(value.row_id)
                    .or_default()
                    .insert((*name).to_owned(), value.value);
            }
        }

        let dict_by_id: HashMap<TagId, &EntityTag> = dict.iter().map(|t| (t.id, t)).collect();
        let mut tags_by_row: HashMap<RowId, Vec<EntityTag>> = HashMap::new();
        for row_tag in row_tags {
            if let Some(tag) = dict_by_id.get(&row_tag.tag_id) {
                tags_by_row
                    .entry(row_tag.row_id)
                    .or_default()
                    .push((*tag).clone());
            }
        }

        let mut parents_by_row: HashMap<RowId, Vec<(RelationshipId, RowId)>> = HashMap::new();
        for edge in edges {
            parents_by_row
                .entry(edge.child_row_id)
                .or_default()
                .push((edge.relationship_id, edge.parent_row_id));
        }

        let creators = if with_creators {
            self.creator_search_text(&rows).await
        } else {
            HashMap::new()
        };

        let candidates = rows
            .into_iter()
            .filter(|row| ctx.access_for(row).can_read)
            .map(|row| CandidateRow {
                values: values_by_row.remove(&row.id).unwrap_or_default(),
                tags: tags_by_row.remove(&row.id).unwrap_or_default(),
                parents: parents_by_row.remove(&row.id).unwrap_or_default(),
                creator_text: row
                    .created_by
                    .user_id()
                    .and_then(|u| creators.get(&u).cloned())
                    .unwrap_or_default(),
                row,
            })
            .collect();
        Ok((candidates, dict))
    }

    /// Resolves distinct creators through the user directory for `q`
    /// matching.
    async fn creator_search_text(&self, rows: &[Row]) -> HashMap<UserId, String> {
        let user_ids: HashSet<UserId> = rows.iter().filter_map(|r| r.created_by.user_id()).collect();
        let mut text = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(profile) = self.directory.lookup(user_id).await {
                text.insert(
                    user_id,
                    format!("{} {}", profile.email, profile.full_name).to_lowercase(),
                );
            }
        }
        text
    }

    /// Rows deleted when deleting `root`: the worklist-computed closure
    /// over cascading relationships, cycle-safe, root first.
    async fn cascade_closure(&self, root: &Row) -> EngineResult<Vec<RowId>> {
        let mut visited: HashSet<RowId> = HashSet::new();
        let mut order: Vec<RowId> = Vec::new();
        let mut queue: VecDeque<(RowId, EntityId)> = VecDeque::new();
        visited.insert(root.id);
        queue.push_back((root.id, root.entity_id));

        while let Some((row_id, entity_id)) = queue.pop_front() {
            order.push(row_id);
            let details = self.catalog.resolve(&EntityRef::Id(entity_id), None).await?;
            if !details.child_relationships().any(|r| r.cascade) {
                continue;
            }
            let store = self.rows.clone();
            let edges = run_blocking(move || store.edges_for_parent(row_id)).await?;
            for edge in edges {
                let Some(rel) = details
                    .relationships
                    .iter()
                    .find(|r| r.id == edge.relationship_id)
                else {
                    continue;
                };
                if !rel.cascade || rel.parent_entity_id != entity_id {
                    continue;
                }
                if visited.insert(edge.child_row_id) {
                    queue.push_back((edge.child_row_id, rel.child_entity_id));
                }
            }
        }
        Ok(order)
    }

    async fn apply_tags(
        &self,
        details: &EntityWithDetails,
        row: &Row,
        values: &[String],
    ) -> EngineResult<Vec<EntityTag>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let store = self.rows.clone();
        let entity_id = details.def.id;
        let tenant_id = row.tenant_id;
        let row_id = row.id;
        let values = values.to_vec();
        run_blocking(move || {
            let mut applied = Vec::with_capacity(values.len());
            for value in values {
                let tag = match store.get_tag_by_value(entity_id, tenant_id, &value)? {
                    Some(tag) => tag,
                    None => {
                        let tag = EntityTag::new(entity_id, tenant_id, &value);
                        store.insert_tag(&tag)?;
                        tag
                    }
                };
                store.add_row_tag(row_id, tag.id)?;
                applied.push(tag);
            }
            Ok(applied)
        })
        .await
    }

    /// Uploads pending media through the media hook and rewrites the stored
    /// values with the returned URLs. Failures are logged and the inline
    /// content kept.
    async fn persist_media(
        &self,
        details: &EntityWithDetails,
        row_id: RowId,
        values: &[RowValue],
    ) {
        let mut rewritten: Vec<RowValue> = Vec::new();
        for value in values {
            let PropertyValue::Media(items) = &value.value else {
                continue;
            };
            if !items.iter().any(RowMedia::is_pending) {
                continue;
            }
            let mut stored_items = Vec::with_capacity(items.len());
            let mut changed = false;
            for item in items {
                if item.is_pending() {
                    match self.media.store_media(&details.def, row_id, item.clone()).await {
                        Ok(stored) => {
                            changed = changed || stored != *item;
                            stored_items.push(stored);
                        }
                        Err(err) => {
                            warn!(media = %item.name, error = %err, "media upload failed");
                            stored_items.push(item.clone());
                        }
                    }
                } else {
                    stored_items.push(item.clone());
                }
            }
            if changed {
                let mut updated = value.clone();
                updated.value = PropertyValue::Media(stored_items);
                rewritten.push(updated);
            }
        }
        if rewritten.is_empty() {
            return;
        }
        let store = self.rows.clone();
        if let Err(err) =
            run_blocking(move || store.update_row(row_id, &rewritten, None, None, Timestamp::now()))
                .await
        {
            warn!(error = %err, "persisting media urls failed");
        }
    }

    async fn append_audit(
        &self,
        item: &RowItem,
        scope: &Scope,
        action: &str,
    ) -> EngineResult<()> {
        let entry = AuditEntry::new(
            item.row.tenant_id,
            scope.actor,
            action,
            item.row.entity_id,
            item.row.id,
            audit_detail(&item.summary, &item.folio),
        );
        let audit = self.audit.clone();
        run_blocking(move || audit.append(&entry)).await
    }

    async fn emit_webhook(
        &self,
        details: &EntityWithDetails,
        row: &Row,
        action: WebhookAction,
    ) {
        let store = self.catalog_store.clone();
        let entity_id = details.def.id;
        let webhook = match run_blocking(move || store.webhook_for_action(entity_id, action)).await
        {
            Ok(Some(webhook)) if webhook.is_configured() => webhook,
            Ok(_) => return,
            Err(err) => {
                warn!(error = %err, "webhook lookup failed");
                return;
            }
        };
        let payload = json!({
            "entity": details.def.name,
            "action": action.to_string(),
            "row_id": row.id.to_string(),
            "folio": row.display_folio(&details.def.prefix),
        });
        if let Err(err) = self.webhooks.emit(&webhook, &payload).await {
            warn!(entity = %details.def.name, action = %action, error = %err, "webhook delivery failed");
        }
    }
}

// ── Free helpers ─────────────────────────────────────────────────

fn make_item(
    details: &EntityWithDetails,
    row: Row,
    values: BTreeMap<String, PropertyValue>,
    tags: Vec<EntityTag>,
) -> RowItem {
    let summary = display_summary(&details.properties, &values);
    RowItem {
        folio: row.display_folio(&details.def.prefix),
        row,
        values,
        tags,
        summary,
    }
}

fn values_by_name(
    details: &EntityWithDetails,
    values: Vec<RowValue>,
) -> BTreeMap<String, PropertyValue> {
    let names: HashMap<PropertyId, &str> = details
        .properties
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();
    values
        .into_iter()
        .filter_map(|v| names.get(&v.property_id).map(|n| ((*n).to_owned(), v.value)))
        .collect()
}

fn audit_detail<'a>(summary: &'a str, folio: &'a str) -> &'a str {
    if summary.is_empty() { folio } else { summary }
}

/// Validates submitted values against the entity's properties and builds
/// the store records. `creating` additionally demands every required
/// property that shows in the create form.
fn build_values(
    details: &EntityWithDetails,
    row_id: RowId,
    input: &RowInput,
    creating: bool,
) -> EngineResult<Vec<RowValue>> {
    let mut values = Vec::with_capacity(input.values.len());
    for (name, value) in &input.values {
        let property = details.property_by_name(name).ok_or_else(|| {
            EngineError::Validation(format!(
                "unknown property '{name}' on '{}'",
                details.def.name
            ))
        })?;
        if !property.is_dynamic || property.is_read_only {
            return Err(EngineError::Validation(format!(
                "property '{name}' is read only"
            )));
        }
        if !creating && !property.can_update {
            return Err(EngineError::Validation(format!(
                "property '{name}' cannot be updated"
            )));
        }
        if !value.matches_kind(property.kind) {
            return Err(EngineError::Validation(format!(
                "value for property '{name}' does not match its kind {}",
                property.kind
            )));
        }
        match value {
            PropertyValue::NumberRange { min, max } if min > max => {
                return Err(EngineError::Validation(format!(
                    "range for property '{name}' has min greater than max"
                )));
            }
            PropertyValue::DateRange { min, max } if min > max => {
                return Err(EngineError::Validation(format!(
                    "range for property '{name}' has min greater than max"
                )));
            }
            _ => {}
        }
        if !property.options.is_empty() {
            match value {
                PropertyValue::Text(chosen) => {
                    if !property.has_option(chosen) {
                        return Err(EngineError::Validation(format!(
                            "'{chosen}' is not an option of property '{name}'"
                        )));
                    }
                }
                PropertyValue::Multiple(items) => {
                    for item in items {
                        if !property.has_option(item) {
                            return Err(EngineError::Validation(format!(
                                "'{item}' is not an option of property '{name}'"
                            )));
                        }
                    }
                }
                _ => {}
            }
        }
        if property.is_required && value.is_empty() {
            return Err(EngineError::Validation(format!(
                "property '{name}' is required"
            )));
        }
        values.push(RowValue::new(row_id, property.id, value.clone()));
    }

    if creating {
        for property in &details.properties {
            if property.is_required
                && property.show_in_create
                && !input.values.contains_key(&property.name)
            {
                return Err(EngineError::Validation(format!(
                    "property '{}' is required",
                    property.name
                )));
            }
        }
    }
    Ok(values)
}

/// Turns submitted edge specs into store records, validating that each
/// relationship is declared for the entity in the right direction.
fn build_edges(
    details: &EntityWithDetails,
    row_id: RowId,
    input: &RowInput,
) -> EngineResult<(Option<Vec<RowRelationship>>, Option<Vec<RowRelationship>>)> {
    let parents = match &input.parents {
        Some(specs) => {
            let mut edges = Vec::with_capacity(specs.len());
            for spec in specs {
                let known = details
                    .relationships
                    .iter()
                    .any(|r| r.id == spec.relationship_id && r.child_entity_id == details.def.id);
                if !known {
                    return Err(EngineError::Validation(format!(
                        "relationship {} does not declare '{}' as its child entity",
                        spec.relationship_id, details.def.name
                    )));
                }
                edges.push(RowRelationship {
                    relationship_id: spec.relationship_id,
                    parent_row_id: spec.row_id,
                    child_row_id: row_id,
                });
            }
            Some(edges)
        }
        None => None,
    };
    let children = match &input.children {
        Some(specs) => {
            let mut edges = Vec::with_capacity(specs.len());
            for spec in specs {
                let known = details
                    .relationships
                    .iter()
                    .any(|r| r.id == spec.relationship_id && r.parent_entity_id == details.def.id);
                if !known {
                    return Err(EngineError::Validation(format!(
                        "relationship {} does not declare '{}' as its parent entity",
                        spec.relationship_id, details.def.name
                    )));
                }
                edges.push(RowRelationship {
                    relationship_id: spec.relationship_id,
                    parent_row_id: row_id,
                    child_row_id: spec.row_id,
                });
            }
            Some(edges)
        }
        None => None,
    };
    Ok((parents, children))
}

/// Default sharing applied to a new row from the entity's visibility.
fn default_grants(def: &EntityDef, row: &Row, linked: &[TenantId]) -> Vec<PermissionGrant> {
    match def.default_visibility {
        Visibility::Private => Vec::new(),
        Visibility::Tenant => row
            .tenant_id
            .map(|tenant| {
                vec![PermissionGrant::new(
                    row.id,
                    Grantee::Tenant(tenant),
                    AccessLevel::Edit,
                )]
            })
            .unwrap_or_default(),
        Visibility::LinkedAccounts => {
            let mut grants: Vec<PermissionGrant> = row
                .tenant_id
                .map(|tenant| {
                    vec![PermissionGrant::new(
                        row.id,
                        Grantee::Tenant(tenant),
                        AccessLevel::Edit,
                    )]
                })
                .unwrap_or_default();
            for tenant in linked {
                grants.push(PermissionGrant::new(
                    row.id,
                    Grantee::Tenant(*tenant),
                    AccessLevel::Comment,
                ));
            }
            grants
        }
        Visibility::Public => vec![PermissionGrant::new(
            row.id,
            Grantee::Public,
            AccessLevel::View,
        )],
    }
}

fn view_visible_in_scope(view: &EntityView, scope: &Scope) -> bool {
    match view.scope {
        ViewScope::Global => true,
        ViewScope::Tenant { tenant_id } => scope.tenant_id == Some(tenant_id),
        ViewScope::User { tenant_id, user_id } => {
            scope.tenant_id == Some(tenant_id) && scope.user_id() == Some(user_id)
        }
    }
}

/// Picks the active view: explicit id, then `?v=name`, then the most
/// specific default visible in the scope.
fn resolve_view(
    details: &EntityWithDetails,
    scope: &Scope,
    params: &UrlParams,
    view_override: Option<ViewId>,
) -> EngineResult<Option<EntityView>> {
    if let Some(id) = view_override {
        return match details.views.iter().find(|v| v.id == id) {
            Some(view) => Ok(Some(view.clone())),
            None => Err(EngineError::NotFound(format!("view {id}"))),
        };
    }
    if let Some(name) = params.get("v") {
        return match details
            .views
            .iter()
            .find(|v| v.name == name && view_visible_in_scope(v, scope))
        {
            Some(view) => Ok(Some(view.clone())),
            None => Err(EngineError::NotFound(format!("view '{name}'"))),
        };
    }
    Ok(details
        .views
        .iter()
        .filter(|v| v.is_default && view_visible_in_scope(v, scope))
        .max_by_key(|v| scope_rank(v.scope))
        .cloned())
}

const fn scope_rank(scope: ViewScope) -> u8 {
    match scope {
        ViewScope::Global => 0,
        ViewScope::Tenant { .. } => 1,
        ViewScope::User { .. } => 2,
    }
}
