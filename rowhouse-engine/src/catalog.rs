//! Entity catalog: schema CRUD plus a read-through details cache.
//!
//! Every engine operation starts by resolving an [`EntityRef`] into an
//! [`EntityWithDetails`] bundle. The bundle is cached per (entity, tenant)
//! because property overlays differ per tenant; any catalog mutation drops
//! the affected entries. Row and permission data are never cached.

use crate::error::{EngineError, EngineResult};
use crate::task::run_blocking;
use rowhouse_model::{
    default_properties, default_webhooks, validate_property_name, EntityDef, EntityRelationship,
    EntityView, EntityWebhook, Property, WorkflowState, WorkflowStep,
};
use rowhouse_store::{CatalogStore, Database, RowStore, ViewStore, WorkflowStore};
use rowhouse_types::{EntityId, PropertyId, RelationshipId, StateId, StepId, TenantId, ViewId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// How callers name an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Id(EntityId),
    /// Machine name, e.g. `contact`.
    Name(String),
    /// URL key, e.g. `contacts`.
    Slug(String),
}

impl EntityRef {
    /// Reference by machine name.
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self::Name(name.into())
    }

    /// Reference by URL slug.
    #[must_use]
    pub fn slug(slug: &str) -> Self {
        Self::Slug(slug.into())
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for EntityRef {
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) | Self::Slug(name) => write!(f, "{name}"),
        }
    }
}

/// An entity definition with everything hanging off it.
#[derive(Debug, Clone)]
pub struct EntityWithDetails {
    pub def: EntityDef,
    /// Global properties plus the tenant's own, in declared order.
    pub properties: Vec<Property>,
    /// Relationships where the entity is parent or child.
    pub relationships: Vec<EntityRelationship>,
    pub views: Vec<EntityView>,
    /// Workflow states in declared order; the first is the initial state.
    pub workflow_states: Vec<WorkflowState>,
    pub workflow_steps: Vec<WorkflowStep>,
}

impl EntityWithDetails {
    /// Looks up a property by machine name.
    #[must_use]
    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Looks up a workflow state by id.
    #[must_use]
    pub fn state_by_id(&self, id: StateId) -> Option<&WorkflowState> {
        self.workflow_states.iter().find(|s| s.id == id)
    }

    /// Looks up a workflow state by name.
    #[must_use]
    pub fn state_by_name(&self, name: &str) -> Option<&WorkflowState> {
        self.workflow_states.iter().find(|s| s.name == name)
    }

    /// The initial workflow state, when the entity has one.
    #[must_use]
    pub fn initial_state(&self) -> Option<&WorkflowState> {
        self.workflow_states.first()
    }

    /// Relationships where this entity is the child.
    pub fn parent_relationships(&self) -> impl Iterator<Item = &EntityRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.child_entity_id == self.def.id)
    }

    /// Relationships where this entity is the parent.
    pub fn child_relationships(&self) -> impl Iterator<Item = &EntityRelationship> {
        self.relationships
            .iter()
            .filter(|r| r.parent_entity_id == self.def.id)
    }
}

type CacheKey = (EntityId, Option<TenantId>);

/// Catalog access shared by the whole engine.
#[derive(Clone)]
pub struct CatalogService {
    store: CatalogStore,
    views: ViewStore,
    workflow: WorkflowStore,
    rows: RowStore,
    cache: Arc<RwLock<HashMap<CacheKey, Arc<EntityWithDetails>>>>,
}

impl CatalogService {
    pub fn new(db: &Database) -> Self {
        Self {
            store: CatalogStore::new(db),
            views: ViewStore::new(db),
            workflow: WorkflowStore::new(db),
            rows: RowStore::new(db),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // ── Resolution ───────────────────────────────────────────────

    /// Resolves a reference to its definition, without details.
    pub async fn get_def(&self, entity: &EntityRef) -> EngineResult<EntityDef> {
        let store = self.store.clone();
        let wanted = entity.clone();
        let def = run_blocking(move || match &wanted {
            EntityRef::Id(id) => store.get_entity(*id),
            EntityRef::Name(name) => store.get_entity_by_name(name),
            EntityRef::Slug(slug) => store.get_entity_by_slug(slug),
        })
        .await?;
        def.ok_or_else(|| EngineError::NotFound(format!("entity '{entity}'")))
    }

    /// Resolves a reference to the full details bundle, served from cache
    /// when possible.
    pub async fn resolve(
        &self,
        entity: &EntityRef,
        tenant_id: Option<TenantId>,
    ) -> EngineResult<Arc<EntityWithDetails>> {
        let def = self.get_def(entity).await?;
        let key = (def.id, tenant_id);
        if let Some(details) = self.cache.read().await.get(&key) {
            return Ok(Arc::clone(details));
        }

        let details = Arc::new(self.load_details(def, tenant_id).await?);
        self.cache.write().await.insert(key, Arc::clone(&details));
        debug!(entity = %details.def.name, "cached entity details");
        Ok(details)
    }

    async fn load_details(
        &self,
        def: EntityDef,
        tenant_id: Option<TenantId>,
    ) -> EngineResult<EntityWithDetails> {
        let entity_id = def.id;
        let catalog = self.store.clone();
        let properties = run_blocking(move || catalog.list_properties(entity_id, tenant_id));
        let catalog = self.store.clone();
        let relationships = run_blocking(move || catalog.list_relationships(entity_id));
        let view_store = self.views.clone();
        let views = run_blocking(move || view_store.list_views(entity_id));
        let workflow = self.workflow.clone();
        let states = run_blocking(move || workflow.list_states(entity_id));
        let workflow = self.workflow.clone();
        let steps = run_blocking(move || workflow.list_steps(entity_id));

        let (properties, relationships, views, states, steps) =
            tokio::try_join!(properties, relationships, views, states, steps)?;
        Ok(EntityWithDetails {
            def,
            properties,
            relationships,
            views,
            workflow_states: states,
            workflow_steps: steps,
        })
    }

    /// All entity definitions in catalog order.
    pub async fn list_entities(&self) -> EngineResult<Vec<EntityDef>> {
        let store = self.store.clone();
        run_blocking(move || store.list_entities()).await
    }

    /// Drops cached details for one entity, every tenant overlay included.
    pub async fn invalidate(&self, entity_id: EntityId) {
        self.cache
            .write()
            .await
            .retain(|(id, _), _| *id != entity_id);
    }

    // ── Entities ─────────────────────────────────────────────────

    /// Registers a new entity and seeds its fixed properties and webhook
    /// slots.
    ///
    /// `name`, `slug` and `prefix` must be free across the whole catalog;
    /// the conflict error names the slug of the entity already holding one
    /// of them.
    pub async fn create_entity(&self, def: EntityDef) -> EngineResult<EntityDef> {
        let store = self.store.clone();
        let created = run_blocking(move || {
            if let Some(existing) =
                store.find_key_collision(&def.name, &def.slug, &def.prefix)?
            {
                return Ok(Err(existing.slug));
            }
            store.insert_entity(&def)?;
            for property in default_properties(def.id) {
                store.insert_property(&property)?;
            }
            for webhook in default_webhooks(def.id) {
                store.insert_webhook(&webhook)?;
            }
            Ok(Ok(def))
        })
        .await?;

        match created {
            Ok(def) => {
                info!(entity = %def.name, slug = %def.slug, "entity created");
                Ok(def)
            }
            Err(slug) => Err(EngineError::Conflict(format!(
                "entity keys already taken by '{slug}'"
            ))),
        }
    }

    /// Updates an entity definition.
    pub async fn update_entity(&self, def: EntityDef) -> EngineResult<()> {
        let store = self.store.clone();
        let entity_id = def.id;
        run_blocking(move || store.update_entity(&def)).await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    /// Removes an entity and its schema records.
    ///
    /// Refused while rows still reference the entity unless `cascade` is
    /// set, in which case every row goes with it.
    pub async fn delete_entity(&self, entity_id: EntityId, cascade: bool) -> EngineResult<()> {
        let rows = self.rows.clone();
        let row_ids = run_blocking(move || {
            Ok(rows
                .list_rows(entity_id)?
                .into_iter()
                .map(|r| r.id)
                .collect::<Vec<_>>())
        })
        .await?;
        if !row_ids.is_empty() && !cascade {
            return Err(EngineError::Conflict(format!(
                "entity still has {} rows; delete them first or cascade",
                row_ids.len()
            )));
        }

        let rows = self.rows.clone();
        let store = self.store.clone();
        run_blocking(move || {
            rows.delete_rows(&row_ids)?;
            store.delete_entity(entity_id)
        })
        .await?;
        self.invalidate(entity_id).await;
        info!(%entity_id, "entity deleted");
        Ok(())
    }

    // ── Properties ───────────────────────────────────────────────

    /// Declares a property on an entity.
    ///
    /// The name must be a valid machine key and unique within the entity's
    /// (tenant-scoped) property set.
    pub async fn create_property(&self, property: Property) -> EngineResult<Property> {
        validate_property_name(&property.name)?;
        let existing = self
            .resolve(&EntityRef::Id(property.entity_id), property.tenant_id)
            .await?;
        if existing.property_by_name(&property.name).is_some() {
            return Err(EngineError::Conflict(format!(
                "property '{}' already declared on '{}'",
                property.name, existing.def.name
            )));
        }

        let store = self.store.clone();
        let entity_id = property.entity_id;
        let created = run_blocking(move || {
            store.insert_property(&property)?;
            Ok(property)
        })
        .await?;
        self.invalidate(entity_id).await;
        Ok(created)
    }

    /// Updates a property definition.
    pub async fn update_property(&self, property: Property) -> EngineResult<()> {
        validate_property_name(&property.name)?;
        let store = self.store.clone();
        let entity_id = property.entity_id;
        run_blocking(move || store.update_property(&property)).await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    /// Copies a property under a numbered name (`email` → `email1`).
    ///
    /// Tries suffixes 1 through 10 and gives up with a conflict when all
    /// are taken.
    pub async fn duplicate_property(
        &self,
        property_id: PropertyId,
        tenant_id: Option<TenantId>,
    ) -> EngineResult<Property> {
        let store = self.store.clone();
        let source = run_blocking(move || store.get_property(property_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("property {property_id}")))?;

        let details = self
            .resolve(&EntityRef::Id(source.entity_id), tenant_id)
            .await?;
        let free_name = (1..=10)
            .map(|n| format!("{}{n}", source.name))
            .find(|name| details.property_by_name(name).is_none())
            .ok_or_else(|| {
                EngineError::Conflict(format!(
                    "no free name left to duplicate property '{}'",
                    source.name
                ))
            })?;

        let mut copy = source;
        copy.id = PropertyId::new();
        copy.title = format!("{} copy", copy.title);
        copy.name = free_name;
        self.create_property(copy).await
    }

    /// Removes a property and its stored values.
    pub async fn delete_property(&self, property_id: PropertyId) -> EngineResult<()> {
        let store = self.store.clone();
        let property = run_blocking(move || store.get_property(property_id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("property {property_id}")))?;

        let store = self.store.clone();
        run_blocking(move || store.delete_property(property_id)).await?;
        self.invalidate(property.entity_id).await;
        Ok(())
    }

    // ── Relationships ────────────────────────────────────────────

    /// Declares a relationship between two entities.
    pub async fn create_relationship(
        &self,
        rel: EntityRelationship,
    ) -> EngineResult<EntityRelationship> {
        // Both endpoints must exist; resolve without tenant overlay.
        self.get_def(&EntityRef::Id(rel.parent_entity_id)).await?;
        self.get_def(&EntityRef::Id(rel.child_entity_id)).await?;

        let store = self.store.clone();
        let created = run_blocking(move || {
            store.insert_relationship(&rel)?;
            Ok(rel)
        })
        .await?;
        self.invalidate(created.parent_entity_id).await;
        self.invalidate(created.child_entity_id).await;
        Ok(created)
    }

    /// Removes a relationship declaration and its row joins.
    pub async fn delete_relationship(&self, id: RelationshipId) -> EngineResult<()> {
        let store = self.store.clone();
        let rel = run_blocking(move || store.get_relationship(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("relationship {id}")))?;

        let store = self.store.clone();
        run_blocking(move || store.delete_relationship(id)).await?;
        self.invalidate(rel.parent_entity_id).await;
        self.invalidate(rel.child_entity_id).await;
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────

    /// Saves a new view.
    pub async fn create_view(&self, view: EntityView) -> EngineResult<EntityView> {
        let store = self.views.clone();
        let entity_id = view.entity_id;
        let created = run_blocking(move || {
            store.insert_view(&view)?;
            Ok(view)
        })
        .await?;
        self.invalidate(entity_id).await;
        Ok(created)
    }

    /// Updates a view. System views are immutable.
    pub async fn update_view(&self, view: EntityView) -> EngineResult<()> {
        self.require_editable_view(view.id).await?;
        let store = self.views.clone();
        let entity_id = view.entity_id;
        run_blocking(move || store.update_view(&view)).await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    /// Deletes a view. System views are immutable.
    pub async fn delete_view(&self, id: ViewId) -> EngineResult<()> {
        let view = self.require_editable_view(id).await?;
        let store = self.views.clone();
        run_blocking(move || store.delete_view(id)).await?;
        self.invalidate(view.entity_id).await;
        Ok(())
    }

    /// Makes a view the default of its scope, clearing the previous one.
    pub async fn set_default_view(&self, id: ViewId) -> EngineResult<()> {
        let store = self.views.clone();
        let view = run_blocking(move || {
            store.set_default(id)?;
            store.get_view(id)
        })
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("view {id}")))?;
        self.invalidate(view.entity_id).await;
        Ok(())
    }

    async fn require_editable_view(&self, id: ViewId) -> EngineResult<EntityView> {
        let store = self.views.clone();
        let view = run_blocking(move || store.get_view(id))
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("view {id}")))?;
        if view.is_system {
            return Err(EngineError::Forbidden(format!(
                "view '{}' is a system view",
                view.name
            )));
        }
        Ok(view)
    }

    // ── Workflow definitions ─────────────────────────────────────

    /// Adds a workflow state. The first state created for an entity becomes
    /// the initial state of new rows.
    pub async fn create_state(&self, state: WorkflowState) -> EngineResult<WorkflowState> {
        let store = self.workflow.clone();
        let entity_id = state.entity_id;
        let created = run_blocking(move || {
            store.insert_state(&state)?;
            Ok(state)
        })
        .await?;
        self.invalidate(entity_id).await;
        Ok(created)
    }

    /// Updates a state's name, color or position.
    pub async fn update_state(&self, state: WorkflowState) -> EngineResult<()> {
        let store = self.workflow.clone();
        let entity_id = state.entity_id;
        run_blocking(move || store.update_state(&state)).await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    /// Rewrites state order to match the given id sequence.
    pub async fn reorder_states(
        &self,
        entity_id: EntityId,
        ordered: Vec<StateId>,
    ) -> EngineResult<()> {
        let store = self.workflow.clone();
        run_blocking(move || {
            let states = store.list_states(entity_id)?;
            for state in states {
                if let Some(position) = ordered.iter().position(|id| *id == state.id) {
                    let mut state = state;
                    state.order = position as i64;
                    store.update_state(&state)?;
                }
            }
            Ok(())
        })
        .await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    /// Removes a state along with every step touching it.
    pub async fn delete_state(&self, entity_id: EntityId, id: StateId) -> EngineResult<()> {
        let store = self.workflow.clone();
        run_blocking(move || store.delete_state(id)).await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    /// Adds a workflow step. The (from state, action) pair must be free.
    pub async fn create_step(&self, step: WorkflowStep) -> EngineResult<WorkflowStep> {
        let store = self.workflow.clone();
        let entity_id = step.entity_id;
        let created = run_blocking(move || {
            if store.find_step(step.from_state_id, &step.action)?.is_some() {
                return Ok(Err(step.action.clone()));
            }
            store.insert_step(&step)?;
            Ok(Ok(step))
        })
        .await?;
        self.invalidate(entity_id).await;
        match created {
            Ok(step) => Ok(step),
            Err(action) => Err(EngineError::Conflict(format!(
                "a step named '{action}' already leaves that state"
            ))),
        }
    }

    /// Removes a workflow step.
    pub async fn delete_step(&self, entity_id: EntityId, id: StepId) -> EngineResult<()> {
        let store = self.workflow.clone();
        run_blocking(move || store.delete_step(id)).await?;
        self.invalidate(entity_id).await;
        Ok(())
    }

    // ── Webhooks ─────────────────────────────────────────────────

    /// The entity's webhook slots.
    pub async fn webhooks(&self, entity_id: EntityId) -> EngineResult<Vec<EntityWebhook>> {
        let store = self.store.clone();
        run_blocking(move || store.list_webhooks(entity_id)).await
    }

    /// Points a webhook slot at an endpoint (or disables it again).
    pub async fn configure_webhook(&self, webhook: EntityWebhook) -> EngineResult<()> {
        let store = self.store.clone();
        run_blocking(move || store.update_webhook(&webhook)).await
    }
}
