//! Shared fixtures for engine tests.

#![allow(dead_code)]

use rowhouse_engine::Engine;
use rowhouse_model::{
    Cardinality, EntityDef, EntityFeatures, EntityRelationship, Property, PropertyKind,
    Visibility, WorkflowState, WorkflowStep,
};
use rowhouse_store::Database;
use rowhouse_types::{Scope, TenantId, UserId};

/// Routes engine tracing through the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn make_engine() -> Engine {
    init_tracing();
    let db = Database::open_in_memory().unwrap();
    Engine::new(&db)
}

pub fn make_scope() -> Scope {
    Scope::user(TenantId::new(), UserId::new())
}

/// A contact entity with every feature on, tenant-visible by default.
///
/// Properties: required display `name`, plain `email`, select `status`
/// (lead/customer) and numeric `score`.
pub async fn seed_contacts(engine: &Engine) -> EntityDef {
    let def = EntityDef::new("contact", "contacts", "CON", "Contact", "Contacts")
        .with_features(EntityFeatures::all())
        .with_visibility(Visibility::Tenant);
    let def = engine.catalog().create_entity(def).await.unwrap();

    let name = Property::new(def.id, "name", "Name", PropertyKind::Text)
        .required()
        .display();
    engine.catalog().create_property(name).await.unwrap();
    engine
        .catalog()
        .create_property(Property::new(def.id, "email", "Email", PropertyKind::Text))
        .await
        .unwrap();
    engine
        .catalog()
        .create_property(
            Property::new(def.id, "status", "Status", PropertyKind::Select)
                .with_option("lead", "Lead")
                .with_option("customer", "Customer"),
        )
        .await
        .unwrap();
    engine
        .catalog()
        .create_property(Property::new(def.id, "score", "Score", PropertyKind::Number))
        .await
        .unwrap();
    def
}

/// A project/task pair linked one-to-many with cascade delete.
///
/// Returns (project def, task def, relationship). Both entities carry a
/// required display `title` property and tenant visibility.
pub async fn seed_projects_and_tasks(
    engine: &Engine,
) -> (EntityDef, EntityDef, EntityRelationship) {
    let project = EntityDef::new("project", "projects", "PRJ", "Project", "Projects")
        .with_visibility(Visibility::Tenant);
    let project = engine.catalog().create_entity(project).await.unwrap();
    let task = EntityDef::new("task", "tasks", "TSK", "Task", "Tasks")
        .with_visibility(Visibility::Tenant);
    let task = engine.catalog().create_entity(task).await.unwrap();

    for def in [&project, &task] {
        let title = Property::new(def.id, "title", "Title", PropertyKind::Text)
            .required()
            .display();
        engine.catalog().create_property(title).await.unwrap();
    }

    let rel = EntityRelationship::new(project.id, task.id, Cardinality::OneToMany).cascading();
    let rel = engine.catalog().create_relationship(rel).await.unwrap();
    (project, task, rel)
}

/// Attaches a pending -> in_progress -> completed workflow to an entity.
///
/// Steps: `Start` (pending to in_progress) and `Done` (in_progress to
/// completed). Returns the states in order.
pub async fn seed_workflow(engine: &Engine, def: &EntityDef) -> Vec<WorkflowState> {
    let pending = WorkflowState::new(def.id, "pending", 0);
    let in_progress = WorkflowState::new(def.id, "in_progress", 1);
    let completed = WorkflowState::new(def.id, "completed", 2);
    let pending = engine.catalog().create_state(pending).await.unwrap();
    let in_progress = engine.catalog().create_state(in_progress).await.unwrap();
    let completed = engine.catalog().create_state(completed).await.unwrap();

    let start = WorkflowStep::new(def.id, pending.id, in_progress.id, "Start");
    engine.catalog().create_step(start).await.unwrap();
    let done = WorkflowStep::new(def.id, in_progress.id, completed.id, "Done");
    engine.catalog().create_step(done).await.unwrap();

    vec![pending, in_progress, completed]
}
