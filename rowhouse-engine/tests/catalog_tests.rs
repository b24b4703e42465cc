mod common;

use common::{make_engine, make_scope, seed_contacts, seed_workflow};
use pretty_assertions::assert_eq;
use rowhouse_engine::{EngineError, EntityRef, MutationOptions};
use rowhouse_model::{
    Cardinality, EntityDef, EntityRelationship, EntityView, Property, PropertyKind, RowInput,
    ViewScope, WorkflowStep,
};
use rowhouse_types::EntityId;

// ── Entities ─────────────────────────────────────────────────────

#[tokio::test]
async fn create_entity_seeds_builtins() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    let details = engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();
    for name in ["id", "folio", "createdAt"] {
        let property = details.property_by_name(name).unwrap();
        assert!(property.is_hidden, "{name} is an internal column");
        assert!(property.is_read_only);
    }

    let webhooks = engine.catalog().webhooks(def.id).await.unwrap();
    assert_eq!(webhooks.len(), 3);
    assert!(webhooks.iter().all(|w| !w.is_configured()));
}

#[tokio::test]
async fn entity_keys_must_be_unique() {
    let engine = make_engine();
    seed_contacts(&engine).await;

    let clash = EntityDef::new("contact2", "contacts", "CN2", "Contact", "Contacts");
    let err = engine.catalog().create_entity(clash).await.unwrap_err();
    assert!(
        matches!(&err, EngineError::Conflict(msg) if msg.contains("contacts")),
        "{err}"
    );
}

#[tokio::test]
async fn entities_resolve_by_id_name_and_slug() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    for entity in [
        EntityRef::Id(def.id),
        EntityRef::name("contact"),
        EntityRef::slug("contacts"),
    ] {
        let got = engine.catalog().get_def(&entity).await.unwrap();
        assert_eq!(got.id, def.id);
    }

    let err = engine
        .catalog()
        .get_def(&EntityRef::name("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn entity_updates_invalidate_cached_details() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    // Warm the cache first.
    engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();

    let mut changed = def.clone();
    changed.title_plural = "People".into();
    engine.catalog().update_entity(changed).await.unwrap();

    let details = engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();
    assert_eq!(details.def.title_plural, "People");
}

#[tokio::test]
async fn delete_entity_refuses_while_rows_remain() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let scope = make_scope();
    engine
        .rows()
        .create_row(
            &EntityRef::name("contact"),
            &scope,
            RowInput::new().with_value("name", "Ada"),
            MutationOptions::default(),
        )
        .await
        .unwrap();

    let err = engine.catalog().delete_entity(def.id, false).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    engine.catalog().delete_entity(def.id, true).await.unwrap();
    let err = engine
        .catalog()
        .get_def(&EntityRef::name("contact"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

// ── Properties ───────────────────────────────────────────────────

#[tokio::test]
async fn property_names_must_be_machine_keys() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    for bad in ["", "first name", "first-name"] {
        let property = Property::new(def.id, bad, "Bad", PropertyKind::Text);
        let err = engine.catalog().create_property(property).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "{bad:?}");
    }
}

#[tokio::test]
async fn property_names_are_unique_per_entity() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    let clash = Property::new(def.id, "email", "Email", PropertyKind::Text);
    let err = engine.catalog().create_property(clash).await.unwrap_err();
    assert!(
        matches!(&err, EngineError::Conflict(msg) if msg.contains("email")),
        "{err}"
    );
}

#[tokio::test]
async fn duplicate_property_numbers_the_copy() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let details = engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();
    let email = details.property_by_name("email").unwrap();

    let copy = engine
        .catalog()
        .duplicate_property(email.id, None)
        .await
        .unwrap();
    assert_eq!(copy.name, "email1");
    assert_eq!(copy.kind, email.kind);

    let again = engine
        .catalog()
        .duplicate_property(email.id, None)
        .await
        .unwrap();
    assert_eq!(again.name, "email2");
}

#[tokio::test]
async fn delete_property_drops_stored_values() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let scope = make_scope();
    let item = engine
        .rows()
        .create_row(
            &EntityRef::name("contact"),
            &scope,
            RowInput::new()
                .with_value("name", "Ada")
                .with_value("email", "ada@example.com"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    assert!(item.values.contains_key("email"));

    let details = engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();
    let email = details.property_by_name("email").unwrap();
    engine.catalog().delete_property(email.id).await.unwrap();

    let bundle = engine
        .rows()
        .get_row(item.row.id, &EntityRef::name("contact"), &scope)
        .await
        .unwrap();
    assert!(!bundle.item.values.contains_key("email"));
}

// ── Relationships ────────────────────────────────────────────────

#[tokio::test]
async fn relationships_require_both_entities() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    let rel = EntityRelationship::new(def.id, EntityId::new(), Cardinality::OneToMany);
    let err = engine.catalog().create_relationship(rel).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

// ── Views ────────────────────────────────────────────────────────

#[tokio::test]
async fn system_views_cannot_be_edited_or_deleted() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    let mut view = EntityView::new(def.id, "All contacts", ViewScope::Global);
    view.is_system = true;
    let view = engine.catalog().create_view(view).await.unwrap();

    let mut renamed = view.clone();
    renamed.name = "Renamed".into();
    let err = engine.catalog().update_view(renamed).await.unwrap_err();
    assert!(
        matches!(&err, EngineError::Forbidden(msg) if msg.contains("All contacts")),
        "{err}"
    );

    let err = engine.catalog().delete_view(view.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn set_default_view_moves_the_flag() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;

    let first = engine
        .catalog()
        .create_view(EntityView::new(def.id, "first", ViewScope::Global).default_view())
        .await
        .unwrap();
    let second = engine
        .catalog()
        .create_view(EntityView::new(def.id, "second", ViewScope::Global))
        .await
        .unwrap();

    engine.catalog().set_default_view(second.id).await.unwrap();

    let details = engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();
    let defaults: Vec<&str> = details
        .views
        .iter()
        .filter(|v| v.is_default)
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(defaults, vec!["second"]);
    assert!(details.views.iter().any(|v| v.id == first.id));
}

// ── Workflow definitions ─────────────────────────────────────────

#[tokio::test]
async fn steps_are_unique_per_state_and_action() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let states = seed_workflow(&engine, &def).await;

    let clash = WorkflowStep::new(def.id, states[0].id, states[2].id, "Start");
    let err = engine.catalog().create_step(clash).await.unwrap_err();
    assert!(
        matches!(&err, EngineError::Conflict(msg) if msg.contains("Start")),
        "{err}"
    );
}

#[tokio::test]
async fn reorder_states_changes_the_initial_state() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let states = seed_workflow(&engine, &def).await;

    engine
        .catalog()
        .reorder_states(def.id, vec![states[2].id, states[1].id, states[0].id])
        .await
        .unwrap();

    let details = engine
        .catalog()
        .resolve(&EntityRef::Id(def.id), None)
        .await
        .unwrap();
    assert_eq!(details.initial_state().map(|s| s.name.as_str()), Some("completed"));

    let scope = make_scope();
    let item = engine
        .rows()
        .create_row(
            &EntityRef::name("contact"),
            &scope,
            RowInput::new().with_value("name", "Ada"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(item.row.workflow_state_id, Some(states[2].id));
}
