use rowhouse_model::{
    default_webhooks, Cardinality, EntityDef, EntityFeatures, EntityRelationship, Property,
    PropertyKind, Visibility, WebhookAction,
};
use rowhouse_store::{CatalogStore, Database};
use rowhouse_types::TenantId;

fn make_store() -> CatalogStore {
    let db = Database::open_in_memory().unwrap();
    CatalogStore::new(&db)
}

fn make_entity(name: &str, slug: &str, prefix: &str) -> EntityDef {
    EntityDef::new(name, slug, prefix, "Contact", "Contacts")
}

// ── Entities ─────────────────────────────────────────────────

#[test]
fn insert_and_get_entity() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON")
        .with_features(EntityFeatures::all())
        .with_visibility(Visibility::Tenant);
    store.insert_entity(&entity).unwrap();

    let by_id = store.get_entity(entity.id).unwrap().unwrap();
    assert_eq!(by_id, entity);
    let by_name = store.get_entity_by_name("contact").unwrap().unwrap();
    assert_eq!(by_name.id, entity.id);
    let by_slug = store.get_entity_by_slug("contacts").unwrap().unwrap();
    assert_eq!(by_slug.id, entity.id);
}

#[test]
fn get_entity_missing() {
    let store = make_store();
    assert!(store.get_entity_by_name("nope").unwrap().is_none());
}

#[test]
fn find_key_collision_matches_any_key() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();

    let hit = store
        .find_key_collision("other", "other", "CON")
        .unwrap()
        .unwrap();
    assert_eq!(hit.slug, "contacts");
    assert!(store
        .find_key_collision("other", "other", "OTH")
        .unwrap()
        .is_none());
}

#[test]
fn list_entities_ordered_by_position() {
    let store = make_store();
    let mut first = make_entity("b", "bs", "B");
    first.order = 2;
    let mut second = make_entity("a", "as", "A");
    second.order = 1;
    store.insert_entity(&first).unwrap();
    store.insert_entity(&second).unwrap();

    let names: Vec<String> = store
        .list_entities()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn update_entity_rewrites_fields() {
    let store = make_store();
    let mut entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();

    entity.title = "Person".into();
    entity.active = false;
    store.update_entity(&entity).unwrap();

    let loaded = store.get_entity(entity.id).unwrap().unwrap();
    assert_eq!(loaded.title, "Person");
    assert!(!loaded.active);
}

#[test]
fn delete_entity_removes_companions() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();
    let property = Property::new(entity.id, "email", "Email", PropertyKind::Text);
    store.insert_property(&property).unwrap();
    for webhook in default_webhooks(entity.id) {
        store.insert_webhook(&webhook).unwrap();
    }

    store.delete_entity(entity.id).unwrap();
    assert!(store.get_entity(entity.id).unwrap().is_none());
    assert!(store.list_properties(entity.id, None).unwrap().is_empty());
    assert!(store.list_webhooks(entity.id).unwrap().is_empty());
}

// ── Properties ───────────────────────────────────────────────

#[test]
fn property_roundtrip_with_options() {
    let store = make_store();
    let entity = make_entity("deal", "deals", "DEA");
    store.insert_entity(&entity).unwrap();

    let property = Property::new(entity.id, "stage", "Stage", PropertyKind::Select)
        .required()
        .with_option("open", "Open")
        .with_option("won", "Won")
        .with_attribute("width", "120");
    store.insert_property(&property).unwrap();

    let loaded = store.get_property(property.id).unwrap().unwrap();
    assert_eq!(loaded, property);
    assert!(loaded.has_option("won"));
    assert_eq!(loaded.attribute("width"), Some("120"));
}

#[test]
fn list_properties_overlays_tenant_additions() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();
    let tenant = TenantId::new();
    let other = TenantId::new();

    let global = Property::new(entity.id, "email", "Email", PropertyKind::Text);
    store.insert_property(&global).unwrap();
    let mut own = Property::new(entity.id, "budget", "Budget", PropertyKind::Number);
    own.tenant_id = Some(tenant);
    store.insert_property(&own).unwrap();
    let mut theirs = Property::new(entity.id, "secret", "Secret", PropertyKind::Text);
    theirs.tenant_id = Some(other);
    store.insert_property(&theirs).unwrap();

    let names: Vec<String> = store
        .list_properties(entity.id, Some(tenant))
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["budget", "email"]);

    let anonymous: Vec<String> = store
        .list_properties(entity.id, None)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(anonymous, vec!["email"]);
}

#[test]
fn duplicate_property_name_rejected() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();
    let first = Property::new(entity.id, "email", "Email", PropertyKind::Text);
    store.insert_property(&first).unwrap();

    let second = Property::new(entity.id, "email", "Other email", PropertyKind::Text);
    assert!(store.insert_property(&second).is_err());
}

#[test]
fn delete_property_removes_it() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();
    let property = Property::new(entity.id, "email", "Email", PropertyKind::Text);
    store.insert_property(&property).unwrap();

    store.delete_property(property.id).unwrap();
    assert!(store.get_property(property.id).unwrap().is_none());
}

// ── Relationships ────────────────────────────────────────────

#[test]
fn relationship_roundtrip_and_lookup() {
    let store = make_store();
    let project = make_entity("project", "projects", "PRJ");
    let task = make_entity("task", "tasks", "TSK");
    store.insert_entity(&project).unwrap();
    store.insert_entity(&task).unwrap();

    let rel = EntityRelationship::new(project.id, task.id, Cardinality::OneToMany)
        .cascading()
        .titled("Tasks");
    store.insert_relationship(&rel).unwrap();

    let found = store
        .find_relationship_between(project.id, task.id)
        .unwrap()
        .unwrap();
    assert_eq!(found, rel);
    assert!(found.cascade);
    assert!(store
        .find_relationship_between(task.id, project.id)
        .unwrap()
        .is_none());
}

#[test]
fn list_relationships_covers_both_sides() {
    let store = make_store();
    let project = make_entity("project", "projects", "PRJ");
    let task = make_entity("task", "tasks", "TSK");
    let note = make_entity("note", "notes", "NOT");
    store.insert_entity(&project).unwrap();
    store.insert_entity(&task).unwrap();
    store.insert_entity(&note).unwrap();

    store
        .insert_relationship(&EntityRelationship::new(
            project.id,
            task.id,
            Cardinality::OneToMany,
        ))
        .unwrap();
    store
        .insert_relationship(&EntityRelationship::new(
            note.id,
            task.id,
            Cardinality::ManyToMany,
        ))
        .unwrap();

    assert_eq!(store.list_relationships(task.id).unwrap().len(), 2);
    assert_eq!(store.list_relationships(project.id).unwrap().len(), 1);
}

// ── Webhooks ─────────────────────────────────────────────────

#[test]
fn default_webhooks_seed_and_configure() {
    let store = make_store();
    let entity = make_entity("contact", "contacts", "CON");
    store.insert_entity(&entity).unwrap();
    for webhook in default_webhooks(entity.id) {
        store.insert_webhook(&webhook).unwrap();
    }

    let all = store.list_webhooks(entity.id).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|w| !w.is_configured()));

    let mut created = store
        .webhook_for_action(entity.id, WebhookAction::Created)
        .unwrap()
        .unwrap();
    created.endpoint = "https://example.test/hooks".into();
    created.active = true;
    store.update_webhook(&created).unwrap();

    let reloaded = store
        .webhook_for_action(entity.id, WebhookAction::Created)
        .unwrap()
        .unwrap();
    assert!(reloaded.is_configured());
}

// ── Persistence ──────────────────────────────────────────────

#[test]
fn reopen_preserves_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rowhouse.db");

    let entity = make_entity("contact", "contacts", "CON");
    {
        let db = Database::open(&path).unwrap();
        CatalogStore::new(&db).insert_entity(&entity).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let loaded = CatalogStore::new(&db).get_entity(entity.id).unwrap().unwrap();
    assert_eq!(loaded.name, "contact");
}
