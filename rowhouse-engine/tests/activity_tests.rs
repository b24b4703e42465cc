mod common;

use common::{make_scope, seed_contacts};
use pretty_assertions::assert_eq;
use rowhouse_engine::{Engine, EngineConfig, EntityRef, MutationOptions};
use rowhouse_model::RowInput;
use rowhouse_store::Database;

fn contact() -> EntityRef {
    EntityRef::name("contact")
}

#[tokio::test]
async fn the_trail_captures_row_history() {
    let db = Database::open_in_memory().unwrap();
    let engine = Engine::new(&db);
    seed_contacts(&engine).await;
    let scope = make_scope();

    let item = engine
        .rows()
        .create_row(
            &contact(),
            &scope,
            RowInput::new().with_value("name", "Ada"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    engine
        .rows()
        .update_row(
            item.row.id,
            &contact(),
            &scope,
            RowInput::new().with_value("name", "Ada L"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    engine
        .rows()
        .delete_row(item.row.id, &contact(), &scope, MutationOptions::default())
        .await
        .unwrap();

    let trail = engine.activity().for_row(item.row.id).await.unwrap();
    let actions: Vec<&str> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["Deleted", "Updated", "Created"]);
    assert!(trail.iter().all(|e| e.tenant_id == scope.tenant_id));
    assert!(trail.iter().all(|e| e.actor.user_id() == scope.user_id()));
}

#[tokio::test]
async fn recent_pages_through_a_tenants_trail() {
    let db = Database::open_in_memory().unwrap();
    let engine = Engine::with_config(
        &db,
        EngineConfig {
            audit_page_size: 2,
            ..EngineConfig::default()
        },
    );
    seed_contacts(&engine).await;
    let scope = make_scope();
    for name in ["Ada", "Grace", "Edsger"] {
        engine
            .rows()
            .create_row(
                &contact(),
                &scope,
                RowInput::new().with_value("name", name),
                MutationOptions::default(),
            )
            .await
            .unwrap();
    }

    let page = engine.activity().recent(scope.tenant_id, 1).await.unwrap();
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);
    // Newest mutation leads.
    assert_eq!(page.entries[0].detail, "Edsger");

    let page = engine.activity().recent(scope.tenant_id, 2).await.unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].detail, "Ada");

    // Page numbers below 1 are treated as the first page.
    let page = engine.activity().recent(scope.tenant_id, 0).await.unwrap();
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.entries.len(), 2);

    // Past the end: nothing to show, reported page sticks to the last one.
    let page = engine.activity().recent(scope.tenant_id, 99).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.pagination.page, 2);
}

#[tokio::test]
async fn trails_are_tenant_scoped() {
    let db = Database::open_in_memory().unwrap();
    let engine = Engine::new(&db);
    seed_contacts(&engine).await;
    let ours = make_scope();
    let theirs = make_scope();

    engine
        .rows()
        .create_row(
            &contact(),
            &ours,
            RowInput::new().with_value("name", "Ada"),
            MutationOptions::default(),
        )
        .await
        .unwrap();

    let page = engine.activity().recent(theirs.tenant_id, 1).await.unwrap();
    assert!(page.entries.is_empty());
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.total_pages, 1);
}
