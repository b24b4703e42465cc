mod common;

use common::{make_engine, make_scope, seed_contacts, seed_projects_and_tasks, seed_workflow};
use pretty_assertions::assert_eq;
use rowhouse_engine::{Engine, EngineError, EntityRef, MutationOptions, UrlParams};
use rowhouse_model::{EntityView, FilterCondition, RowInput, ViewScope};
use rowhouse_types::Scope;
use rust_decimal::Decimal;

fn contact() -> EntityRef {
    EntityRef::name("contact")
}

async fn seed_roster(engine: &Engine, scope: &Scope) {
    for (name, status, score) in [
        ("Ada Lovelace", "customer", Some(90)),
        ("Grace Hopper", "lead", Some(70)),
        ("Edsger Dijkstra", "customer", None),
        ("Barbara Liskov", "lead", Some(95)),
    ] {
        let mut input = RowInput::new()
            .with_value("name", name)
            .with_value("status", status);
        if let Some(score) = score {
            input = input.with_value("score", Decimal::from(score));
        }
        engine
            .rows()
            .create_row(&contact(), scope, input, MutationOptions::default())
            .await
            .unwrap();
    }
}

async fn names(engine: &Engine, scope: &Scope, params: UrlParams) -> Vec<String> {
    engine
        .rows()
        .list_rows(&contact(), scope, &params, None, None)
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|i| i.summary)
        .collect()
}

// ── Filters ──────────────────────────────────────────────────────

#[tokio::test]
async fn property_params_filter_rows() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new().with("status", "customer")).await;
    assert_eq!(got, vec!["Edsger Dijkstra", "Ada Lovelace"]);
}

#[tokio::test]
async fn operator_prefixes_select_the_condition() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new().with("score", "gt:80")).await;
    // Rows without a score fail every ordered comparison.
    assert_eq!(got, vec!["Barbara Liskov", "Ada Lovelace"]);

    let got = names(&engine, &scope, UrlParams::new().with("name", "ends_with:hopper")).await;
    assert_eq!(got, vec!["Grace Hopper"]);
}

#[tokio::test]
async fn missing_values_only_pass_negative_conditions() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new().with("score", "ne:90")).await;
    assert!(got.contains(&"Edsger Dijkstra".to_string()), "{got:?}");
    assert!(!got.contains(&"Ada Lovelace".to_string()), "{got:?}");
}

#[tokio::test]
async fn in_condition_takes_comma_separated_values() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(
        &engine,
        &scope,
        UrlParams::new().with("name", "in:Ada Lovelace,Grace Hopper"),
    )
    .await;
    assert_eq!(got.len(), 2);
}

#[tokio::test]
async fn unknown_property_params_are_ignored() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new().with("shoe_size", "44")).await;
    assert_eq!(got.len(), 4);
}

// ── Search ───────────────────────────────────────────────────────

#[tokio::test]
async fn free_text_search_spans_values_and_folio() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new().with("q", "lovelace")).await;
    assert_eq!(got, vec!["Ada Lovelace"]);

    // Folio text is searchable; CON-0001 is the first row created.
    let got = names(&engine, &scope, UrlParams::new().with("q", "con-0001")).await;
    assert_eq!(got, vec!["Ada Lovelace"]);

    let got = names(&engine, &scope, UrlParams::new().with("q", "  ")).await;
    assert_eq!(got.len(), 4, "blank search is ignored");
}

// ── Sorting ──────────────────────────────────────────────────────

#[tokio::test]
async fn sort_param_orders_listings() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new().with("sort", "name")).await;
    assert_eq!(
        got,
        vec!["Ada Lovelace", "Barbara Liskov", "Edsger Dijkstra", "Grace Hopper"]
    );

    let got = names(&engine, &scope, UrlParams::new().with("sort", "-score")).await;
    // Missing values sort last in either direction.
    assert_eq!(
        got,
        vec!["Barbara Liskov", "Ada Lovelace", "Grace Hopper", "Edsger Dijkstra"]
    );

    let got = names(&engine, &scope, UrlParams::new().with("sort", "score")).await;
    assert_eq!(
        got,
        vec!["Grace Hopper", "Ada Lovelace", "Barbara Liskov", "Edsger Dijkstra"]
    );
}

#[tokio::test]
async fn default_order_is_newest_first() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let got = names(&engine, &scope, UrlParams::new()).await;
    assert_eq!(got[0], "Barbara Liskov");
    assert_eq!(got[3], "Ada Lovelace");
}

// ── Pagination ───────────────────────────────────────────────────

#[tokio::test]
async fn pagination_reports_and_clamps() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let page = engine
        .rows()
        .list_rows(
            &contact(),
            &scope,
            &UrlParams::new().with("pageSize", "3").with("page", "2"),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.total, 4);
    assert_eq!(page.pagination.total_pages, 2);

    // Out-of-range pages clamp to the last page.
    let page = engine
        .rows()
        .list_rows(
            &contact(),
            &scope,
            &UrlParams::new().with("pageSize", "3").with("page", "99"),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn negative_page_size_disables_paging() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let page = engine
        .rows()
        .list_rows(&contact(), &scope, &UrlParams::new(), None, Some(-1))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 4);
    assert_eq!(page.pagination.total_pages, 1);
}

#[tokio::test]
async fn unparseable_page_params_fall_back() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let page = engine
        .rows()
        .list_rows(
            &contact(),
            &scope,
            &UrlParams::new().with("page", "banana").with("pageSize", "many"),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.items.len(), 4);
}

// ── Views ────────────────────────────────────────────────────────

#[tokio::test]
async fn named_view_applies_saved_filters() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let view = EntityView::new(def.id, "customers", ViewScope::Global)
        .with_filter("status", FilterCondition::Eq, "customer")
        .with_sort("name", true);
    engine.catalog().create_view(view).await.unwrap();

    let page = engine
        .rows()
        .list_rows(&contact(), &scope, &UrlParams::new().with("v", "customers"), None, None)
        .await
        .unwrap();
    let got: Vec<&str> = page.items.iter().map(|i| i.summary.as_str()).collect();
    assert_eq!(got, vec!["Ada Lovelace", "Edsger Dijkstra"]);
    assert_eq!(page.current_view.as_ref().map(|v| v.name.as_str()), Some("customers"));
}

#[tokio::test]
async fn url_params_override_view_filters() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let scope = make_scope();
    seed_roster(&engine, &scope).await;

    let view = EntityView::new(def.id, "customers", ViewScope::Global).with_filter(
        "status",
        FilterCondition::Eq,
        "customer",
    );
    engine.catalog().create_view(view).await.unwrap();

    let got = names(
        &engine,
        &scope,
        UrlParams::new().with("v", "customers").with("status", "eq:lead"),
    )
    .await;
    assert_eq!(got.len(), 2, "the URL clause replaces the view clause");
}

#[tokio::test]
async fn unknown_view_name_is_not_found() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();

    let err = engine
        .rows()
        .list_rows(&contact(), &scope, &UrlParams::new().with("v", "nope"), None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn default_view_prefers_most_specific_scope() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let scope = make_scope();

    let global = EntityView::new(def.id, "everyone", ViewScope::Global).default_view();
    engine.catalog().create_view(global).await.unwrap();
    let mine = EntityView::new(
        def.id,
        "mine",
        ViewScope::User {
            tenant_id: scope.tenant_id.unwrap(),
            user_id: scope.user_id().unwrap(),
        },
    )
    .default_view();
    engine.catalog().create_view(mine).await.unwrap();

    let page = engine
        .rows()
        .list_rows(&contact(), &scope, &UrlParams::new(), None, None)
        .await
        .unwrap();
    assert_eq!(page.current_view.as_ref().map(|v| v.name.as_str()), Some("mine"));

    // Another caller only sees the global default.
    let other = make_scope();
    let page = engine
        .rows()
        .list_rows(&contact(), &other, &UrlParams::new(), None, None)
        .await
        .unwrap();
    assert_eq!(page.current_view.as_ref().map(|v| v.name.as_str()), Some("everyone"));
    assert_eq!(page.views.len(), 1, "personal views stay personal");
}

// ── Companion filters ────────────────────────────────────────────

#[tokio::test]
async fn tag_params_require_every_tag() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();

    for (name, tags) in [
        ("Ada", vec!["vip", "early"]),
        ("Grace", vec!["vip"]),
        ("Edsger", vec![]),
    ] {
        let mut input = RowInput::new().with_value("name", name);
        for tag in tags {
            input = input.with_tag(tag);
        }
        engine
            .rows()
            .create_row(&contact(), &scope, input, MutationOptions::default())
            .await
            .unwrap();
    }

    let got = names(&engine, &scope, UrlParams::new().with("tag", "vip")).await;
    assert_eq!(got.len(), 2);
    let got = names(
        &engine,
        &scope,
        UrlParams::new().with("tag", "vip").with("tag", "early"),
    )
    .await;
    assert_eq!(got, vec!["Ada"]);
}

#[tokio::test]
async fn tag_dictionary_is_managed_explicitly() {
    let engine = make_engine();
    seed_contacts(&engine).await;
    let scope = make_scope();

    let tag = engine
        .rows()
        .create_tag(&contact(), &scope, "vip", "#d4a017")
        .await
        .unwrap();
    assert_eq!(tag.color, "#d4a017");

    let err = engine
        .rows()
        .create_tag(&contact(), &scope, "vip", "#333333")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)), "{err}");

    let listed = engine.rows().list_tags(&contact(), &scope).await.unwrap();
    assert_eq!(listed.len(), 1);

    engine
        .rows()
        .delete_tag(&contact(), &scope, tag.id)
        .await
        .unwrap();
    let listed = engine.rows().list_tags(&contact(), &scope).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn workflow_state_param_filters_by_name() {
    let engine = make_engine();
    let def = seed_contacts(&engine).await;
    let states = seed_workflow(&engine, &def).await;
    let scope = make_scope();

    let moving = engine
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
        .create_row(
            &contact(),
            &scope,
            RowInput::new().with_value("name", "Grace"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    engine
        .rows()
        .perform_transition(moving.row.id, &contact(), &scope, "Start")
        .await
        .unwrap();

    let got = names(&engine, &scope, UrlParams::new().with("workflowState", "pending")).await;
    assert_eq!(got, vec!["Grace"]);

    let got = names(
        &engine,
        &scope,
        UrlParams::new().with("workflowStateId", &states[1].id.to_string()),
    )
    .await;
    assert_eq!(got, vec!["Ada"]);

    let err = engine
        .rows()
        .list_rows(
            &contact(),
            &scope,
            &UrlParams::new().with("workflowStateId", "not-a-uuid"),
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let got = names(&engine, &scope, UrlParams::new().with("workflowState", "no_such")).await;
    assert!(got.is_empty(), "unknown state names match nothing");
}

#[tokio::test]
async fn parent_param_filters_children() {
    let engine = make_engine();
    let (_, _, rel) = seed_projects_and_tasks(&engine).await;
    let scope = make_scope();
    let project_ref = EntityRef::name("project");
    let task_ref = EntityRef::name("task");

    let apollo = engine
        .rows()
        .create_row(
            &project_ref,
            &scope,
            RowInput::new().with_value("title", "Apollo"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    let gemini = engine
        .rows()
        .create_row(
            &project_ref,
            &scope,
            RowInput::new().with_value("title", "Gemini"),
            MutationOptions::default(),
        )
        .await
        .unwrap();
    for (title, parent) in [("Lander", &apollo), ("Capsule", &gemini)] {
        engine
            .rows()
            .create_row(
                &task_ref,
                &scope,
                RowInput::new()
                    .with_value("title", title)
                    .with_parent(rel.id, parent.row.id),
                MutationOptions::default(),
            )
            .await
            .unwrap();
    }

    let page = engine
        .rows()
        .list_rows(
            &task_ref,
            &scope,
            &UrlParams::new().with("project_id", &apollo.row.id.to_string()),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].summary, "Lander");

    let err = engine
        .rows()
        .list_rows(
            &task_ref,
            &scope,
            &UrlParams::new().with("project_id", "garbage"),
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
