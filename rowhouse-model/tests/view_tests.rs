use rowhouse_model::{EntityView, FilterCondition, MatchMode, ViewLayout, ViewScope};
use rowhouse_types::{EntityId, TenantId, UserId};

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_view_is_a_plain_table() {
    let v = EntityView::new(EntityId::new(), "All", ViewScope::Global);
    assert_eq!(v.layout, ViewLayout::Table);
    assert_eq!(v.page_size, 0);
    assert!(v.filters.is_empty());
    assert!(v.sorts.is_empty());
    assert!(!v.is_default);
    assert!(!v.is_system);
}

#[test]
fn with_filter_appends_and_clause() {
    let v = EntityView::new(EntityId::new(), "Open", ViewScope::Global)
        .with_filter("status", FilterCondition::Eq, "open");
    assert_eq!(v.filters.len(), 1);
    assert_eq!(v.filters[0].name, "status");
    assert_eq!(v.filters[0].condition, FilterCondition::Eq);
    assert_eq!(v.filters[0].match_mode, MatchMode::And);
}

#[test]
fn with_sort_numbers_clauses_in_order() {
    let v = EntityView::new(EntityId::new(), "Sorted", ViewScope::Global)
        .with_sort("name", true)
        .with_sort("createdAt", false);
    assert_eq!(v.sorts[0].order, 0);
    assert_eq!(v.sorts[1].order, 1);
    assert!(v.sorts[0].ascending);
    assert!(!v.sorts[1].ascending);
}

#[test]
fn default_view_builder_sets_flag() {
    let v = EntityView::new(EntityId::new(), "All", ViewScope::Global).default_view();
    assert!(v.is_default);
}

// ── Scope serde ──────────────────────────────────────────────────

#[test]
fn global_scope_serde_shape() {
    let json = serde_json::to_value(ViewScope::Global).unwrap();
    assert_eq!(json["kind"], "global");
}

#[test]
fn tenant_scope_carries_tenant_id() {
    let tid = TenantId::new();
    let json = serde_json::to_value(ViewScope::Tenant { tenant_id: tid }).unwrap();
    assert_eq!(json["kind"], "tenant");
    assert_eq!(json["tenant_id"], serde_json::json!(tid));
}

#[test]
fn user_scope_carries_both_ids() {
    let scope = ViewScope::User {
        tenant_id: TenantId::new(),
        user_id: UserId::new(),
    };
    let json = serde_json::to_string(&scope).unwrap();
    let parsed: ViewScope = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, scope);
}

// ── FilterCondition parsing ──────────────────────────────────────

#[test]
fn condition_parse_accepts_known_operators() {
    assert_eq!(FilterCondition::parse("eq"), Some(FilterCondition::Eq));
    assert_eq!(FilterCondition::parse("contains"), Some(FilterCondition::Contains));
    assert_eq!(FilterCondition::parse("starts_with"), Some(FilterCondition::StartsWith));
    assert_eq!(FilterCondition::parse("gte"), Some(FilterCondition::Gte));
    assert_eq!(FilterCondition::parse("not_in"), Some(FilterCondition::NotIn));
}

#[test]
fn condition_parse_rejects_unknown_operators() {
    assert_eq!(FilterCondition::parse("like"), None);
    assert_eq!(FilterCondition::parse("EQ"), None);
    assert_eq!(FilterCondition::parse(""), None);
}

#[test]
fn condition_serde_uses_snake_case() {
    assert_eq!(
        serde_json::to_string(&FilterCondition::StartsWith).unwrap(),
        "\"starts_with\""
    );
    assert_eq!(serde_json::to_string(&FilterCondition::Ne).unwrap(), "\"ne\"");
}

// ── Full roundtrip ───────────────────────────────────────────────

#[test]
fn view_serde_roundtrip() {
    let v = EntityView::new(EntityId::new(), "Mine", ViewScope::User {
        tenant_id: TenantId::new(),
        user_id: UserId::new(),
    })
    .with_filter("status", FilterCondition::Ne, "closed")
    .with_sort("createdAt", false)
    .default_view();

    let json = serde_json::to_string(&v).unwrap();
    let parsed: EntityView = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, v);
}
