use rowhouse_types::{EntityId, RowId, TenantId};
use std::collections::HashSet;
use std::str::FromStr;

// ── RowId ─────────────────────────────────────────────────────────

#[test]
fn row_id_new_is_unique() {
    let a = RowId::new();
    let b = RowId::new();
    assert_ne!(a, b);
}

#[test]
fn row_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = RowId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn row_id_display_and_parse() {
    let id = RowId::new();
    let s = id.to_string();
    let parsed = RowId::parse(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn row_id_from_str() {
    let id = RowId::new();
    let s = id.to_string();
    let parsed: RowId = RowId::from_str(&s).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn row_id_parse_invalid() {
    assert!(RowId::parse("not-a-uuid").is_err());
}

#[test]
fn row_id_default_is_unique() {
    let a = RowId::default();
    let b = RowId::default();
    assert_ne!(a, b);
}

#[test]
fn row_id_hash_and_eq() {
    let id = RowId::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id); // duplicate
    assert_eq!(set.len(), 1);
}

#[test]
fn row_id_serialization_roundtrip() {
    let id = RowId::new();
    let json = serde_json::to_string(&id).unwrap();
    let parsed: RowId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn row_id_serializes_transparent() {
    let id = RowId::new();
    let json = serde_json::to_string(&id).unwrap();
    // Plain UUID string, no wrapper object
    assert_eq!(json, format!("\"{id}\""));
}

// ── EntityId ──────────────────────────────────────────────────────

#[test]
fn entity_id_new_is_unique() {
    let a = EntityId::new();
    let b = EntityId::new();
    assert_ne!(a, b);
}

#[test]
fn entity_id_display_and_parse() {
    let id = EntityId::new();
    let parsed = EntityId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn entity_id_from_str_invalid() {
    assert!(EntityId::from_str("garbage").is_err());
}

#[test]
fn entity_id_debug_contains_type_name() {
    let id = EntityId::new();
    let debug = format!("{:?}", id);
    assert!(debug.contains("EntityId"));
}

// ── Cross-type separation ─────────────────────────────────────────

#[test]
fn ids_of_different_families_share_wire_shape() {
    // A TenantId and a RowId built from the same UUID serialize identically;
    // only the Rust type keeps them apart.
    let uuid = uuid::Uuid::now_v7();
    let tenant = TenantId::from_uuid(uuid);
    let row = RowId::from_uuid(uuid);
    assert_eq!(
        serde_json::to_string(&tenant).unwrap(),
        serde_json::to_string(&row).unwrap()
    );
}

#[test]
fn v7_ids_order_by_creation_time() {
    let a = RowId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = RowId::new();
    assert!(a.as_uuid() < b.as_uuid());
}
