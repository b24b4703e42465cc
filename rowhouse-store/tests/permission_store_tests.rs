use rowhouse_model::{
    AccessLevel, EntityAction, EntityDef, EntityRule, Grantee, PermissionGrant, Row,
};
use rowhouse_store::{CatalogStore, Database, PermissionStore, RowStore};
use rowhouse_types::{Actor, EntityId, GroupId, RoleId, RowId, TenantId, UserId};

fn make_stores() -> (PermissionStore, RowStore, CatalogStore) {
    let db = Database::open_in_memory().unwrap();
    (
        PermissionStore::new(&db),
        RowStore::new(&db),
        CatalogStore::new(&db),
    )
}

// ── Grants ───────────────────────────────────────────────────

#[test]
fn upsert_grant_raises_existing_access() {
    let (store, _, _) = make_stores();
    let row_id = RowId::new();
    let user = UserId::new();

    store
        .upsert_grant(&PermissionGrant::new(
            row_id,
            Grantee::User(user),
            AccessLevel::View,
        ))
        .unwrap();
    store
        .upsert_grant(&PermissionGrant::new(
            row_id,
            Grantee::User(user),
            AccessLevel::Edit,
        ))
        .unwrap();

    let grants = store.list_grants(row_id).unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].access, AccessLevel::Edit);
}

#[test]
fn grantee_variants_roundtrip() {
    let (store, _, _) = make_stores();
    let row_id = RowId::new();
    let grantees = [
        Grantee::Public,
        Grantee::Tenant(TenantId::new()),
        Grantee::Role(RoleId::new()),
        Grantee::Group(GroupId::new()),
        Grantee::User(UserId::new()),
    ];
    for grantee in grantees {
        store
            .upsert_grant(&PermissionGrant::new(row_id, grantee, AccessLevel::Comment))
            .unwrap();
    }

    let loaded = store.list_grants(row_id).unwrap();
    assert_eq!(loaded.len(), grantees.len());
    for grantee in grantees {
        assert!(loaded.iter().any(|g| g.grantee == grantee));
    }
}

#[test]
fn delete_grant_removes_it() {
    let (store, _, _) = make_stores();
    let grant = PermissionGrant::new(
        RowId::new(),
        Grantee::Public,
        AccessLevel::View,
    );
    store.upsert_grant(&grant).unwrap();
    store.delete_grant(grant.id).unwrap();
    assert!(store.list_grants(grant.row_id).unwrap().is_empty());
}

#[test]
fn list_grants_for_entity_joins_rows() {
    let (store, rows, catalog) = make_stores();
    let entity = EntityDef::new("contact", "contacts", "CON", "Contact", "Contacts");
    catalog.insert_entity(&entity).unwrap();
    let other = EntityDef::new("deal", "deals", "DEA", "Deal", "Deals");
    catalog.insert_entity(&other).unwrap();

    let mut mine = Row::new(entity.id, None, Actor::System);
    rows.create_row(&mut mine, &[], &[], &[]).unwrap();
    let mut theirs = Row::new(other.id, None, Actor::System);
    rows.create_row(&mut theirs, &[], &[], &[]).unwrap();

    store
        .upsert_grant(&PermissionGrant::new(
            mine.id,
            Grantee::Public,
            AccessLevel::View,
        ))
        .unwrap();
    store
        .upsert_grant(&PermissionGrant::new(
            theirs.id,
            Grantee::Public,
            AccessLevel::View,
        ))
        .unwrap();

    let scoped = store.list_grants_for_entity(entity.id).unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].row_id, mine.id);
}

// ── Entity rules ─────────────────────────────────────────────

#[test]
fn rule_upsert_overwrites_permission_key() {
    let (store, _, _) = make_stores();
    let entity_id = EntityId::new();

    store
        .upsert_rule(&EntityRule::new(entity_id, EntityAction::Update, "contacts.write"))
        .unwrap();
    store
        .upsert_rule(&EntityRule::new(entity_id, EntityAction::Update, "contacts.manage"))
        .unwrap();

    let rule = store
        .get_rule(entity_id, EntityAction::Update)
        .unwrap()
        .unwrap();
    assert_eq!(rule.permission, "contacts.manage");
    assert!(store.get_rule(entity_id, EntityAction::Delete).unwrap().is_none());
    assert_eq!(store.list_rules(entity_id).unwrap().len(), 1);
}

// ── Tenant links ─────────────────────────────────────────────

#[test]
fn tenant_links_resolve_both_directions() {
    let (store, _, _) = make_stores();
    let parent = TenantId::new();
    let child = TenantId::new();
    store.add_tenant_link(parent, child).unwrap();

    assert_eq!(store.linked_tenants(parent).unwrap(), vec![child]);
    assert_eq!(store.linked_tenants(child).unwrap(), vec![parent]);
    assert!(store.linked_tenants(TenantId::new()).unwrap().is_empty());

    store.remove_tenant_link(parent, child).unwrap();
    assert!(store.linked_tenants(parent).unwrap().is_empty());
}

// ── User directory ───────────────────────────────────────────

#[test]
fn user_permissions_are_tenant_scoped() {
    let (store, _, _) = make_stores();
    let tenant = TenantId::new();
    let user = UserId::new();
    store
        .grant_user_permission(tenant, user, "contacts.update")
        .unwrap();

    assert!(store
        .user_has_permission(tenant, user, "contacts.update")
        .unwrap());
    assert!(!store
        .user_has_permission(tenant, user, "contacts.delete")
        .unwrap());
    assert!(!store
        .user_has_permission(TenantId::new(), user, "contacts.update")
        .unwrap());
}

#[test]
fn roles_and_groups_listed_per_user() {
    let (store, _, _) = make_stores();
    let tenant = TenantId::new();
    let user = UserId::new();
    let role = RoleId::new();
    let group = GroupId::new();

    store.assign_role(tenant, user, role).unwrap();
    store.assign_role(tenant, user, role).unwrap(); // duplicate ignored
    store.add_group_member(group, user).unwrap();

    assert_eq!(store.roles_for_user(tenant, user).unwrap(), vec![role]);
    assert!(store.roles_for_user(TenantId::new(), user).unwrap().is_empty());
    assert_eq!(store.groups_for_user(user).unwrap(), vec![group]);
}
