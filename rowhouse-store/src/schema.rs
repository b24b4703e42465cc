//! SQL schema for the Rowhouse store.
//!
//! Identifiers are TEXT (UUID strings), timestamps are INTEGER epoch
//! milliseconds, flags are INTEGER 0/1. Structured payloads (features,
//! options, filters, grantees, actors, property values) are serialized
//! JSON in TEXT columns.

pub(crate) const DDL: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        slug TEXT NOT NULL UNIQUE,
        prefix TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        title_plural TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0,
        features TEXT NOT NULL,
        default_visibility TEXT NOT NULL,
        on_created TEXT,
        on_edit TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS properties (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        tenant_id TEXT,
        name TEXT NOT NULL,
        title TEXT NOT NULL,
        kind TEXT NOT NULL,
        subtype TEXT,
        position INTEGER NOT NULL DEFAULT 0,
        is_dynamic INTEGER NOT NULL,
        is_required INTEGER NOT NULL,
        is_hidden INTEGER NOT NULL,
        is_display INTEGER NOT NULL,
        is_read_only INTEGER NOT NULL,
        can_update INTEGER NOT NULL,
        show_in_create INTEGER NOT NULL,
        formula_id TEXT,
        options TEXT NOT NULL,
        attributes TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(entity_id, tenant_id, name)
    );
    CREATE INDEX IF NOT EXISTS idx_properties_entity ON properties(entity_id);

    CREATE TABLE IF NOT EXISTS rows (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        tenant_id TEXT,
        folio INTEGER NOT NULL,
        position INTEGER NOT NULL,
        workflow_state_id TEXT,
        created_by TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(entity_id, tenant_id, folio)
    );
    CREATE INDEX IF NOT EXISTS idx_rows_entity ON rows(entity_id, tenant_id);

    CREATE TABLE IF NOT EXISTS row_values (
        row_id TEXT NOT NULL,
        property_id TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(row_id, property_id)
    );
    CREATE INDEX IF NOT EXISTS idx_row_values_row ON row_values(row_id);

    CREATE TABLE IF NOT EXISTS entity_relationships (
        id TEXT PRIMARY KEY,
        parent_entity_id TEXT NOT NULL,
        child_entity_id TEXT NOT NULL,
        cardinality TEXT NOT NULL,
        title TEXT,
        required INTEGER NOT NULL,
        cascade_delete INTEGER NOT NULL,
        read_only INTEGER NOT NULL,
        hidden_if_empty INTEGER NOT NULL,
        parent_view_id TEXT,
        child_view_id TEXT,
        position INTEGER NOT NULL DEFAULT 0,
        UNIQUE(parent_entity_id, child_entity_id, title)
    );

    CREATE TABLE IF NOT EXISTS row_relationships (
        relationship_id TEXT NOT NULL,
        parent_row_id TEXT NOT NULL,
        child_row_id TEXT NOT NULL,
        UNIQUE(relationship_id, parent_row_id, child_row_id)
    );
    CREATE INDEX IF NOT EXISTS idx_row_rel_parent ON row_relationships(parent_row_id);
    CREATE INDEX IF NOT EXISTS idx_row_rel_child ON row_relationships(child_row_id);

    CREATE TABLE IF NOT EXISTS permission_grants (
        id TEXT PRIMARY KEY,
        row_id TEXT NOT NULL,
        grantee TEXT NOT NULL,
        access TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        UNIQUE(row_id, grantee)
    );
    CREATE INDEX IF NOT EXISTS idx_grants_row ON permission_grants(row_id);

    CREATE TABLE IF NOT EXISTS entity_rules (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        action TEXT NOT NULL,
        permission TEXT NOT NULL,
        UNIQUE(entity_id, action)
    );

    CREATE TABLE IF NOT EXISTS tenant_links (
        parent_tenant_id TEXT NOT NULL,
        child_tenant_id TEXT NOT NULL,
        UNIQUE(parent_tenant_id, child_tenant_id)
    );

    CREATE TABLE IF NOT EXISTS user_permissions (
        tenant_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        permission TEXT NOT NULL,
        UNIQUE(tenant_id, user_id, permission)
    );

    CREATE TABLE IF NOT EXISTS user_roles (
        tenant_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        role_id TEXT NOT NULL,
        UNIQUE(tenant_id, user_id, role_id)
    );

    CREATE TABLE IF NOT EXISTS group_members (
        group_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        UNIQUE(group_id, user_id)
    );

    CREATE TABLE IF NOT EXISTS views (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        name TEXT NOT NULL,
        scope TEXT NOT NULL,
        layout TEXT NOT NULL,
        page_size INTEGER NOT NULL,
        columns TEXT NOT NULL,
        filters TEXT NOT NULL,
        sorts TEXT NOT NULL,
        group_by TEXT,
        is_default INTEGER NOT NULL,
        is_system INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(entity_id, name, scope)
    );
    CREATE INDEX IF NOT EXISTS idx_views_entity ON views(entity_id);

    CREATE TABLE IF NOT EXISTS workflow_states (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        name TEXT NOT NULL,
        color TEXT NOT NULL,
        position INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_states_entity ON workflow_states(entity_id);

    CREATE TABLE IF NOT EXISTS workflow_steps (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        from_state_id TEXT NOT NULL,
        to_state_id TEXT NOT NULL,
        action TEXT NOT NULL,
        assign_to TEXT NOT NULL,
        position INTEGER NOT NULL,
        UNIQUE(from_state_id, action)
    );

    CREATE TABLE IF NOT EXISTS row_workflow_transitions (
        id TEXT PRIMARY KEY,
        row_id TEXT NOT NULL,
        step_id TEXT NOT NULL,
        from_state_id TEXT NOT NULL,
        to_state_id TEXT NOT NULL,
        actor TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transitions_row ON row_workflow_transitions(row_id);

    CREATE TABLE IF NOT EXISTS entity_tags (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        tenant_id TEXT,
        value TEXT NOT NULL,
        color TEXT NOT NULL,
        UNIQUE(entity_id, tenant_id, value)
    );

    CREATE TABLE IF NOT EXISTS row_tags (
        row_id TEXT NOT NULL,
        tag_id TEXT NOT NULL,
        UNIQUE(row_id, tag_id)
    );
    CREATE INDEX IF NOT EXISTS idx_row_tags_row ON row_tags(row_id);

    CREATE TABLE IF NOT EXISTS row_comments (
        id TEXT PRIMARY KEY,
        row_id TEXT NOT NULL,
        author TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_comments_row ON row_comments(row_id);

    CREATE TABLE IF NOT EXISTS row_tasks (
        id TEXT PRIMARY KEY,
        row_id TEXT NOT NULL,
        title TEXT NOT NULL,
        done INTEGER NOT NULL,
        created_by TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        due_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_row ON row_tasks(row_id);

    CREATE TABLE IF NOT EXISTS entity_webhooks (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        action TEXT NOT NULL,
        method TEXT NOT NULL,
        endpoint TEXT NOT NULL,
        active INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS audit_log (
        id TEXT PRIMARY KEY,
        tenant_id TEXT,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        row_id TEXT NOT NULL,
        detail TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_row ON audit_log(row_id);
    CREATE INDEX IF NOT EXISTS idx_audit_tenant ON audit_log(tenant_id, created_at);
";
