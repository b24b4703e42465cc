use rowhouse_types::{EntityId, Timestamp};
use serde::{Deserialize, Serialize};

/// An entity definition: one runtime-declared record type in the catalog.
///
/// Entities are data, not Rust types. Deployed applications register them at
/// setup time and every row, property, view and workflow hangs off one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub id: EntityId,
    /// Machine name, unique across the catalog (e.g. `contact`).
    pub name: String,
    /// URL key, unique across the catalog (e.g. `contacts`).
    pub slug: String,
    /// Folio prefix, unique across the catalog (e.g. `CON`).
    pub prefix: String,
    pub title: String,
    pub title_plural: String,
    /// Position in catalog listings.
    pub order: i64,
    pub features: EntityFeatures,
    /// Sharing applied to new rows when the creator asks for nothing else.
    pub default_visibility: Visibility,
    /// Host-interpreted redirect policy after creating a row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_created: Option<String>,
    /// Host-interpreted redirect policy after editing a row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_edit: Option<String>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntityDef {
    /// Creates an active entity definition with default features.
    #[must_use]
    pub fn new(name: &str, slug: &str, prefix: &str, title: &str, title_plural: &str) -> Self {
        let now = Timestamp::now();
        Self {
            id: EntityId::new(),
            name: name.into(),
            slug: slug.into(),
            prefix: prefix.into(),
            title: title.into(),
            title_plural: title_plural.into(),
            order: 0,
            features: EntityFeatures::default(),
            default_visibility: Visibility::default(),
            on_created: None,
            on_edit: None,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the feature set.
    #[must_use]
    pub fn with_features(mut self, features: EntityFeatures) -> Self {
        self.features = features;
        self
    }

    /// Replaces the default visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.default_visibility = visibility;
        self
    }
}

/// Optional capabilities toggled per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityFeatures {
    pub tags: bool,
    pub comments: bool,
    pub tasks: bool,
    pub workflow: bool,
    /// Show the audit trail alongside rows.
    pub activity: bool,
    pub api: bool,
    pub bulk_delete: bool,
}

impl EntityFeatures {
    /// Every feature switched on.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            tags: true,
            comments: true,
            tasks: true,
            workflow: true,
            activity: true,
            api: true,
            bulk_delete: true,
        }
    }
}

/// Who can see rows of an entity when no explicit grant exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the creator and explicit grants.
    #[default]
    Private,
    /// Every member of the owning tenant.
    Tenant,
    /// The owning tenant plus tenants linked to it.
    LinkedAccounts,
    /// Anyone, signed in or not.
    Public,
}
