use crate::error::ModelError;
use rowhouse_types::{EntityId, PropertyId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed attribute declared on an entity.
///
/// Dynamic properties live in the value store; the fixed ones (`id`,
/// `folio`, `createdAt`) map straight onto row columns and are seeded
/// automatically when the entity is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub entity_id: EntityId,
    /// Tenant override scope. `None` applies the property to every tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    /// Machine name, unique within the entity. No spaces or hyphens.
    pub name: String,
    pub title: String,
    pub kind: PropertyKind,
    /// Refinement for rendering/validation (e.g. `email`, `url`, `phone`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub order: i64,
    pub is_dynamic: bool,
    pub is_required: bool,
    pub is_hidden: bool,
    /// Display properties make up the row's textual summary.
    pub is_display: bool,
    pub is_read_only: bool,
    pub can_update: bool,
    pub show_in_create: bool,
    /// Host-side formula reference for [`PropertyKind::Formula`] properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<PropertyOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<PropertyAttribute>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Property {
    /// Creates a visible, editable, dynamic property.
    ///
    /// The name is not validated here; [`validate_property_name`] runs when
    /// the catalog accepts the definition.
    #[must_use]
    pub fn new(entity_id: EntityId, name: &str, title: &str, kind: PropertyKind) -> Self {
        let now = Timestamp::now();
        Self {
            id: PropertyId::new(),
            entity_id,
            tenant_id: None,
            name: name.into(),
            title: title.into(),
            kind,
            subtype: None,
            order: 0,
            is_dynamic: true,
            is_required: false,
            is_hidden: false,
            is_display: false,
            is_read_only: false,
            can_update: true,
            show_in_create: true,
            formula_id: None,
            options: Vec::new(),
            attributes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the property required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    /// Marks the property as part of the row's display summary.
    #[must_use]
    pub fn display(mut self) -> Self {
        self.is_display = true;
        self
    }

    /// Hides the property from listings and search.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    /// Adds a select option.
    #[must_use]
    pub fn with_option(mut self, value: &str, name: &str) -> Self {
        let order = self.options.len() as i64;
        self.options.push(PropertyOption {
            value: value.into(),
            name: name.into(),
            color: String::new(),
            order,
        });
        self
    }

    /// Adds a validation/rendering attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push(PropertyAttribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Looks up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// True when the declared options contain the given value.
    #[must_use]
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}

/// One choice of a select or multi-select property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOption {
    pub value: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub order: i64,
}

/// A named validation or rendering attribute (`min`, `max`, `pattern`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAttribute {
    pub name: String,
    pub value: String,
}

/// The declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    MultiSelect,
    MultiText,
    Media,
    RangeNumber,
    RangeDate,
    Formula,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::MultiText => "multi_text",
            Self::Media => "media",
            Self::RangeNumber => "range_number",
            Self::RangeDate => "range_date",
            Self::Formula => "formula",
        };
        write!(f, "{s}")
    }
}

/// Checks that a property name is usable as a machine key.
///
/// Names appear in URLs, query parameters and wire payloads, so spaces and
/// hyphens are rejected outright.
pub fn validate_property_name(name: &str) -> Result<(), ModelError> {
    if name.is_empty() {
        return Err(ModelError::InvalidPropertyName {
            name: name.into(),
            reason: "name is empty".into(),
        });
    }
    if name.contains(' ') {
        return Err(ModelError::InvalidPropertyName {
            name: name.into(),
            reason: "name contains spaces".into(),
        });
    }
    if name.contains('-') {
        return Err(ModelError::InvalidPropertyName {
            name: name.into(),
            reason: "name contains hyphens".into(),
        });
    }
    Ok(())
}

/// The fixed properties seeded for every new entity.
///
/// All three are hidden from forms: `id` and `createdAt` are row columns and
/// `folio` is assigned by the engine.
#[must_use]
pub fn default_properties(entity_id: EntityId) -> Vec<Property> {
    let mut id = Property::new(entity_id, "id", "Id", PropertyKind::Text);
    id.is_dynamic = false;
    id.is_hidden = true;
    id.is_read_only = true;
    id.can_update = false;
    id.show_in_create = false;
    id.order = 0;

    let mut folio = Property::new(entity_id, "folio", "Folio", PropertyKind::Text);
    folio.is_dynamic = false;
    folio.is_hidden = true;
    folio.is_read_only = true;
    folio.can_update = false;
    folio.show_in_create = false;
    folio.order = 1;

    let mut created_at = Property::new(entity_id, "createdAt", "Created at", PropertyKind::Date);
    created_at.is_dynamic = false;
    created_at.is_hidden = true;
    created_at.is_read_only = true;
    created_at.can_update = false;
    created_at.show_in_create = false;
    created_at.order = 2;

    vec![id, folio, created_at]
}
