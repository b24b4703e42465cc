use crate::property::PropertyKind;
use chrono::{DateTime, Utc};
use rowhouse_types::MediaId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed property value attached to a row.
///
/// The live variant is dictated by the owning property's kind; readers match
/// exhaustively rather than probing optional fields. Select properties store
/// the chosen option value as [`PropertyValue::Text`]; multi-select and
/// multi-text store [`PropertyValue::Multiple`]; formula snapshots are text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Text(String),
    Number(Decimal),
    Date(DateTime<Utc>),
    Boolean(bool),
    Media(Vec<RowMedia>),
    Multiple(Vec<String>),
    NumberRange { min: Decimal, max: Decimal },
    DateRange { min: DateTime<Utc>, max: DateTime<Utc> },
}

macro_rules! impl_value_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_value_from! {
    Text(String),
    Number(Decimal),
    Date(DateTime<Utc>),
    Boolean(bool),
    Multiple(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl PropertyValue {
    /// True when this variant is storable under the given property kind.
    #[must_use]
    pub const fn matches_kind(&self, kind: PropertyKind) -> bool {
        matches!(
            (self, kind),
            (
                Self::Text(_),
                PropertyKind::Text | PropertyKind::Select | PropertyKind::Formula
            ) | (Self::Number(_), PropertyKind::Number)
                | (Self::Date(_), PropertyKind::Date)
                | (Self::Boolean(_), PropertyKind::Boolean)
                | (Self::Media(_), PropertyKind::Media)
                | (
                    Self::Multiple(_),
                    PropertyKind::MultiSelect | PropertyKind::MultiText
                )
                | (Self::NumberRange { .. }, PropertyKind::RangeNumber)
                | (Self::DateRange { .. }, PropertyKind::RangeDate)
        )
    }

    /// Returns the text payload for text-backed variants.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the decimal payload for number values.
    #[must_use]
    pub const fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the date payload for date values.
    #[must_use]
    pub const fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns the boolean payload for boolean values.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the list payload for multi-value variants.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Multiple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the media payload for media values.
    #[must_use]
    pub fn as_media(&self) -> Option<&[RowMedia]> {
        match self {
            Self::Media(items) => Some(items),
            _ => None,
        }
    }

    /// True for empty text, empty lists and empty media sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Media(items) => items.is_empty(),
            Self::Multiple(items) => items.is_empty(),
            Self::Number(_)
            | Self::Date(_)
            | Self::Boolean(_)
            | Self::NumberRange { .. }
            | Self::DateRange { .. } => false,
        }
    }

    /// Lowercased text rendering used by free-text search.
    #[must_use]
    pub fn search_text(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Media(items) => {
                let names: Vec<&str> = items.iter().map(|m| m.name.as_str()).collect();
                write!(f, "{}", names.join(", "))
            }
            Self::Multiple(items) => write!(f, "{}", items.join(", ")),
            Self::NumberRange { min, max } => write!(f, "{min} - {max}"),
            Self::DateRange { min, max } => {
                write!(f, "{} - {}", min.to_rfc3339(), max.to_rfc3339())
            }
        }
    }
}

/// A file attached to a media property value.
///
/// Carries inline base64 content on the way in; the media store hook swaps
/// it for a URL (and optionally a bucket name) once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMedia {
    pub id: MediaId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content_type: String,
    /// Inline payload (base64) awaiting upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Public URL once persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Storage bucket or provider key, when the media store reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

impl RowMedia {
    /// Creates a media item holding inline content to be uploaded.
    #[must_use]
    pub fn inline(name: &str, content_type: &str, content: &str) -> Self {
        Self {
            id: MediaId::new(),
            name: name.into(),
            title: None,
            content_type: content_type.into(),
            content: Some(content.into()),
            url: None,
            bucket: None,
        }
    }

    /// True while the item still carries unpersisted inline content.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.content.is_some() && self.url.is_none()
    }
}
