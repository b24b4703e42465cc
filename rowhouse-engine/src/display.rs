//! Textual row summaries.

use rowhouse_model::{Property, PropertyValue};
use std::collections::BTreeMap;

/// Renders a row's display summary from its `is_display` properties.
///
/// Properties are taken in declared order; missing and empty values are
/// skipped. Returns an empty string when the entity declares no display
/// properties, in which case callers fall back to the display folio.
#[must_use]
pub fn display_summary(
    properties: &[Property],
    values: &BTreeMap<String, PropertyValue>,
) -> String {
    let parts: Vec<String> = properties
        .iter()
        .filter(|p| p.is_display)
        .filter_map(|p| values.get(&p.name))
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect();
    parts.join(", ")
}
