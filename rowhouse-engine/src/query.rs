//! View, filter, sort and pagination evaluation.
//!
//! A listing request is folded into one [`QueryScope`]: saved-view filters
//! first, then per-property URL parameters (overriding clauses with the same
//! property name), then the reserved parameters (`q`, `tag`,
//! `workflowState`, parent-row filters). Evaluation is typed: every
//! comparison pattern-matches the [`PropertyValue`] variant, numbers and
//! dates compare in their own domain, never as strings.
//!
//! Visibility filtering happens before anything here runs; this module only
//! ever sees rows the caller may read.

use crate::catalog::EntityWithDetails;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate, Utc};
use rowhouse_model::{
    EntityTag, EntityView, FilterCondition, MatchMode, PropertyKind, PropertyValue, Row,
    ViewFilter, ViewSort,
};
use rowhouse_types::{RelationshipId, RowId, StateId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Parameter names with reserved meaning in listing URLs. Everything else
/// is treated as a property filter.
pub const RESERVED_PARAMS: &[&str] = &[
    "v",
    "sort",
    "page",
    "pageSize",
    "q",
    "tag",
    "workflowState",
    "workflowStateId",
];

/// Decoded query-string parameters, repeats allowed.
#[derive(Debug, Clone, Default)]
pub struct UrlParams(Vec<(String, String)>);

impl UrlParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    /// First value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for a repeatable key, in order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// How a listing names the workflow state to filter by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    Name(String),
    Id(StateId),
}

/// The fully resolved listing request.
#[derive(Debug, Clone)]
pub struct QueryScope {
    pub filters: Vec<ViewFilter>,
    pub sorts: Vec<ViewSort>,
    /// 1-based page number.
    pub page: i64,
    /// Rows per page; `-1` puts everything on one page.
    pub page_size: i64,
    /// Lowercased free-text search.
    pub search: Option<String>,
    /// Tag values the row must all carry.
    pub tags: Vec<String>,
    pub workflow_state: Option<StateFilter>,
    /// (relationship, parent row) pairs the row must be linked under.
    pub parents: Vec<(RelationshipId, RowId)>,
}

/// Page metadata returned with every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// One row staged for query evaluation, with everything the predicates
/// read preloaded.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    pub row: Row,
    /// Values keyed by property name.
    pub values: BTreeMap<String, PropertyValue>,
    pub tags: Vec<EntityTag>,
    /// Edges where this row is the child.
    pub parents: Vec<(RelationshipId, RowId)>,
    /// Lowercased creator email and name, when the directory knows them.
    pub creator_text: String,
}

/// Folds the saved view and URL parameters into a [`QueryScope`].
///
/// `parent_keys` maps parent entity names to relationship ids so
/// `<parentEntityName>_id` parameters can be resolved. Page size precedence:
/// explicit override, then the view's size, then `pageSize`, then the
/// configured default. Unparseable numeric parameters fall back rather than
/// fail; malformed ids are rejected.
pub fn build_query_scope(
    details: &EntityWithDetails,
    view: Option<&EntityView>,
    params: &UrlParams,
    parent_keys: &[(String, RelationshipId)],
    page_size_override: Option<i64>,
    config: &EngineConfig,
) -> EngineResult<QueryScope> {
    let mut filters: Vec<ViewFilter> = view.map(|v| v.filters.clone()).unwrap_or_default();

    for (key, value) in params.iter() {
        if RESERVED_PARAMS.contains(&key) || parent_keys.iter().any(|(name, _)| key == format!("{name}_id")) {
            continue;
        }
        let Some(property) = details.property_by_name(key) else {
            continue;
        };
        let (condition, raw) = match value.split_once(':') {
            Some((op, rest)) => match FilterCondition::parse(op) {
                Some(condition) => (condition, rest),
                None => (default_condition(property.kind), value),
            },
            None => (default_condition(property.kind), value),
        };
        upsert_filter(
            &mut filters,
            ViewFilter {
                name: key.into(),
                condition,
                value: raw.into(),
                match_mode: MatchMode::And,
            },
        );
    }

    let search = params
        .get("q")
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let tags: Vec<String> = params
        .get_all("tag")
        .into_iter()
        .map(ToOwned::to_owned)
        .collect();

    let workflow_state = if let Some(raw) = params.get("workflowStateId") {
        let id = raw.parse::<StateId>().map_err(|_| {
            EngineError::Validation(format!("'{raw}' is not a workflow state id"))
        })?;
        Some(StateFilter::Id(id))
    } else {
        params
            .get("workflowState")
            .map(|name| StateFilter::Name(name.into()))
    };

    let mut parents = Vec::new();
    for (name, relationship_id) in parent_keys {
        if let Some(raw) = params.get(&format!("{name}_id")) {
            let row_id = raw.parse::<RowId>().map_err(|_| {
                EngineError::Validation(format!("'{raw}' is not a row id for '{name}_id'"))
            })?;
            parents.push((*relationship_id, row_id));
        }
    }

    let sorts = match params.get("sort") {
        Some(raw) => parse_sort_param(raw),
        None => {
            let mut sorts: Vec<ViewSort> = view.map(|v| v.sorts.clone()).unwrap_or_default();
            sorts.sort_by_key(|s| s.order);
            sorts
        }
    };

    let page = params
        .get("page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1)
        .max(1);

    let page_size = page_size_override
        .or_else(|| view.map(|v| v.page_size).filter(|size| *size > 0))
        .or_else(|| params.get("pageSize").and_then(|p| p.parse::<i64>().ok()))
        .unwrap_or(config.default_page_size);

    Ok(QueryScope {
        filters,
        sorts,
        page,
        page_size,
        search,
        tags,
        workflow_state,
        parents,
    })
}

/// Filters, sorts and paginates in one pass.
pub fn apply(
    scope: &QueryScope,
    details: &EntityWithDetails,
    candidates: Vec<CandidateRow>,
) -> (Vec<CandidateRow>, Pagination) {
    let mut rows = filter_candidates(scope, details, candidates);
    sort_rows(&mut rows, &scope.sorts);
    paginate(rows, scope.page, scope.page_size)
}

/// Applies every predicate of the scope, keeping row order.
pub fn filter_candidates(
    scope: &QueryScope,
    details: &EntityWithDetails,
    candidates: Vec<CandidateRow>,
) -> Vec<CandidateRow> {
    candidates
        .into_iter()
        .filter(|c| matches_scope(scope, details, c))
        .collect()
}

fn matches_scope(scope: &QueryScope, details: &EntityWithDetails, c: &CandidateRow) -> bool {
    if let Some(state) = &scope.workflow_state {
        let wanted = match state {
            StateFilter::Id(id) => Some(*id),
            StateFilter::Name(name) => details.state_by_name(name).map(|s| s.id),
        };
        if wanted.is_none() || c.row.workflow_state_id != wanted {
            return false;
        }
    }
    if !scope.tags.iter().all(|tag| c.tags.iter().any(|t| t.value == *tag)) {
        return false;
    }
    if !scope.parents.iter().all(|parent| c.parents.contains(parent)) {
        return false;
    }
    if let Some(q) = &scope.search {
        if !matches_search(q, details, c) {
            return false;
        }
    }
    matches_filters(&scope.filters, c)
}

/// Free-text search over non-hidden values, the display folio and the
/// creator's directory fields.
fn matches_search(q: &str, details: &EntityWithDetails, c: &CandidateRow) -> bool {
    for property in &details.properties {
        if property.is_hidden {
            continue;
        }
        if let Some(value) = c.values.get(&property.name) {
            if value.search_text().contains(q) {
                return true;
            }
        }
    }
    if c.row
        .display_folio(&details.def.prefix)
        .to_lowercase()
        .contains(q)
    {
        return true;
    }
    c.creator_text.contains(q)
}

/// And-clauses must all hold; when any Or-clauses exist, at least one must.
fn matches_filters(filters: &[ViewFilter], c: &CandidateRow) -> bool {
    let mut has_or = false;
    let mut or_hit = false;
    for filter in filters {
        let hit = eval_filter(filter, c.values.get(&filter.name));
        match filter.match_mode {
            MatchMode::And => {
                if !hit {
                    return false;
                }
            }
            MatchMode::Or => {
                has_or = true;
                or_hit = or_hit || hit;
            }
        }
    }
    !has_or || or_hit
}

fn eval_filter(filter: &ViewFilter, value: Option<&PropertyValue>) -> bool {
    let Some(value) = value else {
        // A missing value differs from everything.
        return matches!(
            filter.condition,
            FilterCondition::Ne | FilterCondition::NotIn
        );
    };
    let raw = filter.value.as_str();
    match filter.condition {
        FilterCondition::Eq => value_equals(value, raw),
        FilterCondition::Ne => !value_equals(value, raw),
        FilterCondition::Contains => value.search_text().contains(&raw.to_lowercase()),
        FilterCondition::StartsWith => value.search_text().starts_with(&raw.to_lowercase()),
        FilterCondition::EndsWith => value.search_text().ends_with(&raw.to_lowercase()),
        FilterCondition::Lt => value_cmp(value, raw) == Some(Ordering::Less),
        FilterCondition::Lte => matches!(
            value_cmp(value, raw),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterCondition::Gt => value_cmp(value, raw) == Some(Ordering::Greater),
        FilterCondition::Gte => matches!(
            value_cmp(value, raw),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterCondition::In => raw.split(',').any(|v| value_equals(value, v.trim())),
        FilterCondition::NotIn => !raw.split(',').any(|v| value_equals(value, v.trim())),
    }
}

/// Typed equality between a stored value and a filter literal.
fn value_equals(value: &PropertyValue, raw: &str) -> bool {
    match value {
        PropertyValue::Text(s) => s == raw,
        PropertyValue::Number(n) => Decimal::from_str(raw).is_ok_and(|d| *n == d),
        PropertyValue::Date(d) => parse_date(raw).is_some_and(|p| *d == p),
        PropertyValue::Boolean(b) => parse_bool(raw).is_some_and(|p| *b == p),
        PropertyValue::Media(items) => items.iter().any(|m| m.name == raw),
        PropertyValue::Multiple(items) => items.iter().any(|v| v == raw),
        PropertyValue::NumberRange { .. } | PropertyValue::DateRange { .. } => {
            value.to_string() == raw
        }
    }
}

/// Typed ordering between a stored value and a filter literal. Ranges
/// compare by their lower bound; lists and media have no ordering.
fn value_cmp(value: &PropertyValue, raw: &str) -> Option<Ordering> {
    match value {
        PropertyValue::Text(s) => Some(s.to_lowercase().cmp(&raw.to_lowercase())),
        PropertyValue::Number(n) => Decimal::from_str(raw).ok().map(|d| n.cmp(&d)),
        PropertyValue::Date(d) => parse_date(raw).map(|p| d.cmp(&p)),
        PropertyValue::Boolean(b) => parse_bool(raw).map(|p| b.cmp(&p)),
        PropertyValue::NumberRange { min, .. } => Decimal::from_str(raw).ok().map(|d| min.cmp(&d)),
        PropertyValue::DateRange { min, .. } => parse_date(raw).map(|p| min.cmp(&p)),
        PropertyValue::Media(_) | PropertyValue::Multiple(_) => None,
    }
}

fn sort_rows(rows: &mut [CandidateRow], sorts: &[ViewSort]) {
    rows.sort_by(|a, b| {
        for sort in sorts {
            let ord = match (a.values.get(&sort.name), b.values.get(&sort.name)) {
                (Some(x), Some(y)) => {
                    let ord = value_ordering(x, y);
                    if sort.ascending { ord } else { ord.reverse() }
                }
                // Missing values sink to the end either direction.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        b.row
            .order
            .cmp(&a.row.order)
            .then(b.row.created_at.cmp(&a.row.created_at))
    });
}

fn value_ordering(a: &PropertyValue, b: &PropertyValue) -> Ordering {
    match (a, b) {
        (PropertyValue::Number(x), PropertyValue::Number(y)) => x.cmp(y),
        (PropertyValue::Date(x), PropertyValue::Date(y)) => x.cmp(y),
        (PropertyValue::Boolean(x), PropertyValue::Boolean(y)) => x.cmp(y),
        (
            PropertyValue::NumberRange { min: x, .. },
            PropertyValue::NumberRange { min: y, .. },
        ) => x.cmp(y),
        (
            PropertyValue::DateRange { min: x, .. },
            PropertyValue::DateRange { min: y, .. },
        ) => x.cmp(y),
        _ => a.search_text().cmp(&b.search_text()),
    }
}

fn paginate(rows: Vec<CandidateRow>, page: i64, page_size: i64) -> (Vec<CandidateRow>, Pagination) {
    let total = rows.len() as i64;
    if page_size < 0 {
        let pagination = Pagination {
            page: 1,
            page_size: -1,
            total,
            total_pages: 1,
        };
        return (rows, pagination);
    }
    let page_size = page_size.max(1);
    let total_pages = ((total + page_size - 1) / page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * page_size) as usize;
    let items = rows
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();
    (
        items,
        Pagination {
            page,
            page_size,
            total,
            total_pages,
        },
    )
}

fn upsert_filter(filters: &mut Vec<ViewFilter>, filter: ViewFilter) {
    match filters.iter_mut().find(|f| f.name == filter.name) {
        Some(existing) => *existing = filter,
        None => filters.push(filter),
    }
}

fn parse_sort_param(raw: &str) -> Vec<ViewSort> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .enumerate()
        .map(|(order, part)| {
            let (name, ascending) = match part.strip_prefix('-') {
                Some(rest) => (rest, false),
                None => (part, true),
            };
            ViewSort {
                name: name.into(),
                ascending,
                order: order as i64,
            }
        })
        .collect()
}

const fn default_condition(kind: PropertyKind) -> FilterCondition {
    match kind {
        PropertyKind::Text
        | PropertyKind::Select
        | PropertyKind::MultiSelect
        | PropertyKind::MultiText
        | PropertyKind::Media
        | PropertyKind::Formula => FilterCondition::Contains,
        PropertyKind::Number
        | PropertyKind::Date
        | PropertyKind::Boolean
        | PropertyKind::RangeNumber
        | PropertyKind::RangeDate => FilterCondition::Eq,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
