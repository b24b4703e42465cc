use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rowhouse_model::{PropertyKind, PropertyValue, RowMedia};
use rust_decimal::Decimal;

// ── Kind matching ────────────────────────────────────────────────

#[test]
fn text_matches_text_select_and_formula() {
    let v = PropertyValue::Text("hello".into());
    assert!(v.matches_kind(PropertyKind::Text));
    assert!(v.matches_kind(PropertyKind::Select));
    assert!(v.matches_kind(PropertyKind::Formula));
    assert!(!v.matches_kind(PropertyKind::Number));
}

#[test]
fn multiple_matches_both_multi_kinds() {
    let v = PropertyValue::Multiple(vec!["a".into(), "b".into()]);
    assert!(v.matches_kind(PropertyKind::MultiSelect));
    assert!(v.matches_kind(PropertyKind::MultiText));
    assert!(!v.matches_kind(PropertyKind::Text));
}

#[test]
fn ranges_match_only_their_kind() {
    let nr = PropertyValue::NumberRange {
        min: Decimal::new(1, 0),
        max: Decimal::new(10, 0),
    };
    assert!(nr.matches_kind(PropertyKind::RangeNumber));
    assert!(!nr.matches_kind(PropertyKind::RangeDate));
    assert!(!nr.matches_kind(PropertyKind::Number));
}

#[test]
fn scalar_kinds_match_exactly() {
    assert!(PropertyValue::Number(Decimal::new(42, 0)).matches_kind(PropertyKind::Number));
    assert!(PropertyValue::Boolean(true).matches_kind(PropertyKind::Boolean));
    let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    assert!(PropertyValue::Date(date).matches_kind(PropertyKind::Date));
}

// ── Accessors ────────────────────────────────────────────────────

#[test]
fn accessors_return_payload_for_matching_variant() {
    assert_eq!(PropertyValue::Text("x".into()).as_text(), Some("x"));
    assert_eq!(
        PropertyValue::Number(Decimal::new(5, 0)).as_number(),
        Some(Decimal::new(5, 0))
    );
    assert_eq!(PropertyValue::Boolean(false).as_bool(), Some(false));
    let v = PropertyValue::Multiple(vec!["a".into()]);
    assert_eq!(v.as_list(), Some(&["a".to_string()][..]));
}

#[test]
fn accessors_return_none_for_other_variants() {
    assert_eq!(PropertyValue::Boolean(true).as_text(), None);
    assert_eq!(PropertyValue::Text("7".into()).as_number(), None);
    assert_eq!(PropertyValue::Text("x".into()).as_list(), None);
}

// ── Emptiness ────────────────────────────────────────────────────

#[test]
fn empty_text_and_lists_are_empty() {
    assert!(PropertyValue::Text(String::new()).is_empty());
    assert!(PropertyValue::Multiple(vec![]).is_empty());
    assert!(PropertyValue::Media(vec![]).is_empty());
}

#[test]
fn scalars_are_never_empty() {
    assert!(!PropertyValue::Number(Decimal::ZERO).is_empty());
    assert!(!PropertyValue::Boolean(false).is_empty());
}

// ── Display ──────────────────────────────────────────────────────

#[test]
fn display_renders_readably() {
    assert_eq!(PropertyValue::Text("hi".into()).to_string(), "hi");
    assert_eq!(PropertyValue::Number(Decimal::new(125, 2)).to_string(), "1.25");
    assert_eq!(PropertyValue::Boolean(true).to_string(), "true");
    assert_eq!(
        PropertyValue::Multiple(vec!["a".into(), "b".into()]).to_string(),
        "a, b"
    );
    assert_eq!(
        PropertyValue::NumberRange {
            min: Decimal::new(1, 0),
            max: Decimal::new(9, 0)
        }
        .to_string(),
        "1 - 9"
    );
}

#[test]
fn search_text_is_lowercased() {
    assert_eq!(PropertyValue::Text("Alice Smith".into()).search_text(), "alice smith");
}

// ── From impls ───────────────────────────────────────────────────

#[test]
fn from_impls_pick_the_right_variant() {
    assert_eq!(PropertyValue::from("x"), PropertyValue::Text("x".into()));
    assert_eq!(
        PropertyValue::from(Decimal::new(3, 0)),
        PropertyValue::Number(Decimal::new(3, 0))
    );
    assert_eq!(PropertyValue::from(true), PropertyValue::Boolean(true));
    assert_eq!(
        PropertyValue::from(vec!["a".to_string()]),
        PropertyValue::Multiple(vec!["a".into()])
    );
}

// ── Serde shape ──────────────────────────────────────────────────

#[test]
fn serde_shape_is_kind_value_tagged() {
    let v = PropertyValue::Text("hello".into());
    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json["kind"], "text");
    assert_eq!(json["value"], "hello");
}

#[test]
fn range_serde_shape_nests_min_max() {
    let v = PropertyValue::NumberRange {
        min: Decimal::new(1, 0),
        max: Decimal::new(2, 0),
    };
    let json = serde_json::to_value(&v).unwrap();
    assert_eq!(json["kind"], "number_range");
    assert!(json["value"]["min"].is_string() || json["value"]["min"].is_number());
}

#[test]
fn value_serde_roundtrip_all_variants() {
    let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let values = vec![
        PropertyValue::Text("t".into()),
        PropertyValue::Number(Decimal::new(1234, 2)),
        PropertyValue::Date(date),
        PropertyValue::Boolean(true),
        PropertyValue::Media(vec![RowMedia::inline("a.png", "image/png", "AAAA")]),
        PropertyValue::Multiple(vec!["x".into(), "y".into()]),
        PropertyValue::NumberRange {
            min: Decimal::new(1, 0),
            max: Decimal::new(5, 0),
        },
        PropertyValue::DateRange {
            min: date,
            max: date,
        },
    ];
    for v in values {
        let json = serde_json::to_string(&v).unwrap();
        let parsed: PropertyValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, v, "round-trip failed for {json}");
    }
}

// ── RowMedia ─────────────────────────────────────────────────────

#[test]
fn inline_media_is_pending_until_uploaded() {
    let mut media = RowMedia::inline("doc.pdf", "application/pdf", "JVBERi0=");
    assert!(media.is_pending());

    media.url = Some("https://files.example.com/doc.pdf".into());
    assert!(!media.is_pending());
}

#[test]
fn media_serde_omits_absent_fields() {
    let media = RowMedia::inline("a.png", "image/png", "AAAA");
    let json = serde_json::to_value(&media).unwrap();
    assert!(json.get("url").is_none());
    assert!(json.get("bucket").is_none());
    assert!(json.get("title").is_none());
    assert_eq!(json["content"], "AAAA");
}
