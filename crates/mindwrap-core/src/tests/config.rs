use crate::config::{parse_float_prefix, parse_int_prefix, raw_from_dataset};
use crate::*;
use serde_json::json;

#[test]
fn int_prefix_follows_parse_int() {
    assert_eq!(parse_int_prefix(" 12px"), 12.0);
    assert_eq!(parse_int_prefix("-3"), -3.0);
    assert_eq!(parse_int_prefix("+7.9"), 7.0);
    assert!(parse_int_prefix("abc").is_nan());
    assert!(parse_int_prefix("").is_nan());
    assert!(parse_int_prefix("-").is_nan());
}

#[test]
fn float_prefix_follows_parse_float() {
    assert_eq!(parse_float_prefix("0.8x"), 0.8);
    assert_eq!(parse_float_prefix("1.5e3px"), 1500.0);
    assert_eq!(parse_float_prefix(".5"), 0.5);
    assert_eq!(parse_float_prefix("-.25"), -0.25);
    assert_eq!(parse_float_prefix("2e"), 2.0);
    assert_eq!(parse_float_prefix("3."), 3.0);
    assert_eq!(parse_float_prefix("Infinity"), f64::INFINITY);
    assert!(parse_float_prefix("x1").is_nan());
    assert!(parse_float_prefix(".").is_nan());
}

#[test]
fn dataset_strings_are_coerced_per_declared_kind() {
    let raw = raw_from_dataset([
        ("title", "Plan"),
        ("duration", "300ms"),
        ("maxWidth", "abc"),
        ("zoom", "FALSE"),
        ("pan", "True"),
        ("fitRatio", "0.8"),
        ("color", "#f00, #0f0 ,"),
        ("colorFreezeLevel", "2"),
        ("unknownKey", "x"),
    ]);
    let options = derive_options(&raw, DeriveFlags { use_default: false });

    assert_eq!(options.title.as_deref(), Some("Plan"));
    assert_eq!(options.duration, Some(300.0));
    assert!(options.max_width.is_some_and(f64::is_nan));
    assert_eq!(options.zoom, Some(false));
    assert_eq!(options.pan, Some(true));
    assert_eq!(options.fit_ratio, Some(0.8));
    assert_eq!(
        options.color,
        Some(ColorScheme::Ordinal(vec!["#f00".into(), "#0f0".into()]))
    );
    assert_eq!(options.color_freeze_level, Some(2.0));
    assert_eq!(options.auto_fit, None);
}

#[test]
fn defaults_are_merged_under_given_values() {
    let raw = raw_from_dataset([("spacingVertical", "10")]);
    let options = derive_options(&raw, DeriveFlags::default());
    assert_eq!(options.spacing_vertical, Some(10.0));
    assert_eq!(options.spacing_horizontal, Some(80.0));
    assert_eq!(options.auto_fit, Some(true));
    assert_eq!(options.initial_expand_level, Some(-1.0));
    assert_eq!(options.fit_ratio, Some(0.95));
}

#[test]
fn json_values_keep_native_types() {
    let options = derive_options_from_json(
        r#"{"zoom": 0, "pan": false, "autoFit": 1, "duration": 120.7, "color": ["red"], "title": 5, "height": null}"#,
        DeriveFlags { use_default: false },
    )
    .unwrap();
    assert_eq!(options.zoom, Some(false));
    assert_eq!(options.pan, Some(false));
    assert_eq!(options.auto_fit, Some(true));
    assert_eq!(options.duration, Some(120.0));
    assert_eq!(options.color, Some(ColorScheme::Solid("red".into())));
    assert_eq!(options.title.as_deref(), Some("5"));
    assert_eq!(options.height, None);
}

#[test]
fn invalid_json_is_reported() {
    assert!(matches!(
        derive_options_from_json("{", DeriveFlags::default()),
        Err(Error::Json(_))
    ));
}

#[test]
fn overlay_only_copies_set_fields() {
    let mut base = MindmapOptions::defaults();
    let patch = MindmapOptions {
        duration: Some(0.0),
        ..MindmapOptions::default()
    };
    base.overlay(&patch);
    assert_eq!(base.duration, Some(0.0));
    assert_eq!(base.padding_x, Some(8.0));
}

#[test]
fn options_serialize_with_camel_case_keys() {
    let options = MindmapOptions {
        max_width: Some(300.0),
        color: Some(ColorScheme::Category10),
        ..MindmapOptions::default()
    };
    assert_eq!(
        serde_json::to_value(&options).unwrap(),
        json!({"color": "category10", "maxWidth": 300.0})
    );
}
