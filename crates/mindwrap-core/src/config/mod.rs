//! Author-facing mindmap options and their coercion from loosely-typed input.
//!
//! Options arrive either from `data-*` attributes (always strings) or from JSON. Each declared
//! field has a fixed kind and is coerced with JavaScript-like `parseInt`/`parseFloat` rules; a
//! numeric field that does not start with a number is kept as `f64::NAN` so that consumers can
//! tell "given but malformed" from "absent" and fall back to a default.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type RawOptions = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Color,
    /// Integer parsed from the leading digits.
    Number,
    Float,
    Boolean,
}

/// Declared options. `color` precedes `colorFreezeLevel`, which refines it.
pub const ALLOWED_FIELDS: &[(&str, OptionKind)] = &[
    ("title", OptionKind::String),
    ("color", OptionKind::Color),
    ("colorFreezeLevel", OptionKind::Number),
    ("autoFit", OptionKind::Boolean),
    ("scrollForPan", OptionKind::Boolean),
    ("pan", OptionKind::Boolean),
    ("toggleRecursively", OptionKind::Boolean),
    ("zoom", OptionKind::Boolean),
    ("duration", OptionKind::Number),
    ("initialExpandLevel", OptionKind::Number),
    ("maxWidth", OptionKind::Number),
    ("paddingX", OptionKind::Number),
    ("nodeMinHeight", OptionKind::Number),
    ("spacingHorizontal", OptionKind::Number),
    ("spacingVertical", OptionKind::Number),
    ("fitRatio", OptionKind::Float),
    ("maxHeight", OptionKind::Number),
    ("height", OptionKind::Number),
];

pub fn option_kind(key: &str) -> Option<OptionKind> {
    ALLOWED_FIELDS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

pub const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorScheme {
    Solid(String),
    /// Colors handed out in order of first use, cycling.
    Ordinal(Vec<String>),
    #[default]
    Category10,
}

impl ColorScheme {
    /// One color is solid, more are ordinal; an empty list yields `None`.
    pub fn from_list(colors: Vec<String>) -> Option<Self> {
        match colors.len() {
            0 => None,
            1 => colors.into_iter().next().map(Self::Solid),
            _ => Some(Self::Ordinal(colors)),
        }
    }

    pub fn palette(&self) -> Vec<String> {
        match self {
            Self::Solid(color) => vec![color.clone()],
            Self::Ordinal(colors) => colors.clone(),
            Self::Category10 => CATEGORY10.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindmapOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorScheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_freeze_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_for_pan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_recursively: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_expand_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_min_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_horizontal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_vertical: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_ratio: Option<f64>,
}

macro_rules! overlay_fields {
    ($dst:expr, $src:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$src.$field {
                $dst.$field = Some(value.clone());
            }
        )+
    };
}

impl MindmapOptions {
    /// Built-in defaults, as merged by [`derive_options`] when `use_default` is set.
    pub fn defaults() -> Self {
        Self {
            auto_fit: Some(true),
            duration: Some(500.0),
            fit_ratio: Some(0.95),
            max_width: Some(0.0),
            node_min_height: Some(16.0),
            padding_x: Some(8.0),
            scroll_for_pan: Some(false),
            spacing_horizontal: Some(80.0),
            spacing_vertical: Some(5.0),
            initial_expand_level: Some(-1.0),
            zoom: Some(true),
            pan: Some(true),
            toggle_recursively: Some(false),
            ..Self::default()
        }
    }

    /// Copies every field set in `other` over `self`.
    pub fn overlay(&mut self, other: &MindmapOptions) {
        overlay_fields!(
            self,
            other,
            title,
            color,
            color_freeze_level,
            auto_fit,
            scroll_for_pan,
            pan,
            zoom,
            toggle_recursively,
            duration,
            initial_expand_level,
            max_width,
            max_height,
            height,
            padding_x,
            node_min_height,
            spacing_horizontal,
            spacing_vertical,
            fit_ratio,
        );
    }

    pub fn merged(&self, other: &MindmapOptions) -> Self {
        let mut out = self.clone();
        out.overlay(other);
        out
    }

    fn set(&mut self, key: &str, value: Coerced) {
        match (key, value) {
            ("title", Coerced::String(v)) => self.title = Some(v),
            ("color", Coerced::Color(v)) => self.color = Some(v),
            ("colorFreezeLevel", Coerced::Number(v)) => self.color_freeze_level = Some(v),
            ("autoFit", Coerced::Boolean(v)) => self.auto_fit = Some(v),
            ("scrollForPan", Coerced::Boolean(v)) => self.scroll_for_pan = Some(v),
            ("pan", Coerced::Boolean(v)) => self.pan = Some(v),
            ("zoom", Coerced::Boolean(v)) => self.zoom = Some(v),
            ("toggleRecursively", Coerced::Boolean(v)) => self.toggle_recursively = Some(v),
            ("duration", Coerced::Number(v)) => self.duration = Some(v),
            ("initialExpandLevel", Coerced::Number(v)) => self.initial_expand_level = Some(v),
            ("maxWidth", Coerced::Number(v)) => self.max_width = Some(v),
            ("maxHeight", Coerced::Number(v)) => self.max_height = Some(v),
            ("height", Coerced::Number(v)) => self.height = Some(v),
            ("paddingX", Coerced::Number(v)) => self.padding_x = Some(v),
            ("nodeMinHeight", Coerced::Number(v)) => self.node_min_height = Some(v),
            ("spacingHorizontal", Coerced::Number(v)) => self.spacing_horizontal = Some(v),
            ("spacingVertical", Coerced::Number(v)) => self.spacing_vertical = Some(v),
            ("fitRatio", Coerced::Number(v)) => self.fit_ratio = Some(v),
            (key, _) => tracing::trace!(key, "option kind mismatch; dropped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveFlags {
    /// Start from [`MindmapOptions::defaults`] instead of an empty set.
    pub use_default: bool,
}

impl Default for DeriveFlags {
    fn default() -> Self {
        Self { use_default: true }
    }
}

enum Coerced {
    String(String),
    Color(ColorScheme),
    Number(f64),
    Boolean(bool),
}

/// Coerces a raw option bag into typed options. Unknown keys and `null` values are dropped.
pub fn derive_options(raw: &RawOptions, flags: DeriveFlags) -> MindmapOptions {
    let mut out = if flags.use_default {
        MindmapOptions::defaults()
    } else {
        MindmapOptions::default()
    };

    for (key, value) in raw {
        let Some(kind) = option_kind(key) else {
            tracing::trace!(key = %key, "unknown option dropped");
            continue;
        };
        if value.is_null() {
            continue;
        }
        let coerced = match kind {
            OptionKind::String => Coerced::String(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            OptionKind::Color => match coerce_color(value) {
                Some(scheme) => Coerced::Color(scheme),
                None => continue,
            },
            OptionKind::Number => Coerced::Number(coerce_int(value)),
            OptionKind::Float => Coerced::Number(coerce_float(value)),
            OptionKind::Boolean => Coerced::Boolean(coerce_bool(value)),
        };
        out.set(key, coerced);
    }
    out
}

/// Parses options given as a JSON object.
pub fn derive_options_from_json(json: &str, flags: DeriveFlags) -> crate::Result<MindmapOptions> {
    let raw: RawOptions = serde_json::from_str(json)?;
    Ok(derive_options(&raw, flags))
}

/// Builds a raw option bag from `data-*` attribute values.
pub fn raw_from_dataset<'a>(dataset: impl IntoIterator<Item = (&'a str, &'a str)>) -> RawOptions {
    dataset
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

fn coerce_color(value: &Value) -> Option<ColorScheme> {
    let colors: Vec<String> = match value {
        Value::String(s) => s.split(',').map(|c| c.trim().to_string()).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
            .collect(),
        _ => return None,
    };
    ColorScheme::from_list(colors.into_iter().filter(|c| !c.is_empty()).collect())
}

fn coerce_int(value: &Value) -> f64 {
    match value {
        Value::String(s) => parse_int_prefix(s),
        Value::Number(n) => n.as_f64().map(f64::trunc).unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn coerce_float(value: &Value) -> f64 {
    match value {
        Value::String(s) => parse_float_prefix(s),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        other => {
            let n = coerce_int(other);
            !n.is_nan() && n != 0.0
        }
    }
}

fn split_sign(s: &str) -> (f64, &str) {
    match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    }
}

/// `parseInt(s, 10)`: leading whitespace, optional sign, then as many decimal digits as present.
pub fn parse_int_prefix(s: &str) -> f64 {
    let (sign, rest) = split_sign(s.trim_start());
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return f64::NAN;
    }
    rest[..digits_len]
        .parse::<f64>()
        .map(|v| sign * v)
        .unwrap_or(f64::NAN)
}

/// `parseFloat(s)`: the longest leading decimal literal (with optional fraction and exponent).
pub fn parse_float_prefix(s: &str) -> f64 {
    let (sign, rest) = split_sign(s.trim_start());
    if rest.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }
    let bytes = rest.as_bytes();
    let mut end = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    let mut digits = end;
    if bytes.get(end) == Some(&b'.') {
        let frac = bytes[end + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        digits += frac;
        end += 1 + frac;
    }
    if digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    rest[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .map(|v| sign * v)
        .unwrap_or(f64::NAN)
}

/// Treats the NaN sentinel as absent.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
