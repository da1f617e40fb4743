use mindwrap_core::config::finite;
use mindwrap_core::{ColorScheme, MindmapOptions};
use serde::{Deserialize, Serialize};

/// Longest transition, in milliseconds, an author can configure.
pub const MAX_DURATION: f64 = 60_000.0;

/// Fully resolved options used by the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOptions {
    pub title: Option<String>,
    pub color: ColorScheme,
    /// Paths are truncated to this many segments before color lookup.
    pub color_freeze_level: Option<usize>,
    pub auto_fit: bool,
    pub scroll_for_pan: bool,
    pub pan: bool,
    pub zoom: bool,
    pub toggle_recursively: bool,
    /// Transition duration in milliseconds.
    pub duration: f64,
    /// Nodes at or below this depth start folded; disabled when negative.
    pub initial_expand_level: i64,
    /// Content column cap in pixels; `0` disables it.
    pub max_width: f64,
    pub max_height: Option<f64>,
    pub height: Option<f64>,
    pub padding_x: f64,
    pub node_min_height: f64,
    pub spacing_horizontal: f64,
    pub spacing_vertical: f64,
    pub fit_ratio: f64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::resolve(&MindmapOptions::default())
    }
}

impl ViewOptions {
    /// Merges `options` with the built-in defaults. NaN sentinels fall back to the default.
    pub fn resolve(options: &MindmapOptions) -> Self {
        let defaults = MindmapOptions::defaults();
        let number = |value: Option<f64>, default: Option<f64>, fallback: f64| {
            finite(value).or(finite(default)).unwrap_or(fallback)
        };
        let flag = |value: Option<bool>, default: Option<bool>, fallback: bool| {
            value.or(default).unwrap_or(fallback)
        };

        Self {
            title: options.title.clone(),
            color: options.color.clone().unwrap_or_default(),
            color_freeze_level: finite(options.color_freeze_level)
                .filter(|v| *v >= 1.0)
                .map(|v| v as usize),
            auto_fit: flag(options.auto_fit, defaults.auto_fit, true),
            scroll_for_pan: flag(options.scroll_for_pan, defaults.scroll_for_pan, false),
            pan: flag(options.pan, defaults.pan, true),
            zoom: flag(options.zoom, defaults.zoom, true),
            toggle_recursively: flag(
                options.toggle_recursively,
                defaults.toggle_recursively,
                false,
            ),
            duration: number(options.duration, defaults.duration, 500.0).clamp(0.0, MAX_DURATION),
            initial_expand_level: number(
                options.initial_expand_level,
                defaults.initial_expand_level,
                -1.0,
            ) as i64,
            max_width: number(options.max_width, defaults.max_width, 0.0).max(0.0),
            max_height: finite(options.max_height).filter(|v| *v > 0.0),
            height: finite(options.height).filter(|v| *v > 0.0),
            padding_x: number(options.padding_x, defaults.padding_x, 8.0),
            node_min_height: number(options.node_min_height, defaults.node_min_height, 16.0),
            spacing_horizontal: number(
                options.spacing_horizontal,
                defaults.spacing_horizontal,
                80.0,
            ),
            spacing_vertical: number(options.spacing_vertical, defaults.spacing_vertical, 5.0),
            fit_ratio: number(options.fit_ratio, defaults.fit_ratio, 0.95),
        }
    }
}
