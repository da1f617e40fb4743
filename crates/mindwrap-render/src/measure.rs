//! Node content measurement.
//!
//! A node is measured twice: once without wrapping to find the natural single-line width, and
//! once wrapped at that width (capped by `maxWidth`) to find the height. Lists hug their content
//! while long paragraphs wrap at the cap.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WrapMode {
    NoWrap,
    /// Wrap lines at the given column width (pixels).
    Wrap(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSize {
    pub width: f64,
    pub height: f64,
}

/// Renders node HTML off-screen and reports its box.
pub trait NodeMeasurer {
    fn measure(&self, html: &str, mode: WrapMode) -> ContentSize;
}

/// Measures a node the way the layout expects: `[ceil(width) + 1, max(ceil(height), min_height)]`.
pub fn measure_node(
    measurer: &dyn NodeMeasurer,
    html: &str,
    max_width: f64,
    node_min_height: f64,
) -> [f64; 2] {
    let natural = measurer.measure(html, WrapMode::NoWrap);
    let column = if max_width > 0.0 {
        natural.width.min(max_width)
    } else {
        natural.width
    };
    let wrapped = measurer.measure(html, WrapMode::Wrap(column));
    [
        column.ceil() + 1.0,
        wrapped.height.ceil().max(node_min_height),
    ]
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("valid regex"))
}

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|h[1-6]|pre|blockquote)>").expect("valid regex")
    })
}

fn img_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid regex"))
}

fn dimension_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\b(width|height)\s*=\s*"?([0-9]+(?:\.[0-9]+)?)"?"#).expect("valid regex")
    })
}

/// Deterministic measurer for headless use and tests.
///
/// Text width is `display columns × font_size × char_width_factor`; each line is
/// `font_size × line_height_factor` tall. Images with explicit `width`/`height` attributes
/// contribute their box.
#[derive(Debug, Clone, Default)]
pub struct DeterministicMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
    pub font_size: f64,
}

impl DeterministicMeasurer {
    fn factors(&self) -> (f64, f64, f64) {
        let char_width_factor = if self.char_width_factor == 0.0 {
            0.6
        } else {
            self.char_width_factor
        };
        let line_height_factor = if self.line_height_factor == 0.0 {
            1.2
        } else {
            self.line_height_factor
        };
        let font_size = if self.font_size <= 0.0 {
            16.0
        } else {
            self.font_size
        };
        (char_width_factor, line_height_factor, font_size)
    }

    /// Plain-text lines of an HTML fragment.
    pub fn text_lines(html: &str) -> Vec<String> {
        let with_breaks = line_break_regex().replace_all(html, "\n");
        let text = tag_regex().replace_all(&with_breaks, "");
        let text = htmlize::unescape(&*text);
        let lines: Vec<String> = text
            .split('\n')
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();
        let trimmed: Vec<String> = {
            let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
            let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
            lines[start..end].to_vec()
        };
        if trimmed.is_empty() {
            vec![String::new()]
        } else {
            trimmed
        }
    }

    fn image_boxes(html: &str) -> Vec<(f64, f64)> {
        img_regex()
            .find_iter(html)
            .map(|tag| {
                let mut w = 0.0;
                let mut h = 0.0;
                for caps in dimension_regex().captures_iter(tag.as_str()) {
                    let value = caps[2].parse::<f64>().unwrap_or(0.0);
                    if &caps[1] == "width" {
                        w = value;
                    } else {
                        h = value;
                    }
                }
                (w, h)
            })
            .collect()
    }

    fn wrap_line(line: &str, column_chars: usize) -> usize {
        if column_chars == 0 || line.width() <= column_chars {
            return 1;
        }
        let mut lines = 1usize;
        let mut current = 0usize;
        for word in line.split(' ') {
            let w = word.width();
            let needed = if current == 0 { w } else { current + 1 + w };
            if needed <= column_chars || current == 0 {
                current = needed;
            } else {
                lines += 1;
                current = w;
            }
            while current > column_chars {
                lines += 1;
                current -= column_chars;
            }
        }
        lines
    }
}

impl NodeMeasurer for DeterministicMeasurer {
    fn measure(&self, html: &str, mode: WrapMode) -> ContentSize {
        let (char_width_factor, line_height_factor, font_size) = self.factors();
        let char_width = font_size * char_width_factor;
        let line_height = font_size * line_height_factor;

        let lines = Self::text_lines(html);
        let images = Self::image_boxes(html);
        let has_text = lines.iter().any(|l| !l.is_empty());

        let text_width = lines
            .iter()
            .map(|l| l.width() as f64 * char_width)
            .fold(0.0, f64::max);
        let image_width = images.iter().map(|(w, _)| *w).fold(0.0, f64::max);
        let image_height: f64 = images.iter().map(|(_, h)| *h).sum();

        let (width, line_count) = match mode {
            WrapMode::NoWrap => (text_width, lines.len()),
            WrapMode::Wrap(column) => {
                let column_chars = (column / char_width + 1e-9).floor().max(1.0) as usize;
                let count = lines
                    .iter()
                    .map(|l| Self::wrap_line(l, column_chars))
                    .sum::<usize>();
                (text_width.min(column.max(char_width)), count)
            }
        };
        let text_height = if has_text || images.is_empty() {
            line_count as f64 * line_height
        } else {
            0.0
        };

        ContentSize {
            width: width.max(image_width),
            height: text_height + image_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_lines_strip_markup_and_split_on_breaks() {
        assert_eq!(
            DeterministicMeasurer::text_lines("<strong>a</strong> &amp; b<br />c"),
            vec!["a & b".to_string(), "c".to_string()]
        );
        assert_eq!(
            DeterministicMeasurer::text_lines("<p>x</p>\n"),
            vec!["x".to_string()]
        );
        assert_eq!(DeterministicMeasurer::text_lines(""), vec![String::new()]);
    }

    #[test]
    fn natural_width_is_single_line() {
        let m = DeterministicMeasurer::default();
        let size = m.measure("hello world", WrapMode::NoWrap);
        assert_eq!(size.width, 11.0 * 16.0 * 0.6);
        assert!((size.height - 16.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn wrapping_adds_lines() {
        let m = DeterministicMeasurer::default();
        let char_width = 16.0 * 0.6;
        let size = m.measure("aaaa bbbb cccc", WrapMode::Wrap(9.0 * char_width));
        assert!((size.height - 2.0 * 16.0 * 1.2).abs() < 1e-9);
        assert!(size.width <= 9.0 * char_width);
    }

    #[test]
    fn measure_node_caps_width_and_applies_min_height() {
        let m = DeterministicMeasurer::default();
        let [w, h] = measure_node(&m, "a", 0.0, 40.0);
        assert_eq!(w, (16.0f64 * 0.6).ceil() + 1.0);
        assert_eq!(h, 40.0);

        let long = "word ".repeat(40);
        let [w, h] = measure_node(&m, long.trim_end(), 200.0, 16.0);
        assert_eq!(w, 201.0);
        assert!(h > 16.0 * 1.2);
    }

    #[test]
    fn images_contribute_their_box() {
        let m = DeterministicMeasurer::default();
        let size = m.measure(r#"<img src="a.png" width="120" height="80" />"#, WrapMode::NoWrap);
        assert_eq!(size.width, 120.0);
        assert_eq!(size.height, 80.0);
    }
}
