use mindwrap_core::ColorScheme;
use rustc_hash::FxHashMap;

/// Assigns node colors by path, handing out palette entries in order of first use.
#[derive(Debug, Clone, Default)]
pub struct ColorAssigner {
    scheme: ColorScheme,
    palette: Vec<String>,
    freeze_level: Option<usize>,
    seen: FxHashMap<String, usize>,
}

impl ColorAssigner {
    pub fn new(scheme: ColorScheme, freeze_level: Option<usize>) -> Self {
        Self {
            palette: scheme.palette(),
            scheme,
            freeze_level,
            seen: FxHashMap::default(),
        }
    }

    /// True when the assigner already reflects `scheme` and `freeze_level`.
    pub fn matches(&self, scheme: &ColorScheme, freeze_level: Option<usize>) -> bool {
        self.scheme == *scheme && self.freeze_level == freeze_level
    }

    pub fn color(&mut self, path: &str) -> String {
        if let ColorScheme::Solid(color) = &self.scheme {
            return color.clone();
        }
        if self.palette.is_empty() {
            return String::new();
        }
        let key = match self.freeze_level {
            Some(level) => path.split('.').take(level).collect::<Vec<_>>().join("."),
            None => path.to_string(),
        };
        let next = self.seen.len();
        let index = *self.seen.entry(key).or_insert(next);
        self.palette[index % self.palette.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindwrap_core::config::CATEGORY10;

    #[test]
    fn ordinal_assignment_follows_first_use_and_cycles() {
        let mut colors = ColorAssigner::new(
            ColorScheme::Ordinal(vec!["a".into(), "b".into()]),
            None,
        );
        assert_eq!(colors.color("1"), "a");
        assert_eq!(colors.color("1.2"), "b");
        assert_eq!(colors.color("1"), "a");
        assert_eq!(colors.color("1.3"), "a");
    }

    #[test]
    fn freeze_level_shares_colors_below_it() {
        let mut colors = ColorAssigner::new(ColorScheme::Category10, Some(2));
        let branch = colors.color("1.2");
        assert_eq!(branch, CATEGORY10[0]);
        assert_eq!(colors.color("1.2.5"), branch);
        assert_eq!(colors.color("1.3.4"), CATEGORY10[1]);
    }

    #[test]
    fn solid_color_ignores_path() {
        let mut colors = ColorAssigner::new(ColorScheme::Solid("#333".into()), Some(1));
        assert_eq!(colors.color("1.2.3"), "#333");
    }
}
