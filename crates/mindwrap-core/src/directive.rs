//! Inline directive comments (`<!-- markmap: fold -->`).

use crate::tree::Fold;
use regex::Regex;
use std::sync::OnceLock;

pub const DIRECTIVE_PREFIX: &str = "markmap:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Collapse this node.
    Fold,
    /// Collapse this node and its whole subtree.
    FoldAll,
    Other(String),
}

impl Directive {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "fold" => Self::Fold,
            "foldAll" => Self::FoldAll,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Returns the trimmed directive value if `comment` (the text between `<!--` and `-->`) carries
/// the directive prefix.
pub fn directive_value(comment: &str) -> Option<&str> {
    comment
        .trim()
        .strip_prefix(DIRECTIVE_PREFIX)
        .map(str::trim)
}

/// `foldAll` takes precedence over `fold`.
pub fn fold_from_directives<S: AsRef<str>>(comments: &[S]) -> Option<Fold> {
    let parsed: Vec<Directive> = comments.iter().map(|c| Directive::parse(c.as_ref())).collect();
    if parsed.contains(&Directive::FoldAll) {
        Some(Fold::CollapsedRecursively)
    } else if parsed.contains(&Directive::Fold) {
        Some(Fold::Collapsed)
    } else {
        None
    }
}

fn directive_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--\s*markmap:.*?-->").expect("valid regex"))
}

/// Removes every directive comment from an HTML or markdown fragment.
pub fn strip_directive_comments(source: &str) -> String {
    directive_comment_regex().replace_all(source, "").into_owned()
}
