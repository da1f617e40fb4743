#![forbid(unsafe_code)]

//! Markup to mindmap tree extraction (headless).
//!
//! Pipeline: HTML (or markdown) → [`TreeBuilder`] → [`ContentNode`] → [`convert_node`] →
//! [`simplify_with_title`] → [`PayloadNode`], ready for layout.
//!
//! Design goals:
//! - broken markup never breaks the caller (empty tree instead of an error)
//! - deterministic outputs, no rendering surface required

pub mod builder;
pub mod config;
pub mod convert;
pub mod directive;
pub mod error;
pub mod html;
pub mod markdown;
pub mod selector;
pub mod simplify;
pub mod tree;
pub mod wrap;

pub use builder::{BuildOptions, RuleAction, SelectorRule, TreeBuilder};
pub use config::{
    ColorScheme, DeriveFlags, MindmapOptions, RawOptions, derive_options, derive_options_from_json,
};
pub use convert::convert_node;
pub use directive::{DIRECTIVE_PREFIX, Directive, fold_from_directives, strip_directive_comments};
pub use error::{Error, Result};
pub use markdown::markdown_to_html;
pub use simplify::{simplify, simplify_with_title};
pub use tree::{ContentNode, Fold, Level, Payload, PayloadNode};
pub use wrap::{WrapBlock, find_wrap_blocks};

/// Runs the whole extraction pipeline.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    builder: TreeBuilder,
}

impl Transformer {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            builder: TreeBuilder::new(options),
        }
    }

    /// HTML to a simplified payload tree whose root falls back to `title` when it has no content.
    pub fn transform(&self, html: &str, title: Option<&str>) -> PayloadNode {
        let root = self.builder.build(html);
        simplify_with_title(convert_node(&root), title.unwrap_or_default())
    }

    pub fn transform_markdown(&self, markdown: &str, title: Option<&str>) -> PayloadNode {
        self.transform(&markdown_to_html(markdown), title)
    }

    pub fn transform_wrap(&self, block: &WrapBlock) -> PayloadNode {
        self.transform(&block.inner_html, block.title())
    }
}

#[cfg(test)]
mod tests;
