use crate::config::{RawOptions, raw_from_dataset};
use crate::html::{dataset, inner_html, parse_document, wrap_fragment};
use serde::{Deserialize, Serialize};

pub const WRAP_ATTRIBUTE: &str = "data-wrap";
pub const WRAP_NAME: &str = "markmap";

/// A `[wrap=markmap]` block found inside cooked HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapBlock {
    /// Position among the wrap blocks of the container, in document order.
    pub index: usize,
    pub inner_html: String,
    /// Dataset of the wrap element, without the `wrap` marker itself.
    pub attributes: RawOptions,
}

impl WrapBlock {
    pub fn title(&self) -> Option<&str> {
        self.attributes.get("title").and_then(|v| v.as_str())
    }
}

/// Finds wrap blocks in a container fragment. Unparsable markup yields no blocks.
pub fn find_wrap_blocks(container_html: &str) -> Vec<WrapBlock> {
    let xml = wrap_fragment(container_html);
    let doc = match parse_document(&xml) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(error = %err, "malformed container markup; no wrap blocks");
            return Vec::new();
        }
    };

    let blocks: Vec<WrapBlock> = doc
        .descendants()
        .filter(|n| n.is_element() && n.attribute(WRAP_ATTRIBUTE) == Some(WRAP_NAME))
        .enumerate()
        .map(|(index, node)| {
            let data = dataset(node);
            let attributes = raw_from_dataset(
                data.iter()
                    .filter(|(k, _)| k.as_str() != "wrap")
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
            WrapBlock {
                index,
                inner_html: inner_html(node),
                attributes,
            }
        })
        .collect();
    tracing::debug!(count = blocks.len(), "wrap blocks discovered");
    blocks
}
