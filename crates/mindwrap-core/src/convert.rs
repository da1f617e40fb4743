use crate::directive::fold_from_directives;
use crate::tree::{ContentNode, Fold, Payload, PayloadNode};

/// Converts a built content tree into the payload tree consumed by layout.
///
/// `data-*` annotations become payload entries; a `fold` annotation is parsed into the typed
/// fold flag, and fold directives in comments override it.
pub fn convert_node(node: &ContentNode) -> PayloadNode {
    let mut payload = Payload::default();
    for (key, value) in &node.data {
        if key == "fold" {
            payload.fold = value
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(|v| Fold::try_from(v).ok());
            continue;
        }
        payload.extra.insert(key.clone(), value.clone());
    }
    if let Some(fold) = fold_from_directives(&node.comments) {
        payload.fold = Some(fold);
    }

    PayloadNode {
        content: node.html.clone(),
        children: node.children().iter().map(convert_node).collect(),
        payload,
    }
}
