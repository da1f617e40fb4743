use crate::tree::PayloadNode;

/// Removes structural wrapper nodes.
///
/// Per node: a content-less node with a single child is replaced by that child, then a single
/// content-less child is elided and its children adopted. Both loops run before recursing, so
/// alternating chains collapse fully.
pub fn simplify(node: PayloadNode) -> PayloadNode {
    let mut node = node;
    while node.content.is_empty() && node.children.len() == 1 {
        node = node.children.remove(0);
    }
    while node.children.len() == 1 && node.children[0].content.is_empty() {
        let only = node.children.remove(0);
        node.children = only.children;
    }
    node.children = node.children.into_iter().map(simplify).collect();
    node
}

/// Simplifies and fills an empty root content with `title`.
pub fn simplify_with_title(node: PayloadNode, title: &str) -> PayloadNode {
    let mut root = simplify(node);
    if root.content.is_empty() {
        root.content = title.to_string();
    }
    root
}
