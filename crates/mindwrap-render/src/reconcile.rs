//! Keyed enter/update/exit matching between two render passes.

use crate::model::{
    LinkTransition, NodeTransition, PositionedLink, PositionedNode, RenderFrame, TransitionKind,
    link_horizontal,
};
use crate::{Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};

/// The node a pass animates from and to.
///
/// `x0`/`y0` is where the origin was last drawn; `x`/`y` is where it is now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub x0: f64,
    pub y0: f64,
    pub x_size: f64,
    pub y_size: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub nodes: Vec<NodeTransition>,
    pub links: Vec<LinkTransition>,
}

fn unique_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Result<FxHashSet<&'a str>> {
    let mut seen = FxHashSet::default();
    for key in keys {
        let fresh = seen.insert(key);
        debug_assert!(fresh, "duplicate render key {key}");
        if !fresh {
            return Err(Error::KeyCollision {
                key: key.to_string(),
            });
        }
    }
    Ok(seen)
}

/// Matches `nodes`/`links` against `previous` by key.
///
/// Entering nodes start collapsed at the origin's previous position; exiting nodes collapse into
/// the origin's new position. Links are keyed by their target node.
pub fn reconcile(
    previous: Option<&RenderFrame>,
    nodes: &[PositionedNode],
    links: &[PositionedLink],
    anchor: &Anchor,
    spacing_horizontal: f64,
) -> Result<Reconciliation> {
    let node_keys = unique_keys(nodes.iter().map(|n| n.key.as_str()))?;
    let link_keys = unique_keys(links.iter().map(|l| l.key.as_str()))?;

    let empty = RenderFrame::default();
    let previous = previous.unwrap_or(&empty);
    let prev_nodes: FxHashMap<&str, &PositionedNode> =
        previous.nodes.iter().map(|n| (n.key.as_str(), n)).collect();
    let prev_links: FxHashMap<&str, &PositionedLink> =
        previous.links.iter().map(|l| (l.key.as_str(), l)).collect();

    let mut out = Reconciliation::default();

    for node in nodes {
        let (kind, from) = match prev_nodes.get(node.key.as_str()) {
            Some(prev) => (TransitionKind::Update, prev.translate),
            None => (
                TransitionKind::Enter,
                [
                    anchor.y0 + anchor.y_size - node.y_size,
                    anchor.x0 + anchor.x_size / 2.0 - node.x_size,
                ],
            ),
        };
        out.nodes.push(NodeTransition {
            key: node.key.clone(),
            kind,
            from,
            to: node.translate,
        });
    }
    for prev in &previous.nodes {
        if node_keys.contains(prev.key.as_str()) {
            continue;
        }
        out.nodes.push(NodeTransition {
            key: prev.key.clone(),
            kind: TransitionKind::Exit,
            from: prev.translate,
            to: [
                anchor.y + anchor.y_size - prev.y_size,
                anchor.x + anchor.x_size / 2.0 - prev.x_size,
            ],
        });
    }

    let entering = {
        let point = [
            anchor.y0 + anchor.y_size - spacing_horizontal,
            anchor.x0 + anchor.x_size / 2.0,
        ];
        link_horizontal(point, point)
    };
    let exiting = {
        let point = [
            anchor.y + anchor.y_size - spacing_horizontal,
            anchor.x + anchor.x_size / 2.0,
        ];
        link_horizontal(point, point)
    };

    for link in links {
        let (kind, from) = match prev_links.get(link.key.as_str()) {
            Some(prev) => (TransitionKind::Update, prev.d.clone()),
            None => (TransitionKind::Enter, entering.clone()),
        };
        out.links.push(LinkTransition {
            key: link.key.clone(),
            kind,
            from,
            to: link.d.clone(),
        });
    }
    for prev in &previous.links {
        if link_keys.contains(prev.key.as_str()) {
            continue;
        }
        out.links.push(LinkTransition {
            key: prev.key.clone(),
            kind: TransitionKind::Exit,
            from: prev.d.clone(),
            to: exiting.clone(),
        });
    }

    Ok(out)
}
