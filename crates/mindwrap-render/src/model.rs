use serde::{Deserialize, Serialize};

/// Extent of the laid-out tree in layout space.
///
/// `x` is the sibling axis (drawn vertically) and `y` the depth axis (drawn horizontally).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Drawn width: the depth-axis extent.
    pub fn width(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Drawn height: the sibling-axis extent.
    pub fn height(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }
}

/// Render state attached to a node by `initializeData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub depth: usize,
    pub id: usize,
    pub path: String,
    /// `[content width, content height]`.
    pub size: [f64; 2],
    pub key: String,
    /// Last rendered position, used as the collapse target of descendants.
    pub x0: Option<f64>,
    pub y0: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLine {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
    pub stroke: String,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCircle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: String,
    pub stroke: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeForeignObject {
    pub x: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub key: String,
    pub path: String,
    pub depth: usize,
    pub id: usize,
    pub content: String,
    /// Layout coordinates: `x` is the sibling-axis center, `y` the depth-axis start.
    pub x: f64,
    pub y: f64,
    pub x_size: f64,
    pub y_size: f64,
    /// Screen translation of the node group, `(y, x - x_size / 2)`.
    pub translate: [f64; 2],
    pub color: String,
    pub folded: bool,
    pub has_children: bool,
    pub line: NodeLine,
    pub circle: Option<NodeCircle>,
    pub foreign_object: NodeForeignObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedLink {
    /// Key of the target node.
    pub key: String,
    pub source_path: String,
    pub target_path: String,
    pub depth: usize,
    pub source: [f64; 2],
    pub target: [f64; 2],
    /// Horizontal cubic link path.
    pub d: String,
    pub stroke: String,
    pub stroke_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionKind {
    Enter,
    Update,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTransition {
    pub key: String,
    pub kind: TransitionKind,
    pub from: [f64; 2],
    pub to: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTransition {
    pub key: String,
    pub kind: TransitionKind,
    pub from: String,
    pub to: String,
}

/// Output of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub nodes: Vec<PositionedNode>,
    pub links: Vec<PositionedLink>,
    pub bounds: Bounds,
    /// Path of the node whose toggle triggered this pass, if any.
    pub origin_path: Option<String>,
    pub node_transitions: Vec<NodeTransition>,
    pub link_transitions: Vec<LinkTransition>,
    /// Transition duration in milliseconds.
    pub duration: f64,
    /// Whether the pass ended with an automatic fit.
    pub fit: bool,
}

impl RenderFrame {
    pub fn node(&self, path: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    pub fn link_to(&self, path: &str) -> Option<&PositionedLink> {
        self.links.iter().find(|l| l.target_path == path)
    }
}

/// `M sx,sy C mx,sy mx,ty tx,ty` in screen space, taking `[y, x]` layout points.
pub fn link_horizontal(source: [f64; 2], target: [f64; 2]) -> String {
    let [sx, sy] = source;
    let [tx, ty] = target;
    let mx = (sx + tx) / 2.0;
    format!("M{sx},{sy}C{mx},{sy},{mx},{ty},{tx},{ty}")
}
