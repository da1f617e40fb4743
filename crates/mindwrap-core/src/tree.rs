use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Nesting rank used by the tree builder.
///
/// Lower ranks are "shallower": when siblings of different ranks compete for the same parent,
/// the shallowest rank wins and deeper siblings are dropped.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Level {
    #[default]
    None = 0,
    H1 = 1,
    H2 = 2,
    H3 = 3,
    H4 = 4,
    H5 = 5,
    H6 = 6,
    Block = 7,
    List = 8,
    ListItem = 9,
}

impl Level {
    /// Maps a lower-case tag name onto its nesting rank. Anything that is not a heading or a list
    /// element ranks as [`Level::Block`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "h4" => Self::H4,
            "h5" => Self::H5,
            "h6" => Self::H6,
            "ul" | "ol" => Self::List,
            "li" => Self::ListItem,
            _ => Self::Block,
        }
    }

    pub fn is_heading(self) -> bool {
        self > Self::None && self <= Self::H6
    }
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::H1,
            2 => Self::H2,
            3 => Self::H3,
            4 => Self::H4,
            5 => Self::H5,
            6 => Self::H6,
            7 => Self::Block,
            8 => Self::List,
            9 => Self::ListItem,
            other => return Err(format!("invalid level: {other}")),
        })
    }
}

/// A node produced by the tree builder.
///
/// `id` is unique within one build pass only (document order, root = 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub id: u32,
    pub tag: String,
    pub level: Level,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    /// `None` for nodes that cannot nest (leaf content); `Some` for containers, possibly empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ContentNode>>,
    pub children_level: Level,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, String>,
}

impl ContentNode {
    pub fn root() -> Self {
        Self {
            id: 0,
            tag: String::new(),
            level: Level::None,
            html: String::new(),
            parent: None,
            children: Some(Vec::new()),
            children_level: Level::None,
            comments: Vec::new(),
            data: IndexMap::new(),
        }
    }

    pub fn children(&self) -> &[ContentNode] {
        self.children.as_deref().unwrap_or_default()
    }
}

/// Fold flag carried by a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Fold {
    #[default]
    Expanded = 0,
    Collapsed = 1,
    /// Collapsed, and every descendant is implicitly collapsed as well.
    CollapsedRecursively = 2,
}

impl Fold {
    pub fn is_folded(self) -> bool {
        self != Self::Expanded
    }
}

impl From<Fold> for u8 {
    fn from(value: Fold) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Fold {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Expanded),
            1 => Ok(Self::Collapsed),
            2 => Ok(Self::CollapsedRecursively),
            other => Err(format!("invalid fold value: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fold: Option<Fold>,
    /// Custom annotations sourced from `data-*` attributes.
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.fold.is_none() && self.extra.is_empty()
    }

    pub fn fold(&self) -> Fold {
        self.fold.unwrap_or_default()
    }
}

/// The tree consumed by the layout engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadNode {
    pub content: String,
    #[serde(default)]
    pub children: Vec<PayloadNode>,
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub payload: Payload,
}

impl PayloadNode {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            children: Vec::new(),
            payload: Payload::default(),
        }
    }

    pub fn with_children(mut self, children: Vec<PayloadNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_fold(mut self, fold: Fold) -> Self {
        self.payload.fold = Some(fold);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(PayloadNode::count).sum::<usize>()
    }
}
