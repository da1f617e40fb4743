use crate::directive::directive_value;
use crate::html::{
    dataset, element_children, outer_html, parse_document, tag_name, wrap_fragment,
};
use crate::selector::SelectorList;
use crate::tree::{ContentNode, Level};
use crate::Result;
use indexmap::IndexMap;
use std::sync::OnceLock;

pub const DEFAULT_SELECTOR: &str =
    "h1,h2,h3,h4,h5,h6,ul,ol,li,table,.md-table,pre,.image-wrapper,.lightbox-wrapper,p>img:only-child";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Leaf content, captured verbatim (outer HTML).
    Content,
    /// Visit the element children in place of the element itself.
    PassThrough,
    /// Content is the element's child nodes; later content nests below it.
    Heading,
    /// Nesting container whose element children are visited below it.
    List,
    /// Content is everything before the first nested list; nested lists become children.
    ListItem,
}

#[derive(Debug, Clone)]
pub struct SelectorRule {
    pub selector: SelectorList,
    pub action: RuleAction,
}

impl SelectorRule {
    pub fn new(selector: &str, action: RuleAction) -> Self {
        Self {
            selector: SelectorList::parse(selector),
            action,
        }
    }
}

/// Extraction rules. The first rule whose selector matches an element decides how it is handled.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Elements that may become nodes at all.
    pub selector: SelectorList,
    pub rules: Vec<SelectorRule>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            selector: SelectorList::parse(DEFAULT_SELECTOR),
            rules: vec![
                SelectorRule::new(
                    ".lightbox-wrapper,.image-wrapper,.md-table",
                    RuleAction::Content,
                ),
                SelectorRule::new("div,p,a.lightbox", RuleAction::PassThrough),
                SelectorRule::new("h1,h2,h3,h4,h5,h6", RuleAction::Heading),
                SelectorRule::new("ul,ol", RuleAction::List),
                SelectorRule::new("li", RuleAction::ListItem),
                SelectorRule::new("table,pre,p>img:only-child", RuleAction::Content),
            ],
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    html: String,
    comments: Vec<String>,
}

struct RuleResult<'a, 'input> {
    queue: Option<Vec<roxmltree::Node<'a, 'input>>>,
    nesting: bool,
    captured: Captured,
}

fn capture<'a, 'input: 'a>(
    nodes: impl IntoIterator<Item = roxmltree::Node<'a, 'input>>,
) -> Captured {
    let mut html = String::new();
    let mut comments = Vec::new();
    for node in nodes {
        if node.is_comment() {
            if let Some(value) = directive_value(node.text().unwrap_or_default()) {
                comments.push(value.to_string());
                continue;
            }
        }
        html.push_str(&outer_html(node));
    }
    html.truncate(html.trim_end().len());
    Captured { html, comments }
}

fn is_list(node: &roxmltree::Node<'_, '_>) -> bool {
    node.is_element() && matches!(tag_name(*node).as_str(), "ul" | "ol")
}

fn apply_rule<'a, 'input>(
    action: RuleAction,
    node: roxmltree::Node<'a, 'input>,
) -> RuleResult<'a, 'input> {
    match action {
        RuleAction::Content => RuleResult {
            queue: None,
            nesting: false,
            captured: capture([node]),
        },
        RuleAction::PassThrough => RuleResult {
            queue: Some(element_children(node).collect()),
            nesting: false,
            captured: Captured::default(),
        },
        RuleAction::Heading => RuleResult {
            queue: None,
            nesting: false,
            captured: capture(node.children()),
        },
        RuleAction::List => RuleResult {
            queue: Some(element_children(node).collect()),
            nesting: true,
            captured: Captured::default(),
        },
        RuleAction::ListItem => {
            let queue: Vec<_> = node.children().filter(is_list).collect();
            let captured = capture(node.children().take_while(|n| !is_list(n)));
            RuleResult {
                queue: Some(queue),
                nesting: true,
                captured,
            }
        }
    }
}

fn code_only_child() -> &'static SelectorList {
    static SELECTOR: OnceLock<SelectorList> = OnceLock::new();
    SELECTOR.get_or_init(|| SelectorList::parse("code:only-child"))
}

fn node_data(node: roxmltree::Node<'_, '_>) -> IndexMap<String, String> {
    let mut data = dataset(node);
    if code_only_child().query(node).is_some() {
        let first_code = node
            .descendants()
            .skip(1)
            .find(|d| d.is_element() && tag_name(*d) == "code");
        if let Some(code) = first_code {
            data.extend(dataset(code));
        }
    }
    data
}

#[derive(Debug)]
struct Slot {
    node: ContentNode,
    kids: Option<Vec<usize>>,
}

struct TreeDb<'o> {
    options: &'o BuildOptions,
    slots: Vec<Slot>,
    heading_stack: Vec<usize>,
    skipping_heading: Level,
}

impl<'o> TreeDb<'o> {
    fn new(options: &'o BuildOptions) -> Self {
        Self {
            options,
            slots: vec![Slot {
                node: ContentNode::root(),
                kids: Some(Vec::new()),
            }],
            heading_stack: Vec::new(),
            skipping_heading: Level::None,
        }
    }

    fn current_heading(&mut self, level: Level) -> usize {
        while let Some(&top) = self.heading_stack.last() {
            if self.slots[top].node.level >= level {
                self.heading_stack.pop();
            } else {
                return top;
            }
        }
        0
    }

    fn add_child(&mut self, parent: usize, mut node: ContentNode, nesting: bool) -> usize {
        let idx = self.slots.len();
        node.id = idx as u32;
        node.parent = Some(self.slots[parent].node.id);
        let level = node.level;
        self.slots.push(Slot {
            node,
            kids: nesting.then(Vec::new),
        });

        let parent = &mut self.slots[parent];
        if let Some(kids) = parent.kids.as_mut() {
            let recorded = parent.node.children_level;
            if recorded == Level::None || recorded > level {
                kids.clear();
                parent.node.children_level = level;
            }
            if parent.node.children_level == level {
                kids.push(idx);
            }
        }
        idx
    }

    fn check_nodes<'a, 'input: 'a>(
        &mut self,
        nodes: impl IntoIterator<Item = roxmltree::Node<'a, 'input>>,
        parent: Option<usize>,
    ) {
        for child in nodes {
            let action = self
                .options
                .rules
                .iter()
                .find(|rule| rule.selector.matches(child))
                .map(|rule| rule.action);
            let result = action.map(|action| apply_rule(action, child));

            if let Some(RuleResult {
                queue: Some(queue),
                nesting: false,
                ..
            }) = result
            {
                self.check_nodes(queue, parent);
                continue;
            }

            let tag = tag_name(child);
            let level = Level::from_tag(&tag);
            let Some(result) = result else {
                if level <= Level::H6 {
                    self.skipping_heading = level;
                }
                continue;
            };

            if self.skipping_heading > Level::None && level > self.skipping_heading {
                continue;
            }
            if !self.options.selector.matches(child) {
                continue;
            }
            self.skipping_heading = Level::None;

            let is_heading = level.is_heading();
            let node = ContentNode {
                id: 0,
                tag,
                level,
                html: result.captured.html,
                parent: None,
                children: None,
                children_level: Level::None,
                comments: result.captured.comments,
                data: node_data(child),
            };
            let parent_idx = match parent {
                Some(p) => p,
                None => self.current_heading(level),
            };
            let idx = self.add_child(parent_idx, node, result.queue.is_some() || is_heading);

            if is_heading {
                self.heading_stack.push(idx);
            }
            if let Some(queue) = result.queue {
                self.check_nodes(queue, Some(idx));
            }
        }
    }

    fn assemble(&self, idx: usize) -> ContentNode {
        let slot = &self.slots[idx];
        let mut node = slot.node.clone();
        node.children = slot
            .kids
            .as_ref()
            .map(|kids| kids.iter().map(|&k| self.assemble(k)).collect());
        node
    }
}

/// Turns HTML into a [`ContentNode`] tree, inferring nesting from heading levels and lists.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    options: BuildOptions,
}

impl TreeBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Builds the tree, falling back to an empty root when the markup cannot be parsed.
    pub fn build(&self, html: &str) -> ContentNode {
        match self.try_build(html) {
            Ok(root) => root,
            Err(err) => {
                tracing::warn!(error = %err, "malformed markup; using an empty tree");
                ContentNode::root()
            }
        }
    }

    pub fn try_build(&self, html: &str) -> Result<ContentNode> {
        let xml = wrap_fragment(html);
        let doc = parse_document(&xml)?;
        // A full document nests its own <body> inside the wrapper.
        let body = doc
            .descendants()
            .filter(|n| n.is_element() && tag_name(*n) == "body")
            .last()
            .unwrap_or_else(|| doc.root_element());

        let mut db = TreeDb::new(&self.options);
        db.check_nodes(element_children(body), None);
        let root = db.assemble(0);
        tracing::debug!(nodes = db.slots.len(), "content tree built");
        Ok(root)
    }
}
