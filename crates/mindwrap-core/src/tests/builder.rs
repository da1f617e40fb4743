use crate::*;
use proptest::prelude::*;

fn contents(nodes: &[PayloadNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.content.as_str()).collect()
}

#[test]
fn list_wins_over_loose_paragraph_under_a_heading() {
    let tree = Transformer::default().transform(
        "<h1>T</h1><p>loose</p><ul><li>a</li><li>b</li></ul>",
        None,
    );
    assert_eq!(tree.content, "T");
    assert_eq!(contents(&tree.children), vec!["a", "b"]);
}

#[test]
fn captured_block_outranks_list_regardless_of_order() {
    let builder = TreeBuilder::default();

    let root = builder.build("<h1>T</h1><table><tr><td>x</td></tr></table><ul><li>a</li></ul>");
    let h1 = &root.children()[0];
    assert_eq!(h1.children_level, Level::Block);
    assert_eq!(h1.children().len(), 1);
    assert_eq!(h1.children()[0].tag, "table");

    let root = builder.build("<h1>T</h1><ul><li>a</li></ul><table><tr><td>x</td></tr></table>");
    let h1 = &root.children()[0];
    assert_eq!(h1.children().len(), 1);
    assert_eq!(h1.children()[0].tag, "table");
}

#[test]
fn heading_stack_pops_to_nearest_shallower_heading() {
    let root = TreeBuilder::default()
        .build("<h1>a</h1><h2>b</h2><h3>c</h3><h2>d</h2><h1>e</h1>");
    let top: Vec<_> = root.children().iter().map(|n| n.html.as_str()).collect();
    assert_eq!(top, vec!["a", "e"]);

    let a = &root.children()[0];
    let second: Vec<_> = a.children().iter().map(|n| n.html.as_str()).collect();
    assert_eq!(second, vec!["b", "d"]);
    assert_eq!(a.children()[0].children()[0].html, "c");
    assert!(a.children()[1].children().is_empty());
}

#[test]
fn ids_follow_document_order_and_parents_point_at_containers() {
    let root = TreeBuilder::default().build("<h1>a</h1><ul><li>b</li></ul>");
    assert_eq!(root.id, 0);
    assert_eq!(root.parent, None);
    assert_eq!(root.level, Level::None);

    let h1 = &root.children()[0];
    let ul = &h1.children()[0];
    let li = &ul.children()[0];
    assert_eq!((h1.id, ul.id, li.id), (1, 2, 3));
    assert_eq!(h1.parent, Some(0));
    assert_eq!(ul.parent, Some(1));
    assert_eq!(li.parent, Some(2));
}

#[test]
fn list_item_content_stops_at_nested_list_and_extracts_directives() {
    let root = TreeBuilder::default()
        .build("<ul><li>item <!-- markmap: fold --><em>x</em><ul><li>sub</li></ul></li></ul>");
    let li = &root.children()[0].children()[0];
    assert_eq!(li.html, "item <em>x</em>");
    assert_eq!(li.comments, vec!["fold".to_string()]);
    assert_eq!(li.children()[0].children()[0].html, "sub");
}

#[test]
fn leaf_content_has_no_children_container() {
    let root = TreeBuilder::default().build("<h1>a</h1><pre><code>x</code></pre>");
    let pre = &root.children()[0].children()[0];
    assert_eq!(pre.tag, "pre");
    assert!(pre.children.is_none());
    assert_eq!(pre.html, "<pre><code>x</code></pre>");

    let h1 = &root.children()[0];
    assert_eq!(h1.children.as_ref().map(Vec::len), Some(1));
}

#[test]
fn data_attributes_merge_from_single_code_child() {
    let root = TreeBuilder::default().build(
        r#"<pre data-kind="snippet"><code data-code-wrap="mermaid">graph</code></pre>"#,
    );
    let pre = &root.children()[0];
    assert_eq!(pre.data.get("kind").map(String::as_str), Some("snippet"));
    assert_eq!(pre.data.get("codeWrap").map(String::as_str), Some("mermaid"));
}

#[test]
fn lone_image_paragraph_becomes_content() {
    let tree = Transformer::default().transform(r#"<h2>pics</h2><p><img src="a.png"></p>"#, None);
    assert_eq!(tree.content, "pics");
    assert_eq!(contents(&tree.children), vec![r#"<img src="a.png" />"#]);
}

#[test]
fn unmatched_heading_skips_deeper_content_until_a_shallower_one() {
    let options = BuildOptions {
        rules: vec![SelectorRule::new("h1,h3", RuleAction::Heading)],
        ..BuildOptions::default()
    };
    let root = TreeBuilder::new(options).build("<h1>A</h1><h2>B</h2><h3>C</h3><h1>D</h1>");
    let top: Vec<_> = root.children().iter().map(|n| n.html.as_str()).collect();
    assert_eq!(top, vec!["A", "D"]);
    assert!(root.children()[0].children().is_empty());
}

#[test]
fn malformed_markup_falls_back_to_empty_root() {
    let builder = TreeBuilder::default();
    assert!(matches!(
        builder.try_build("<h1>a</p>"),
        Err(Error::MalformedMarkup { .. })
    ));
    let root = builder.build("<h1>a</p>");
    assert_eq!(root, ContentNode::root());

    let tree = Transformer::default().transform("<h1>a</p>", Some("Fallback"));
    assert_eq!(tree, PayloadNode::new("Fallback"));
}

#[test]
fn omitted_list_item_end_tags_still_build_a_tree() {
    let tree = Transformer::default().transform("<h1>T</h1><ul><li>a<li>b</ul>", None);
    assert_eq!(tree.content, "T");
    assert_eq!(contents(&tree.children), vec!["a", "b"]);
}

#[test]
fn open_paragraph_is_closed_by_a_following_list() {
    let tree = Transformer::default().transform("<h1>T</h1><p>intro<ul><li>a</li></ul>", None);
    assert_eq!(tree.content, "T");
    assert_eq!(contents(&tree.children), vec!["a"]);
}

#[test]
fn fold_directives_become_payload_flags() {
    let tree = Transformer::default()
        .transform_markdown("# T\n- a <!-- markmap: foldAll -->\n  - x\n- b <!-- markmap: fold -->\n  - y\n- c\n", None);
    assert_eq!(tree.children[0].payload.fold, Some(Fold::CollapsedRecursively));
    assert_eq!(tree.children[1].payload.fold, Some(Fold::Collapsed));
    assert_eq!(tree.children[2].payload.fold, None);
}

#[test]
fn fold_data_attribute_is_typed() {
    let root = TreeBuilder::default().build(r#"<ul><li data-fold="1" data-note="n">a</li></ul>"#);
    let payload = convert_node(&root);
    let li = &payload.children[0].children[0];
    assert_eq!(li.payload.fold, Some(Fold::Collapsed));
    assert_eq!(li.payload.extra.get("note").map(String::as_str), Some("n"));
    assert!(!li.payload.extra.contains_key("fold"));
}

#[test]
fn markdown_scenario_nests_list_under_title() {
    let tree = Transformer::default().transform_markdown("# Title\n- a\n- b\n  - c", None);
    assert_eq!(tree.content, "Title");
    assert_eq!(contents(&tree.children), vec!["a", "b"]);
    assert_eq!(contents(&tree.children[1].children), vec!["c"]);
    assert!(tree.children[0].children.is_empty());
}

#[test]
fn full_documents_use_their_own_body() {
    let root = TreeBuilder::default()
        .build("<!DOCTYPE html><html><head><title>x</title></head><body><h1>a</h1></body></html>");
    assert_eq!(root.children().len(), 1);
    assert_eq!(root.children()[0].html, "a");
}

fn expected_parent(levels: &[u8], index: usize) -> u32 {
    (0..index)
        .rev()
        .find(|&j| levels[j] < levels[index])
        .map(|j| j as u32 + 1)
        .unwrap_or(0)
}

fn check_parentage(node: &ContentNode, levels: &[u8]) -> std::result::Result<(), TestCaseError> {
    for child in node.children() {
        let index = child.id as usize - 1;
        prop_assert_eq!(child.parent, Some(node.id));
        prop_assert_eq!(child.parent, Some(expected_parent(levels, index)));
        check_parentage(child, levels)?;
    }
    Ok(())
}

proptest! {
    #[test]
    fn heading_parent_is_nearest_preceding_shallower_heading(
        levels in prop::collection::vec(1u8..=6, 1..24)
    ) {
        let html: String = levels
            .iter()
            .enumerate()
            .map(|(i, l)| format!("<h{l}>n{i}</h{l}>"))
            .collect();
        let root = TreeBuilder::default().build(&html);
        check_parentage(&root, &levels)?;
    }
}
