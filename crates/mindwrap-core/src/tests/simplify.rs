use crate::*;
use proptest::prelude::*;

fn node(content: &str, children: Vec<PayloadNode>) -> PayloadNode {
    PayloadNode::new(content).with_children(children)
}

#[test]
fn empty_wrappers_collapse_into_their_only_child() {
    let tree = node("", vec![node("", vec![node("a", vec![node("b", vec![])])])]);
    assert_eq!(simplify(tree), node("a", vec![node("b", vec![])]));
}

#[test]
fn empty_only_child_is_elided() {
    let tree = node("a", vec![node("", vec![node("b", vec![]), node("c", vec![])])]);
    assert_eq!(
        simplify(tree),
        node("a", vec![node("b", vec![]), node("c", vec![])])
    );
}

#[test]
fn alternating_chains_collapse_fully() {
    let tree = node(
        "",
        vec![node(
            "a",
            vec![node("", vec![node("", vec![node("b", vec![node("", vec![])])])])],
        )],
    );
    assert_eq!(simplify(tree), node("a", vec![node("b", vec![])]));
}

#[test]
fn siblings_are_simplified_independently() {
    let tree = node(
        "r",
        vec![
            node("", vec![node("x", vec![])]),
            node("y", vec![node("", vec![node("z", vec![])])]),
        ],
    );
    assert_eq!(
        simplify(tree),
        node(
            "r",
            vec![node("x", vec![]), node("y", vec![node("z", vec![])])]
        )
    );
}

#[test]
fn root_content_defaults_to_title() {
    let tree = node("", vec![node("a", vec![]), node("b", vec![])]);
    let out = simplify_with_title(tree, "Doc");
    assert_eq!(out.content, "Doc");
    assert_eq!(out.children.len(), 2);

    let kept = simplify_with_title(node("x", vec![]), "Doc");
    assert_eq!(kept.content, "x");
}

#[test]
fn payload_of_promoted_child_is_kept() {
    let tree = node("", vec![node("a", vec![]).with_fold(Fold::Collapsed)]);
    assert_eq!(simplify(tree).payload.fold, Some(Fold::Collapsed));
}

fn arb_content() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-c]{1,2}"]
}

fn arb_tree() -> impl Strategy<Value = PayloadNode> {
    let leaf = arb_content().prop_map(PayloadNode::new);
    leaf.prop_recursive(5, 48, 4, |inner| {
        (arb_content(), prop::collection::vec(inner, 0..4))
            .prop_map(|(content, children)| PayloadNode::new(content).with_children(children))
    })
}

fn has_wrapper_chain(node: &PayloadNode) -> bool {
    let single = node.children.len() == 1;
    (single && (node.content.is_empty() || node.children[0].content.is_empty()))
        || node.children.iter().any(has_wrapper_chain)
}

proptest! {
    #[test]
    fn simplify_is_idempotent(tree in arb_tree()) {
        let once = simplify(tree);
        let twice = simplify(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn simplified_trees_have_no_wrapper_chains(tree in arb_tree()) {
        prop_assert!(!has_wrapper_chain(&simplify(tree)));
    }

    #[test]
    fn trees_without_wrappers_are_fixed_points(tree in arb_tree()) {
        prop_assume!(!has_wrapper_chain(&tree));
        prop_assert_eq!(simplify(tree.clone()), tree);
    }
}
