use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command;

fn run_json(args: &[&str]) -> Value {
    let exe = assert_cmd::cargo_bin!("mindwrap-cli");
    let output = Command::new(exe).args(args).assert().success();
    serde_json::from_slice(&output.get_output().stdout).expect("json output")
}

#[test]
fn tree_prints_the_payload_of_a_markdown_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("notes.md");
    fs::write(&input, "# Title\n- a\n- b\n  - c\n").expect("write input");

    let tree = run_json(&["tree", input.to_string_lossy().as_ref()]);
    assert_eq!(tree["content"], "Title");
    assert_eq!(tree["children"].as_array().map(Vec::len), Some(2));
    assert_eq!(tree["children"][1]["children"][0]["content"], "c");
}

#[test]
fn layout_honors_viewport_and_options() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("map.html");
    fs::write(&input, "<ul><li>one</li><li>two</li></ul>").expect("write input");

    let layout = run_json(&[
        "layout",
        "--title",
        "Root",
        "--option",
        "autoFit=false",
        "--viewport",
        "400x300",
        input.to_string_lossy().as_ref(),
    ]);
    let nodes = layout["frame"]["nodes"].as_array().expect("nodes");
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["content"], "Root");
    assert_eq!(layout["frame"]["fit"], false);
    assert!(layout["transform"]["k"].as_f64().is_some());
}

#[test]
fn wraps_lists_blocks_with_their_options() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("post.html");
    fs::write(
        &input,
        "<div><div data-wrap=\"markmap\" data-title=\"Plan\" data-max-width=\"240px\">\
         <ul><li>x</li></ul></div></div>",
    )
    .expect("write input");

    let wraps = run_json(&["wraps", input.to_string_lossy().as_ref()]);
    let blocks = wraps.as_array().expect("array");
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0]["index"], 0);
    assert_eq!(blocks[0]["title"], "Plan");
    assert_eq!(blocks[0]["options"]["maxWidth"], 240.0);
    assert!(blocks[0]["options"].get("duration").is_none());
}

#[test]
fn missing_wraps_and_bad_flags_fail() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("plain.html");
    fs::write(&input, "<p>nothing</p>").expect("write input");

    let exe = assert_cmd::cargo_bin!("mindwrap-cli");
    Command::new(&exe)
        .args(["wraps", input.to_string_lossy().as_ref()])
        .assert()
        .code(3);
    Command::new(&exe)
        .args(["layout", "--viewport", "wide"])
        .assert()
        .code(2);
}
