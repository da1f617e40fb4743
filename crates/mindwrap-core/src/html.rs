//! HTML fragment handling on top of `roxmltree`.
//!
//! Cooked HTML is not XML: void elements are not closed, boolean attributes have no value and
//! named entities beyond the XML five are common. [`normalize_html`] rewrites a fragment into
//! well-formed XML so it can be parsed with `roxmltree`; the serializers below turn parsed nodes
//! back into HTML suitable for node content.

use crate::{Error, Result};
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const XML_ENTITIES: &[&str] = &["amp", "lt", "gt", "quot", "apos"];

/// Elements whose end tag may be left out.
const OPTIONAL_END: &[&str] = &[
    "li", "dt", "dd", "p", "td", "th", "tr", "thead", "tbody", "tfoot", "option",
];

/// Start tags that close an open `<p>`.
const PARAGRAPH_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

const PARAGRAPH_SCOPE: &[&str] = &["button", "caption", "object", "table", "td", "template", "th"];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn start_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^<([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#)
            .expect("valid regex")
    })
}

fn end_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^</([A-Za-z][A-Za-z0-9-]*)\s*>").expect("valid regex"))
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("valid regex")
    })
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<!doctype[^>]*>|<\?xml[^>]*\?>").expect("valid regex"))
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]+;|#[xX][0-9a-fA-F]+;|[A-Za-z][A-Za-z0-9]*;)?").expect("valid regex")
    })
}

/// Escapes `<` characters that cannot start a tag, a comment or a declaration.
///
/// Browsers treat those as text; an XML parser rejects them.
fn escape_stray_lt(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let is_stray = |i: usize| {
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        !(next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?'))
    };
    if !(0..bytes.len()).any(|i| bytes[i] == b'<' && is_stray(i)) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    let mut last = 0usize;
    for i in 0..bytes.len() {
        if bytes[i] == b'<' && is_stray(i) {
            out.push_str(&input[last..i]);
            out.push_str("&lt;");
            last = i + 1;
        }
    }
    out.push_str(&input[last..]);
    Cow::Owned(out)
}

fn normalize_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    entity_regex().replace_all(input, |caps: &Captures<'_>| {
        let Some(entity) = caps.get(1) else {
            return "&amp;".to_string();
        };
        let entity = entity.as_str();
        let name = &entity[..entity.len() - 1];
        if entity.starts_with('#') || XML_ENTITIES.contains(&name) {
            return format!("&{entity}");
        }
        let raw = format!("&{entity}");
        let decoded = htmlize::unescape(raw.as_str());
        if decoded == raw {
            // Unknown entity name: keep it visible as text.
            return format!("&amp;{entity}");
        }
        decoded.chars().map(|c| format!("&#{};", c as u32)).collect()
    })
}

fn normalize_start_tag(caps: &Captures<'_>) -> String {
    let tag = caps[1].to_ascii_lowercase();
    let mut out = format!("<{tag}");
    if let Some(attrs) = caps.get(2) {
        for attr in attribute_regex().captures_iter(attrs.as_str()) {
            let name = attr[1].to_ascii_lowercase();
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            out.push(' ');
            out.push_str(&name);
            out.push_str("=\"");
            out.push_str(&value.replace('<', "&lt;").replace('"', "&quot;"));
            out.push('"');
        }
    }
    if is_void_element(&tag) || !caps[3].is_empty() {
        out.push_str(" />");
    } else {
        out.push('>');
    }
    out
}

fn close_from(at: usize, open: &mut Vec<String>, out: &mut String) {
    for tag in open.drain(at..).rev() {
        out.push_str("</");
        out.push_str(&tag);
        out.push('>');
    }
}

/// Innermost open element named in `targets`, unless a `boundary` element is opened after it.
fn find_open(open: &[String], targets: &[&str], boundary: &[&str]) -> Option<usize> {
    for (idx, tag) in open.iter().enumerate().rev() {
        if targets.contains(&tag.as_str()) {
            return Some(idx);
        }
        if boundary.contains(&tag.as_str()) {
            return None;
        }
    }
    None
}

/// Closes the elements a `<tag>` start tag implicitly ends.
fn close_implied(tag: &str, open: &mut Vec<String>, out: &mut String) {
    let (targets, boundary): (&[&str], &[&str]) = match tag {
        "li" => (&["li"], &["ul", "ol", "menu", "table", "td", "th"]),
        "dt" | "dd" => (&["dt", "dd"], &["dl", "table", "td", "th"]),
        "td" | "th" => (&["td", "th"], &["tr", "table"]),
        "tr" => (&["tr"], &["thead", "tbody", "tfoot", "table"]),
        "thead" | "tbody" | "tfoot" => (&["thead", "tbody", "tfoot"], &["table"]),
        "option" => (&["option"], &["select", "datalist"]),
        _ => (&[], &[]),
    };
    if let Some(at) = find_open(open, targets, boundary) {
        close_from(at, open, out);
    }
    if PARAGRAPH_CLOSERS.contains(&tag) {
        if let Some(at) = find_open(open, &["p"], PARAGRAPH_SCOPE) {
            close_from(at, open, out);
        }
    }
}

/// Normalizes tags while tracking open elements, inserting the end tags HTML lets authors omit.
///
/// An end tag closes every element opened after its match. End tags without an open match are
/// kept so the XML parser still rejects them.
fn balance_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut open: Vec<String> = Vec::new();
    let mut rest = text;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        rest = &rest[lt..];

        if let Some(body) = rest.strip_prefix("<!--") {
            let len = body
                .find("-->")
                .map_or(rest.len(), |end| end + "<!--".len() + "-->".len());
            out.push_str(&rest[..len]);
            rest = &rest[len..];
        } else if let Some(caps) = start_tag_regex().captures(rest) {
            let tag = caps[1].to_ascii_lowercase();
            close_implied(&tag, &mut open, &mut out);
            let normalized = normalize_start_tag(&caps);
            if !normalized.ends_with("/>") {
                open.push(tag);
            }
            out.push_str(&normalized);
            rest = &rest[caps[0].len()..];
        } else if let Some(caps) = end_tag_regex().captures(rest) {
            let tag = caps[1].to_ascii_lowercase();
            if !is_void_element(&tag) {
                match open.iter().rposition(|t| *t == tag) {
                    Some(at) => close_from(at, &mut open, &mut out),
                    None => {
                        out.push_str("</");
                        out.push_str(&tag);
                        out.push('>');
                    }
                }
            }
            rest = &rest[caps[0].len()..];
        } else {
            out.push('<');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);

    let keep = open
        .iter()
        .rposition(|t| !OPTIONAL_END.contains(&t.as_str()))
        .map_or(0, |idx| idx + 1);
    close_from(keep, &mut open, &mut out);
    out
}

/// Rewrites an HTML fragment into XML that `roxmltree` accepts.
pub fn normalize_html(input: &str) -> String {
    let text = declaration_regex().replace_all(input, "");
    let text = escape_stray_lt(&text);
    let text = normalize_entities(&text);
    balance_tags(&text)
}

/// Wraps a normalized fragment into a single `<body>` root.
pub fn wrap_fragment(input: &str) -> String {
    format!("<body>{}</body>", normalize_html(input))
}

/// Parses an XML-ready document, mapping parser errors into [`Error::MalformedMarkup`].
pub fn parse_document(xml: &str) -> Result<roxmltree::Document<'_>> {
    roxmltree::Document::parse(xml).map_err(|err| Error::MalformedMarkup {
        message: err.to_string(),
    })
}

pub fn tag_name(node: roxmltree::Node<'_, '_>) -> String {
    node.tag_name().name().to_ascii_lowercase()
}

pub fn element_children<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

pub fn has_class(node: roxmltree::Node<'_, '_>, class: &str) -> bool {
    node.attribute("class")
        .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
}

/// Converts a `data-*` attribute name into its dataset key (`data-max-width` → `maxWidth`).
pub fn dataset_key(attr: &str) -> Option<String> {
    let rest = attr.strip_prefix("data-")?;
    let mut out = String::with_capacity(rest.len());
    let mut upper_next = false;
    for ch in rest.chars() {
        if ch == '-' {
            upper_next = true;
            continue;
        }
        if upper_next && ch.is_ascii_lowercase() {
            out.push(ch.to_ascii_uppercase());
        } else {
            if upper_next {
                out.push('-');
            }
            out.push(ch);
        }
        upper_next = false;
    }
    if upper_next {
        out.push('-');
    }
    Some(out)
}

pub fn dataset(node: roxmltree::Node<'_, '_>) -> IndexMap<String, String> {
    node.attributes()
        .filter_map(|a| Some((dataset_key(a.name())?, a.value().to_string())))
        .collect()
}

pub fn outer_html(node: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

pub fn inner_html(node: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(child, &mut out);
    }
    out
}

fn write_node(node: roxmltree::Node<'_, '_>, out: &mut String) {
    match node.node_type() {
        roxmltree::NodeType::Element => {
            let tag = tag_name(node);
            out.push('<');
            out.push_str(&tag);
            for attr in node.attributes() {
                out.push(' ');
                out.push_str(attr.name());
                out.push_str("=\"");
                out.push_str(&htmlize::escape_attribute(attr.value()));
                out.push('"');
            }
            if is_void_element(&tag) {
                out.push_str(" />");
                return;
            }
            out.push('>');
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
        roxmltree::NodeType::Text => {
            out.push_str(&htmlize::escape_text(node.text().unwrap_or_default()));
        }
        roxmltree::NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(node.text().unwrap_or_default());
            out.push_str("-->");
        }
        roxmltree::NodeType::Root | roxmltree::NodeType::PI => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_void_elements_and_boolean_attributes() {
        let out = normalize_html(r#"<p>a<br>b<img src=x.png><input type=checkbox checked></p>"#);
        assert_eq!(
            out,
            r#"<p>a<br />b<img src="x.png" /><input type="checkbox" checked="" /></p>"#
        );
    }

    #[test]
    fn normalizes_named_entities_to_numeric_references() {
        let out = normalize_html("a&nbsp;b &amp; c & d &bogus;");
        assert_eq!(out, "a&#160;b &amp; c &amp; d &amp;bogus;");
    }

    #[test]
    fn escapes_stray_less_than() {
        assert_eq!(normalize_html("1 < 2"), "1 &lt; 2");
    }

    #[test]
    fn drops_closing_tags_of_void_elements() {
        assert_eq!(normalize_html("a<br></br>b"), "a<br />b");
    }

    #[test]
    fn strips_doctype_declarations() {
        assert_eq!(normalize_html("<!DOCTYPE html><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn omitted_end_tags_are_inserted() {
        assert_eq!(
            normalize_html("<ul><li>a<li>b</ul>"),
            "<ul><li>a</li><li>b</li></ul>"
        );
        assert_eq!(
            normalize_html("<p>intro<ul><li>a</li></ul>"),
            "<p>intro</p><ul><li>a</li></ul>"
        );
        assert_eq!(
            normalize_html("<ul><li>a<ul><li>b</ul><li>c</ul>"),
            "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>"
        );
        assert_eq!(
            normalize_html("<table><tr><td>1<td>2<tr><td>3</table>"),
            "<table><tr><td>1</td><td>2</td></tr><tr><td>3</td></tr></table>"
        );
        assert_eq!(normalize_html("<p>a<p>b"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn unmatched_end_tags_are_kept() {
        assert_eq!(normalize_html("<h1>a</p>"), "<h1>a</p>");
        assert!(parse_document(&wrap_fragment("<h1>a</p>")).is_err());
    }

    #[test]
    fn comments_are_copied_verbatim() {
        assert_eq!(
            normalize_html("<ul><!-- <li> --><li>a</ul>"),
            "<ul><!-- <li> --><li>a</li></ul>"
        );
    }

    #[test]
    fn dataset_keys_are_camel_cased() {
        assert_eq!(dataset_key("data-max-width").as_deref(), Some("maxWidth"));
        assert_eq!(dataset_key("data-title").as_deref(), Some("title"));
        assert_eq!(dataset_key("class"), None);
    }

    #[test]
    fn serializes_back_to_html() {
        let xml = wrap_fragment(r#"<p class="x">a &lt; b<br><!-- note --></p>"#);
        let doc = parse_document(&xml).unwrap();
        let p = doc.root_element().first_element_child().unwrap();
        assert_eq!(outer_html(p), r#"<p class="x">a &lt; b<br /><!-- note --></p>"#);
        assert_eq!(inner_html(p), "a &lt; b<br /><!-- note -->");
    }
}
