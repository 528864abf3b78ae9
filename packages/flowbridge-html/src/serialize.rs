//! Deterministic HTML serialization (§4.1): void tags self-close
//! (`<br />`), `class` is emitted last among attributes, and attribute
//! values are always double-quoted.

use crate::node::{Attribute, Element, HtmlNode};
use crate::parser::RAW_TEXT_TAGS;
use crate::void::is_void_tag;

pub fn serialize_doc(roots: &[HtmlNode]) -> String {
    let mut out = String::new();
    for node in roots {
        serialize_node(node, &mut out);
    }
    out
}

pub fn serialize_node(node: &HtmlNode, out: &mut String) {
    serialize_node_inner(node, out, false);
}

fn serialize_node_inner(node: &HtmlNode, out: &mut String, raw_text: bool) {
    match node {
        HtmlNode::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&html_escape::encode_text(text));
            }
        }
        HtmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        HtmlNode::Element(el) => serialize_element(el, out),
    }
}

fn serialize_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);

    let mut class_value: Option<String> = None;
    for Attribute { name, value } in el.attributes.iter() {
        if name.eq_ignore_ascii_case("class") {
            class_value = Some(value.clone());
            continue;
        }
        write_attr(out, name, value);
    }
    if let Some(value) = class_value {
        write_attr(out, "class", &value);
    }

    if is_void_tag(&el.tag) {
        out.push_str(" />");
        return;
    }
    out.push('>');
    // script/style/textarea/title content must round-trip byte-for-byte
    // (it was never re-entered as markup by the parser either).
    let raw_text = RAW_TEXT_TAGS.iter().any(|t| el.tag.eq_ignore_ascii_case(t));
    for child in &el.children {
        serialize_node_inner(child, out, raw_text);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    if value.is_empty() {
        return;
    }
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(value));
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn void_tags_self_close() {
        let doc = parse("<br>", 512);
        let s = serialize_doc(&doc.roots);
        assert_eq!(s, "<br />");
    }

    #[test]
    fn class_attribute_emitted_last() {
        let doc = parse("<div class=\"a\" id=\"x\" data-foo=\"1\"></div>", 512);
        let s = serialize_doc(&doc.roots);
        assert_eq!(s, "<div id=\"x\" data-foo=\"1\" class=\"a\"></div>");
    }

    #[test]
    fn round_trip_is_stable() {
        let doc = parse("<section class=\"hero\"><h1>Hi</h1></section>", 512);
        let first = serialize_doc(&doc.roots);
        let reparsed = parse(&first, 512);
        let second = serialize_doc(&reparsed.roots);
        assert_eq!(first, second);
    }

    #[test]
    fn script_content_is_not_escaped() {
        let doc = parse("<script>if (a < b) { x(); }</script>", 512);
        let s = serialize_doc(&doc.roots);
        assert_eq!(s, "<script>if (a < b) { x(); }</script>");
    }

    #[test]
    fn style_content_is_not_escaped() {
        let doc = parse("<style>.a { content: \"<\"; }</style>", 512);
        let s = serialize_doc(&doc.roots);
        assert_eq!(s, "<style>.a { content: \"<\"; }</style>");
    }
}
