//! Tolerant recursive-descent HTML parser (§4.1).
//!
//! States: `Text` -> on `<`, peek: `!--` enters `Comment`, `!` (DOCTYPE/other
//! declaration) is skipped to the next `>`, a letter enters `OpenTag`, `/`
//! enters `CloseTag`. The parser never hard-errors: unmatched closers pop the
//! open-element stack to the nearest ancestor; unclosed tags at end of input
//! are flushed. Void tags (§3) never push onto the stack.
//!
//! `<script>`/`<style>`/`<textarea>`/`<title>` content is raw text up to the
//! matching end tag — their contents (CSS/JS) must survive byte-for-byte for
//! the downstream CSS/JS passes, so they are never re-entered as markup.

use crate::node::{Attribute, Attributes, Element, HtmlDoc, HtmlNode};
use crate::void::is_void_tag;

/// Tags whose content is raw text, not markup.
pub(crate) const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

struct OpenFrame {
    tag: String,
    attributes: Attributes,
    children: Vec<HtmlNode>,
}

impl OpenFrame {
    fn into_node(self) -> HtmlNode {
        let mut el = Element::new(self.tag, self.attributes);
        el.children = self.children;
        HtmlNode::Element(el)
    }
}

/// Parses `input` into an [`HtmlDoc`]. `max_depth` bounds open-element
/// nesting (§5: hard cap 512); elements beyond the cap are parsed but
/// forced childless rather than overflowing the stack.
pub fn parse(input: &str, max_depth: usize) -> HtmlDoc {
    let len = input.len();
    let mut pos = 0usize;
    let mut warnings: Vec<String> = Vec::new();
    let mut roots: Vec<HtmlNode> = Vec::new();
    let mut stack: Vec<OpenFrame> = Vec::new();

    fn push_node(stack: &mut [OpenFrame], roots: &mut Vec<HtmlNode>, node: HtmlNode) {
        match stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => roots.push(node),
        }
    }

    fn push_text(stack: &mut [OpenFrame], roots: &mut Vec<HtmlNode>, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = match stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => roots,
        };
        if let Some(HtmlNode::Text(existing)) = children.last_mut() {
            existing.push_str(text);
        } else {
            children.push(HtmlNode::Text(text.to_string()));
        }
    }

    while pos < len {
        let rest = &input[pos..];
        if rest.as_bytes()[0] != b'<' {
            let next_lt = rest.find('<').map(|i| pos + i).unwrap_or(len);
            let text = html_escape::decode_html_entities(&input[pos..next_lt]);
            push_text(&mut stack, &mut roots, &text);
            pos = next_lt;
            continue;
        }

        if rest.starts_with("<!--") {
            let rel_end = rest[4..].find("-->");
            match rel_end {
                Some(i) => {
                    let content = &rest[4..4 + i];
                    push_node(
                        &mut stack,
                        &mut roots,
                        HtmlNode::Comment(content.to_string()),
                    );
                    pos += 4 + i + 3;
                }
                None => {
                    let content = &rest[4..];
                    push_node(
                        &mut stack,
                        &mut roots,
                        HtmlNode::Comment(content.to_string()),
                    );
                    pos = len;
                }
            }
            continue;
        }

        if rest.starts_with("<!") {
            // DOCTYPE or other declaration: skip to the next '>'.
            let skip = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            pos += skip;
            continue;
        }

        if rest.starts_with("</") {
            let tag_end = rest[2..].find('>').map(|i| 2 + i).unwrap_or(rest.len());
            let raw_name = rest[2..tag_end].trim();
            let tag = raw_name
                .split(|c: char| c.is_ascii_whitespace())
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            pos += tag_end + 1;

            if tag.is_empty() {
                continue;
            }

            if let Some(match_idx) = stack.iter().rposition(|f| f.tag == tag) {
                while stack.len() > match_idx {
                    let frame = stack.pop().unwrap();
                    if stack.len() > match_idx {
                        warnings.push(format!(
                            "unmatched open tag <{}> implicitly closed by </{}>",
                            frame.tag, tag
                        ));
                    }
                    let node = frame.into_node();
                    push_node(&mut stack, &mut roots, node);
                }
            } else {
                warnings.push(format!("closing tag </{tag}> has no matching open tag"));
            }
            continue;
        }

        // Must be a letter to start an open tag; otherwise treat '<' as text.
        let next_byte = rest.as_bytes().get(1).copied().unwrap_or(0);
        if !(next_byte as char).is_ascii_alphabetic() {
            push_text(&mut stack, &mut roots, "<");
            pos += 1;
            continue;
        }

        let (tag, attributes, self_closing, consumed) = parse_open_tag(rest);
        pos += consumed;
        let tag_lower = tag.to_ascii_lowercase();

        if RAW_TEXT_TAGS.iter().any(|t| *t == tag_lower) && !self_closing {
            let close_needle = format!("</{tag_lower}");
            let rest2 = &input[pos..];
            let rel_close = find_case_insensitive(rest2, &close_needle);
            let (raw_content, after) = match rel_close {
                Some(i) => {
                    let content = &rest2[..i];
                    let tag_close_end = rest2[i..].find('>').map(|j| i + j + 1).unwrap_or(rest2.len());
                    (content, tag_close_end)
                }
                None => (rest2, rest2.len()),
            };
            let mut el = Element::new(tag_lower, attributes);
            if !raw_content.is_empty() {
                el.children.push(HtmlNode::Text(raw_content.to_string()));
            }
            push_node(&mut stack, &mut roots, HtmlNode::Element(el));
            pos += after;
            continue;
        }

        let void = is_void_tag(&tag_lower);
        if void || self_closing {
            let el = Element::new(tag_lower, attributes);
            push_node(&mut stack, &mut roots, HtmlNode::Element(el));
        } else if stack.len() >= max_depth {
            warnings.push(format!(
                "max nesting depth {max_depth} exceeded at <{tag_lower}>; forced childless"
            ));
            let el = Element::new(tag_lower, attributes);
            push_node(&mut stack, &mut roots, HtmlNode::Element(el));
        } else {
            stack.push(OpenFrame {
                tag: tag_lower,
                attributes,
                children: Vec::new(),
            });
        }
    }

    while let Some(frame) = stack.pop() {
        warnings.push(format!("unclosed tag <{}> flushed at end of input", frame.tag));
        let node = frame.into_node();
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    HtmlDoc { roots, warnings }
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let haystack_lower = haystack.to_ascii_lowercase();
    let needle_lower = needle.to_ascii_lowercase();
    haystack_lower.find(&needle_lower)
}

/// Parses an open tag starting at `input[0] == '<'`. Returns
/// `(tag_name, attributes, self_closing, bytes_consumed)`.
fn parse_open_tag(input: &str) -> (String, Attributes, bool, usize) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut i = 1usize; // skip '<'

    let name_start = i;
    while i < len && (is_name_char(bytes[i])) {
        i += 1;
    }
    let tag = input[name_start..i].to_string();

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        // skip whitespace
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            // possible self-closing "/>"
            if i + 1 < len && bytes[i + 1] == b'>' {
                self_closing = true;
                i += 2;
                break;
            }
            i += 1;
            continue;
        }

        let attr_name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'>' && bytes[i] != b'/' {
            i += 1;
        }
        if i == attr_name_start {
            // stray character (e.g. a lone quote); skip it to make progress.
            i += 1;
            continue;
        }
        let attr_name = input[attr_name_start..i].to_string();

        // skip whitespace before possible '='
        let mut j = i;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        if j < len && bytes[j] == b'=' {
            j += 1;
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let value;
            if j < len && (bytes[j] == b'"' || bytes[j] == b'\'') {
                let quote = bytes[j];
                let value_start = j + 1;
                let mut k = value_start;
                while k < len && bytes[k] != quote {
                    k += 1;
                }
                value = input[value_start..k].to_string();
                i = if k < len { k + 1 } else { k };
            } else {
                // unquoted value: runs until whitespace or '>'
                let value_start = j;
                let mut k = value_start;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    k += 1;
                }
                value = input[value_start..k].to_string();
                i = k;
            }
            let decoded = html_escape::decode_html_entities(&value).into_owned();
            attrs.push(Attribute {
                name: attr_name,
                value: decoded,
            });
        } else {
            // boolean attribute with no value; preserved as empty string.
            attrs.push(Attribute {
                name: attr_name,
                value: String::new(),
            });
            i = j;
        }
    }

    (tag, Attributes::new(attrs), self_closing, i)
}

fn is_name_char(b: u8) -> bool {
    (b as char).is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_el(doc: &HtmlDoc, idx: usize) -> &Element {
        doc.roots[idx].as_element().unwrap()
    }

    #[test]
    fn parses_flat_document() {
        let doc = parse(
            "<!doctype html><html><body><section class=\"hero\"><h1>Hi</h1></section></body></html>",
            512,
        );
        assert_eq!(doc.roots.len(), 1);
        let html = root_el(&doc, 0);
        assert_eq!(html.tag, "html");
        let body = html.children[0].as_element().unwrap();
        assert_eq!(body.tag, "body");
        let section = body.children[0].as_element().unwrap();
        assert_eq!(section.classes(), vec!["hero".to_string()]);
        let h1 = section.children[0].as_element().unwrap();
        assert_eq!(h1.text_content(), "Hi");
    }

    #[test]
    fn void_tags_never_get_children() {
        let doc = parse("<div><img src=\"a.png\">text</div>", 512);
        let div = root_el(&doc, 0);
        let img = div.children[0].as_element().unwrap();
        assert!(img.children.is_empty());
        assert_eq!(img.attributes.get("src"), Some("a.png"));
    }

    #[test]
    fn unclosed_tags_are_flushed() {
        let doc = parse("<div><p>unterminated", 512);
        assert_eq!(doc.warnings.len() >= 1, true);
        let div = root_el(&doc, 0);
        assert_eq!(div.tag, "div");
    }

    #[test]
    fn mismatched_close_pops_to_ancestor() {
        let doc = parse("<div><span>a</div>", 512);
        let div = root_el(&doc, 0);
        assert_eq!(div.tag, "div");
        let span = div.children[0].as_element().unwrap();
        assert_eq!(span.tag, "span");
        assert_eq!(span.text_content(), "a");
    }

    #[test]
    fn script_content_is_raw_text() {
        let doc = parse("<script>if (a < b) { x(); }</script>", 512);
        let script = root_el(&doc, 0);
        assert_eq!(script.tag, "script");
        assert_eq!(script.text_content(), "if (a < b) { x(); }");
    }

    #[test]
    fn unquoted_and_boolean_attributes() {
        let doc = parse("<input type=text disabled>", 512);
        let input = root_el(&doc, 0);
        assert_eq!(input.attributes.get("type"), Some("text"));
        assert_eq!(input.attributes.get("disabled"), Some(""));
    }

    #[test]
    fn depth_cap_forces_childless() {
        let mut html = String::new();
        for _ in 0..10 {
            html.push_str("<div>");
        }
        html.push_str("deep");
        for _ in 0..10 {
            html.push_str("</div>");
        }
        let doc = parse(&html, 3);
        assert!(!doc.warnings.is_empty());
    }
}
