//! Scene-graph emitter (§4.9): converts one component's HTML + resolved
//! class index into the target builder's node/style payload.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use flowbridge_css::{ClassIndex, Declarations};
use flowbridge_html::{Element, HtmlNode};

use crate::model::{
    EmbedMeta, EmbedMetaInner, Ix2, Node, NodeData, NodeType, ScenePayload, ScenePayloadBody,
    ScenePayloadMeta, Style, VariantBody,
};

const VOID_TAGS: &[&str] =
    &["img", "br", "hr", "input", "meta", "link", "area", "base", "col", "embed", "param", "source", "track", "wbr"];

const EMBED_TAGS: &[&str] = &["script", "style", "iframe", "svg", "canvas", "noscript"];

fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

fn is_embed_tag(tag: &str) -> bool {
    EMBED_TAGS.contains(&tag)
}

fn node_type_for_tag(tag: &str) -> NodeType {
    match tag {
        "a" => NodeType::Link,
        "img" => NodeType::Image,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => NodeType::Heading,
        "p" => NodeType::Paragraph,
        "ul" | "ol" => NodeType::List,
        "li" => NodeType::ListItem,
        _ => NodeType::Block,
    }
}

/// Replaces `clamp(a, b, c)` with its last argument (§4.9 step 2, §8
/// scenario 5): the target has no responsive-clamp primitive, so the
/// emitter keeps the upper bound.
fn collapse_clamp(value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    let Some(start) = lower.find("clamp(") else {
        return value.to_string();
    };
    let args_start = start + "clamp(".len();
    let Some(close) = find_matching_paren(value, args_start) else {
        return value.to_string();
    };
    let inner = &value[args_start..close];
    let parts = flowbridge_css::scan::split_top_level(inner, ',');
    let Some(last) = parts.last() else {
        return value.to_string();
    };
    let replaced = format!("{}{}{}", &value[..start], last.trim(), &value[close + 1..]);
    collapse_clamp(&replaced)
}

fn find_matching_paren(value: &str, start: usize) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut depth = 1i32;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn format_num(n: f64) -> String {
    let s = format!("{n:.4}");
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Converts a single whitespace-delimited token's `px` value to `rem` at
/// base 16, except `1px`/`-1px` (hairlines) and bare `0` (§4.9, §8).
fn convert_px_token(tok: &str) -> String {
    if tok == "0" || tok == "0px" {
        return "0".to_string();
    }
    if let Some(num_str) = tok.strip_suffix("px") {
        if let Ok(n) = num_str.parse::<f64>() {
            if n == 1.0 || n == -1.0 {
                return tok.to_string();
            }
            return format!("{}rem", format_num(n / 16.0));
        }
    }
    tok.to_string()
}

fn convert_px_value(value: &str) -> String {
    value.split_whitespace().map(convert_px_token).collect::<Vec<_>>().join(" ")
}

fn render_value(raw: &str) -> String {
    convert_px_value(&collapse_clamp(raw))
}

fn declarations_to_style_less(decls: &Declarations) -> String {
    decls.iter().map(|d| format!("{}: {};", d.name, render_value(&d.value))).collect::<Vec<_>>().join(" ")
}

/// Parses a `style="a: b; c: d"` attribute into declarations (§4.9 step 3).
fn parse_inline_style(value: &str) -> Declarations {
    let mut decls = Declarations::default();
    for part in flowbridge_css::scan::split_top_level(value, ';') {
        if let Some(idx) = part.find(':') {
            let name = part[..idx].trim();
            let val = part[idx + 1..].trim();
            if !name.is_empty() && !val.is_empty() {
                decls.set(name, val);
            }
        }
    }
    decls
}

fn content_hash(value: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

struct EmitCtx<'a> {
    index: &'a ClassIndex,
    class_styles: BTreeMap<String, String>,
    inline_styles: BTreeMap<String, String>,
}

impl<'a> EmitCtx<'a> {
    fn style_for_class(&mut self, styles: &mut Vec<Style>, class_name: &str) -> String {
        if let Some(id) = self.class_styles.get(class_name) {
            return id.clone();
        }
        let mut style = Style::new(class_name, "");
        if let Some(entry) = self.index.classes.get(class_name) {
            style.style_less = declarations_to_style_less(&entry.base);
            for (tier, decls) in &entry.narrow {
                style.variants.insert(tier.as_str().to_string(), VariantBody { style_less: declarations_to_style_less(decls) });
            }
            for (state, decls) in &entry.pseudo_states {
                style.variants.insert(state.clone(), VariantBody { style_less: declarations_to_style_less(decls) });
            }
        }
        let id = style.id.clone();
        styles.push(style);
        self.class_styles.insert(class_name.to_string(), id.clone());
        id
    }

    fn style_for_inline(&mut self, styles: &mut Vec<Style>, decls: &Declarations) -> String {
        let style_less = declarations_to_style_less(decls);
        let synthetic = format!("inline-{}", content_hash(&style_less));
        if let Some(id) = self.inline_styles.get(&synthetic) {
            return id.clone();
        }
        let style = Style::new(synthetic.clone(), style_less);
        let id = style.id.clone();
        styles.push(style);
        self.inline_styles.insert(synthetic, id.clone());
        id
    }
}

fn walk_element(el: &Element, ctx: &mut EmitCtx, styles: &mut Vec<Style>, nodes: &mut Vec<Node>) -> String {
    let tag_lower = el.tag.to_ascii_lowercase();

    if is_embed_tag(&tag_lower) {
        let html = flowbridge_html::serialize(std::slice::from_ref(&HtmlNode::Element(el.clone())));
        let mut node = Node::new_block(el.tag.clone());
        node.node_type = NodeType::HtmlEmbed;
        node.v = Some(html.clone());
        node.data = Some(NodeData { attr: None, embed: Some(EmbedMeta { meta: EmbedMetaInner { html } }) });
        let id = node.id.clone();
        nodes.push(node);
        return id;
    }

    let mut classes = Vec::new();
    for class_name in el.classes() {
        classes.push(ctx.style_for_class(styles, &class_name));
    }
    if let Some(style_attr) = el.attributes.get("style") {
        let decls = parse_inline_style(style_attr);
        if !decls.is_empty() {
            classes.push(ctx.style_for_inline(styles, &decls));
        }
    }

    let mut children = Vec::new();
    for child in &el.children {
        match child {
            HtmlNode::Element(child_el) => children.push(walk_element(child_el, ctx, styles, nodes)),
            HtmlNode::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    let node = Node::new_text(trimmed.to_string());
                    let id = node.id.clone();
                    nodes.push(node);
                    children.push(id);
                }
            }
            HtmlNode::Comment(_) => {}
        }
    }

    let mut node = Node::new_block(el.tag.clone());
    node.node_type = node_type_for_tag(&tag_lower);
    node.classes = classes;
    node.children = children;
    if is_void_tag(&tag_lower) {
        let mut attr = BTreeMap::new();
        for a in el.attributes.iter() {
            let name = a.name.to_ascii_lowercase();
            if name != "class" && name != "id" && name != "style" {
                attr.insert(a.name.clone(), a.value.clone());
            }
        }
        if !attr.is_empty() {
            node.data = Some(NodeData { attr: Some(attr), embed: None });
        }
    }
    let id = node.id.clone();
    nodes.push(node);
    id
}

/// Emits one component's HTML fragment into a `ScenePayload` (§4.9). The
/// class index must already reflect the literalized, decoupled CSS for the
/// whole document — this pass only reads it, never mutates it.
///
/// `final_css` is the semantic patch's `replaceFinalCss` override (§4.8,
/// spec.md:191): when present, it is parsed and overlaid on top of `index`
/// so the emitted `styleLess` reflects the last such patch the model sent,
/// per class, without losing declarations for classes the patch never
/// mentioned.
pub fn emit_component(html: &str, index: &ClassIndex, final_css: Option<&str>) -> ScenePayload {
    let overlaid;
    let index = if let Some(css) = final_css {
        let sheet = flowbridge_css::parse_stylesheet(css);
        let patch = flowbridge_css::build_class_index(&sheet.rules);
        overlaid = flowbridge_css::overlay(index, &patch);
        &overlaid
    } else {
        index
    };

    let doc = flowbridge_html::parse(html);
    let mut ctx = EmitCtx { index, class_styles: BTreeMap::new(), inline_styles: BTreeMap::new() };
    let mut styles = Vec::new();
    let mut nodes = Vec::new();

    for root in &doc.roots {
        match root {
            HtmlNode::Element(el) => {
                walk_element(el, &mut ctx, &mut styles, &mut nodes);
            }
            HtmlNode::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    nodes.push(Node::new_text(trimmed.to_string()));
                }
            }
            HtmlNode::Comment(_) => {}
        }
    }

    ScenePayload {
        payload: ScenePayloadBody { nodes, styles, assets: Vec::new(), ix1: serde_json::Value::Null, ix2: Ix2::default() },
        meta: ScenePayloadMeta::default(),
    }
}

/// Builds the shared style-guide payload for the token manifest (§1, §6):
/// one demonstrative node+style pair per token, grouped under a root block.
pub fn emit_token_scene_payload(tokens: &flowbridge_css::TokenManifest) -> ScenePayload {
    use flowbridge_css::TokenCategory;

    let mut styles = Vec::new();
    let mut nodes = Vec::new();
    let mut children = Vec::new();

    for (name, token) in &tokens.variables {
        let demo = match token.category {
            TokenCategory::Color => format!("background-color: {};", token.value),
            TokenCategory::Spacing => format!("width: {}; height: {};", token.value, token.value),
            TokenCategory::FontFamily => format!("font-family: {};", token.value),
        };
        let style = Style::new(name.trim_start_matches("--"), demo);
        let style_id = style.id.clone();
        styles.push(style);

        let mut node = Node::new_block("div");
        node.classes = vec![style_id];
        let node_id = node.id.clone();
        nodes.push(node);
        children.push(node_id);
    }

    let mut root = Node::new_block("div");
    root.children = children;
    nodes.push(root);

    ScenePayload {
        payload: ScenePayloadBody { nodes, styles, assets: Vec::new(), ix1: serde_json::Value::Null, ix2: Ix2::default() },
        meta: ScenePayloadMeta::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbridge_css::{build_class_index, parse_stylesheet};

    #[test]
    fn flat_hero_yields_text_heading_and_section_nodes() {
        let sheet = parse_stylesheet("");
        let index = build_class_index(&sheet.rules);
        let payload = emit_component("<section class=\"hero\"><h1>Hi</h1></section>", &index, None);
        assert_eq!(payload.payload.nodes.len(), 3);
        let text = payload.payload.nodes.iter().find(|n| n.is_text()).unwrap();
        assert_eq!(text.v.as_deref(), Some("Hi"));
        let heading = payload.payload.nodes.iter().find(|n| n.node_type == NodeType::Heading).unwrap();
        assert!(heading.children.contains(&text.id));
    }

    #[test]
    fn clamp_collapses_to_last_argument() {
        let sheet = parse_stylesheet(".title { font-size: clamp(1rem, 4vw, 3rem); }");
        let index = build_class_index(&sheet.rules);
        let payload = emit_component("<div class=\"title\">x</div>", &index, None);
        let style = payload.payload.styles.iter().find(|s| s.name == "title").unwrap();
        assert!(!style.style_less.contains("clamp("));
        assert!(style.style_less.contains("font-size: 3rem"));
    }

    #[test]
    fn px_values_convert_to_rem_except_hairlines_and_zero() {
        let sheet = parse_stylesheet(".box { border-width: 1px; margin: 0; padding: 20px; }");
        let index = build_class_index(&sheet.rules);
        let payload = emit_component("<div class=\"box\">x</div>", &index, None);
        let style = payload.payload.styles.iter().find(|s| s.name == "box").unwrap();
        assert!(style.style_less.contains("border-width: 1px"));
        assert!(style.style_less.contains("margin: 0"));
        assert!(style.style_less.contains("padding: 1.25rem"));
    }

    #[test]
    fn inline_style_lifts_into_synthetic_class() {
        let sheet = parse_stylesheet("");
        let index = build_class_index(&sheet.rules);
        let payload = emit_component("<div style=\"color: red;\">x</div>", &index, None);
        let style = payload.payload.styles.iter().find(|s| s.name.starts_with("inline-")).unwrap();
        assert_eq!(style.style_less, "color: red;");
    }

    #[test]
    fn script_tag_becomes_html_embed_node() {
        let sheet = parse_stylesheet("");
        let index = build_class_index(&sheet.rules);
        let payload = emit_component("<script>alert(1)</script>", &index, None);
        let node = &payload.payload.nodes[0];
        assert_eq!(node.node_type, NodeType::HtmlEmbed);
        assert!(node.v.as_deref().unwrap().contains("alert(1)"));
        assert_eq!(node.data.as_ref().unwrap().embed.as_ref().unwrap().meta.html, node.v.clone().unwrap());
    }
}
