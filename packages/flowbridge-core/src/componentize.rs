//! The componentizer (§4.7): segments normalized HTML into named,
//! independently pastable components.

use std::collections::BTreeMap;

use flowbridge_html::{Element, HtmlDoc, HtmlNode};

use crate::model::{Component, ComponentTree, ComponentType};

const CLASS_PATTERN_PREFIXES: &[&str] = &[
    "nav", "header", "hero", "section", "footer", "navbar", "w-nav", "cta", "banner", "feature",
    "pricing", "testimonial", "faq",
];

fn class_matches_pattern(class: &str) -> bool {
    let c = class.to_ascii_lowercase();
    CLASS_PATTERN_PREFIXES.iter().any(|p| c.starts_with(p)) || c.ends_with("-section")
}

fn is_candidate_tag(tag: &str) -> bool {
    matches!(tag, "nav" | "header" | "section" | "article" | "aside" | "footer")
}

fn is_candidate_div(el: &Element) -> bool {
    el.tag.eq_ignore_ascii_case("div") && el.classes().iter().any(|c| class_matches_pattern(c))
}

/// Step 1: unwrap a `<body>` or a single `wf-body` wrapper if present.
fn get_body_children(doc: &HtmlDoc) -> Vec<HtmlNode> {
    if let Some(body) = doc.find_body() {
        return body.children.clone();
    }
    if doc.roots.len() == 1 {
        if let HtmlNode::Element(el) = &doc.roots[0] {
            if el.has_class("wf-body") {
                return el.children.clone();
            }
        }
    }
    doc.roots.clone()
}

fn contains_tag(el: &Element, tag: &str) -> bool {
    el.children.iter().any(|c| match c {
        HtmlNode::Element(e) if e.tag.eq_ignore_ascii_case(tag) => true,
        HtmlNode::Element(e) => contains_tag(e, tag),
        _ => false,
    })
}

fn find_heading_text(el: &Element) -> Option<String> {
    for child in &el.children {
        if let HtmlNode::Element(e) = child {
            if matches!(e.tag.to_ascii_lowercase().as_str(), "h1" | "h2" | "h3") {
                let text = e.text_content().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
            if let Some(found) = find_heading_text(e) {
                return Some(found);
            }
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn humanize(s: &str) -> String {
    s.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn slugify(s: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for c in s.to_ascii_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

fn is_generic_name(name: &str) -> bool {
    name.starts_with("Section ") || name == "Block"
}

fn deterministic_name_override(classes_joined: &str, heading_lower: &str) -> Option<&'static str> {
    if classes_joined.contains("nav-link") || classes_joined.contains("navbar") {
        Some("Nav")
    } else if classes_joined.contains("hero") {
        Some("Hero")
    } else if classes_joined.contains("pricing") {
        Some("Pricing")
    } else if classes_joined.contains("bento") || classes_joined.contains("card-grid") {
        Some("Bento/Features")
    } else if heading_lower.contains("3 steps") {
        Some("How it works")
    } else if heading_lower.contains("the problem") {
        Some("Problem")
    } else if classes_joined.contains("faq") {
        Some("FAQ")
    } else if classes_joined.contains("cta") || heading_lower.contains("get started") {
        Some("CTA")
    } else if classes_joined.contains("footer") || heading_lower.contains("copyright") {
        Some("Footer")
    } else {
        None
    }
}

fn infer_component_type(el: &Element, order: usize) -> ComponentType {
    match el.tag.to_ascii_lowercase().as_str() {
        "nav" => return ComponentType::Nav,
        "header" => return ComponentType::Header,
        "footer" => return ComponentType::Footer,
        _ => {}
    }
    let classes = el.classes().join(" ").to_ascii_lowercase();
    let id = el.id().unwrap_or("").to_ascii_lowercase();
    let has_h1 = contains_tag(el, "h1");
    if classes.contains("hero") || id.contains("hero") || (order <= 2 && has_h1) {
        ComponentType::Hero
    } else {
        ComponentType::Section
    }
}

pub(crate) fn collect_classes(el: &Element) -> Vec<String> {
    fn walk(el: &Element, out: &mut Vec<String>) {
        for c in el.classes() {
            if !out.contains(&c) {
                out.push(c);
            }
        }
        for child in &el.children {
            if let HtmlNode::Element(e) = child {
                walk(e, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(el, &mut out);
    out
}

fn collect_assets(el: &Element) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(el: &Element, out: &mut Vec<String>) {
        if el.tag.eq_ignore_ascii_case("img") {
            if let Some(src) = el.attributes.get("src") {
                out.push(src.to_string());
            }
        }
        for child in &el.children {
            if let HtmlNode::Element(e) = child {
                walk(e, out);
            }
        }
    }
    walk(el, &mut out);
    out
}

fn collect_js_hooks(el: &Element) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(el: &Element, out: &mut Vec<String>) {
        if let Some(id) = el.id() {
            let hook = format!("#{id}");
            if !out.contains(&hook) {
                out.push(hook);
            }
        }
        for attr in el.attributes.iter() {
            if attr.name.to_ascii_lowercase().starts_with("data-") && !out.contains(&attr.name) {
                out.push(attr.name.clone());
            }
        }
        for child in &el.children {
            if let HtmlNode::Element(e) = child {
                walk(e, out);
            }
        }
    }
    walk(el, &mut out);
    out
}

struct Candidate {
    node: HtmlNode,
    is_wrapper_fallback: bool,
}

/// Steps 2–6: collects top-level semantic elements, class-pattern `<div>`s,
/// and recurses one level into a single `<main>`.
fn collect_candidates(body_children: &[HtmlNode]) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for node in body_children {
        if let HtmlNode::Element(el) = node {
            let tag_lower = el.tag.to_ascii_lowercase();
            if tag_lower == "main" {
                for child in &el.children {
                    if matches!(child, HtmlNode::Element(_)) {
                        candidates.push(Candidate { node: child.clone(), is_wrapper_fallback: false });
                    }
                }
            } else if is_candidate_tag(&tag_lower) || is_candidate_div(el) {
                candidates.push(Candidate { node: node.clone(), is_wrapper_fallback: false });
            }
        }
    }

    if candidates.is_empty() {
        let mut attrs = flowbridge_html::Attributes::default();
        attrs.set("class", "wrapper");
        let mut wrapper = Element::new("div", attrs);
        wrapper.children = body_children.to_vec();
        candidates.push(Candidate { node: HtmlNode::Element(wrapper), is_wrapper_fallback: true });
    }

    candidates
}

pub fn componentize(doc: &HtmlDoc) -> ComponentTree {
    let body_children = get_body_children(doc);
    let candidates = collect_candidates(&body_children);

    let mut components = Vec::new();
    let mut root_order = Vec::new();
    let mut name_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut id_counts: BTreeMap<String, usize> = BTreeMap::new();

    for (order, candidate) in candidates.iter().enumerate() {
        let el = candidate.node.as_element().unwrap();

        let heading = find_heading_text(el);
        let mut name = if candidate.is_wrapper_fallback {
            "Page".to_string()
        } else if let Some(h) = &heading {
            truncate(h, 48)
        } else if let Some(primary) = el.classes().first() {
            humanize(primary)
        } else {
            format!("Section {}", order + 1)
        };

        if !candidate.is_wrapper_fallback && is_generic_name(&name) {
            let classes_joined = el.classes().join(" ").to_ascii_lowercase();
            let heading_lower = heading.as_deref().unwrap_or_default().to_ascii_lowercase();
            if let Some(overridden) = deterministic_name_override(&classes_joined, &heading_lower) {
                name = overridden.to_string();
            }
        }

        let count = name_counts.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            name = format!("{name} {count}");
        }

        let component_type =
            if candidate.is_wrapper_fallback { ComponentType::Wrapper } else { infer_component_type(el, order) };

        let slug_base = slugify(&name);
        let id_count = id_counts.entry(slug_base.clone()).or_insert(0);
        *id_count += 1;
        let id = if *id_count == 1 { slug_base } else { format!("{slug_base}-{id_count}") };

        let html_content = flowbridge_html::serialize(std::slice::from_ref(&candidate.node));

        root_order.push(id.clone());
        components.push(Component {
            id,
            name,
            component_type,
            tag: el.tag.clone(),
            primary_class: el.classes().first().cloned(),
            html_content,
            classes_used: collect_classes(el),
            assets_used: collect_assets(el),
            js_hooks: collect_js_hooks(el),
            children: Vec::new(),
            order,
        });
    }

    ComponentTree { components, root_order, warnings: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_hero_page_yields_one_hero_component() {
        let doc = flowbridge_html::parse(
            "<!doctype html><html><body><section class=\"hero\"><h1>Hi</h1></section></body></html>",
        );
        let tree = componentize(&doc);
        assert_eq!(tree.components.len(), 1);
        assert_eq!(tree.components[0].name, "Hi");
        assert_eq!(tree.components[0].component_type, ComponentType::Hero);
    }

    #[test]
    fn no_candidates_falls_back_to_one_wrapper() {
        let doc = flowbridge_html::parse("<div>just some content</div>");
        let tree = componentize(&doc);
        assert_eq!(tree.components.len(), 1);
        assert_eq!(tree.components[0].component_type, ComponentType::Wrapper);
        assert_eq!(tree.components[0].name, "Page");
    }

    #[test]
    fn main_is_unwrapped_one_level() {
        let doc = flowbridge_html::parse(
            "<body><main><section class=\"hero\"><h1>A</h1></section><footer>f</footer></main></body>",
        );
        let tree = componentize(&doc);
        assert_eq!(tree.components.len(), 2);
        assert_eq!(tree.components[1].component_type, ComponentType::Footer);
    }

    #[test]
    fn duplicate_names_get_numeric_suffix() {
        let doc = flowbridge_html::parse(
            "<body><section class=\"section-a\">x</section><section class=\"section-b\">y</section></body>",
        );
        let tree = componentize(&doc);
        assert_eq!(tree.components[0].name, "Section A");
        assert_eq!(tree.components[1].name, "Section B");
    }
}
