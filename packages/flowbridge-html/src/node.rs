//! The HTML tree shape of §3: `Element`, `Text`, and `Comment` nodes.

use std::ops::{Deref, DerefMut};

/// A tag attribute, e.g. `class="card"` in `<div class="card">`.
///
/// Names are preserved verbatim (case-preserving) as they appeared in the
/// source; values are kept as plain strings, unescaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Case-preserving, order-preserving attribute list. Setting an attribute
/// that already exists updates it in place rather than appending a
/// duplicate.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    inner: Vec<Attribute>,
}

impl Attributes {
    pub fn new(inner: Vec<Attribute>) -> Self {
        Self { inner }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .inner
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            existing.value = value;
        } else {
            self.inner.push(Attribute {
                name: name.to_string(),
                value,
            });
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let idx = self
            .inner
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))?;
        Some(self.inner.remove(idx))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl Deref for Attributes {
    type Target = Vec<Attribute>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl DerefMut for Attributes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Parses a `class="a  b a c"` value into an ordered, first-occurrence-wins
/// set of class tokens.
pub fn parse_class_tokens(value: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tok in value.split_ascii_whitespace() {
        if !out.iter().any(|existing| existing == tok) {
            out.push(tok.to_string());
        }
    }
    out
}

/// An element node: a tag, its id/classes (also mirrored into `attributes`),
/// arbitrary attributes, and children. Void tags never carry children.
#[derive(Clone, Debug)]
pub struct Element {
    pub tag: String,
    pub attributes: Attributes,
    pub children: Vec<HtmlNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            tag: tag.into(),
            attributes,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id")
    }

    pub fn classes(&self) -> Vec<String> {
        self.attributes
            .get("class")
            .map(parse_class_tokens)
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    pub fn set_classes(&mut self, classes: &[String]) {
        if classes.is_empty() {
            self.attributes.remove("class");
        } else {
            self.attributes.set("class", classes.join(" "));
        }
    }

    pub fn add_class(&mut self, class: &str) {
        let mut classes = self.classes();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_classes(&classes);
        }
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(children: &[HtmlNode], out: &mut String) {
    for child in children {
        match child {
            HtmlNode::Text(value) => out.push_str(value),
            HtmlNode::Element(el) => collect_text(&el.children, out),
            HtmlNode::Comment(_) => {}
        }
    }
}

/// A node in a parsed HTML tree (§3).
#[derive(Clone, Debug)]
pub enum HtmlNode {
    Element(Element),
    Text(String),
    Comment(String),
}

impl HtmlNode {
    pub fn element(tag: impl Into<String>, attributes: Attributes) -> Self {
        HtmlNode::Element(Element::new(tag, attributes))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            HtmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            HtmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn children(&self) -> &[HtmlNode] {
        match self {
            HtmlNode::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Depth-first preorder visitor over this node and its descendants.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a HtmlNode)) {
        visit(self);
        if let HtmlNode::Element(el) = self {
            for child in &el.children {
                child.walk(visit);
            }
        }
    }

    /// Depth-first preorder mutable visitor over this node and its descendants.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut HtmlNode)) {
        visit(self);
        if let HtmlNode::Element(el) = self {
            for child in &mut el.children {
                child.walk_mut(visit);
            }
        }
    }
}

/// A parsed document or fragment: a flat sequence of top-level nodes.
///
/// The document body/root elements (if any) appear as regular `Element`
/// nodes within `roots` — `HtmlDoc` does not impose an implicit wrapper.
#[derive(Clone, Debug, Default)]
pub struct HtmlDoc {
    pub roots: Vec<HtmlNode>,
    /// Non-fatal parser diagnostics (e.g. depth cap hit, mismatched close tag).
    pub warnings: Vec<String>,
}

impl HtmlDoc {
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a HtmlNode)) {
        for root in &self.roots {
            root.walk(&mut visit);
        }
    }

    pub fn walk_mut(&mut self, mut visit: impl FnMut(&mut HtmlNode)) {
        for root in &mut self.roots {
            root.walk_mut(&mut visit);
        }
    }

    /// Finds the first top-level `<body>` element, if any root is `<html>`
    /// or `<body>` directly.
    pub fn find_body(&self) -> Option<&Element> {
        fn search(node: &HtmlNode) -> Option<&Element> {
            if let HtmlNode::Element(el) = node {
                if el.tag.eq_ignore_ascii_case("body") {
                    return Some(el);
                }
                for child in &el.children {
                    if let Some(found) = search(child) {
                        return Some(found);
                    }
                }
            }
            None
        }
        self.roots.iter().find_map(search)
    }
}
