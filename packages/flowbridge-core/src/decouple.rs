//! Gradient/transform decoupler (§4.6). The target's renderer drops a
//! gradient-bearing background layer when the same element also carries a
//! transform — this pass splits the two into a parent/child pair before
//! that race can ever happen.

use flowbridge_css::{Breakpoint, ClassEntry, ClassIndex, Declarations};
use flowbridge_html::{Attributes, HtmlDoc, HtmlNode};

use crate::validation::{codes, Issue, ValidationResult};

pub struct DecoupleResult {
    /// `(original_class, background_child_class)` pairs to inject into HTML.
    pub injected: Vec<(String, String)>,
    pub issues: ValidationResult,
}

fn has_gradient(decls: &Declarations) -> bool {
    decls
        .get("background-image")
        .or_else(|| decls.get("background"))
        .is_some_and(|v| v.to_ascii_lowercase().contains("gradient("))
}

fn has_transform_conflict(decls: &Declarations) -> bool {
    decls.get("transform").is_some()
        || decls.get("will-change").is_some_and(|v| v.to_ascii_lowercase().contains("transform"))
        || decls.0.iter().any(|d| d.name.to_ascii_lowercase().starts_with("transition"))
}

fn qualifies(decls: &Declarations) -> bool {
    has_gradient(decls) && has_transform_conflict(decls)
}

fn is_background_prop(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "background"
        || lower.starts_with("background-image")
        || lower.starts_with("background-position")
        || lower.starts_with("background-size")
        || lower.starts_with("background-repeat")
        || lower.starts_with("background-attachment")
        || lower.starts_with("background-color")
}

fn is_shared_prop(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("border-radius") || lower.starts_with("overflow")
}

/// Splits one declaration set into `(parent, child)`, duplicating shared
/// layout properties (`border-radius*`, `overflow*`) onto both.
fn split_declarations(src: &Declarations) -> (Declarations, Declarations) {
    let mut parent = Declarations::default();
    let mut child = Declarations::default();
    for d in src.iter() {
        if is_background_prop(&d.name) {
            child.set(d.name.clone(), d.value.clone());
        } else {
            parent.set(d.name.clone(), d.value.clone());
        }
        if is_shared_prop(&d.name) {
            child.set(d.name.clone(), d.value.clone());
        }
    }
    (parent, child)
}

fn finalize_base_split(src: &Declarations) -> (Declarations, Declarations) {
    let (mut parent, mut child) = split_declarations(src);
    if parent.get("position").is_none() {
        parent.set("position", "relative");
    }
    child.set("position", "absolute");
    child.set("inset", "0");
    child.set("z-index", "-1");
    (parent, child)
}

/// Splits every class in `index` that carries both a gradient and a
/// transform-family property (§4.6), mutating the original class in place
/// and inserting a new `<class><suffix>` class for the gradient layer.
pub fn decouple(index: &mut ClassIndex, suffix: &str) -> DecoupleResult {
    let mut issues = ValidationResult::default();
    let mut injected = Vec::new();

    let candidates: Vec<String> =
        index.classes.iter().filter(|(_, e)| qualifies(&e.base)).map(|(k, _)| k.clone()).collect();

    for class in candidates {
        let bg_class = format!("{class}{suffix}");
        if index.classes.contains_key(&bg_class) {
            issues.push(Issue::warning(
                codes::DECOUPLER_COLLISION,
                format!("'{bg_class}' already exists; skipping decoupling for '{class}'"),
            ));
            continue;
        }

        let entry = index.classes.get(&class).unwrap().clone();
        let (parent_base, child_base) = finalize_base_split(&entry.base);

        let mut bg_entry = ClassEntry { base: child_base, ..ClassEntry::default() };
        let mut narrow_parents: Vec<(Breakpoint, Declarations)> = Vec::new();
        for (tier, decls) in &entry.narrow {
            let (p, c) = split_declarations(decls);
            narrow_parents.push((*tier, p));
            bg_entry.narrow.insert(*tier, c);
        }
        for (state, decls) in &entry.pseudo_states {
            let (_, c) = split_declarations(decls);
            if !c.is_empty() {
                bg_entry.pseudo_states.insert(state.clone(), c);
            }
        }

        let parent_entry = index.classes.get_mut(&class).unwrap();
        parent_entry.base = parent_base;
        for (tier, decls) in narrow_parents {
            parent_entry.narrow.insert(tier, decls);
        }

        index.classes.insert(bg_class.clone(), bg_entry);
        injected.push((class, bg_class));
    }

    DecoupleResult { injected, issues }
}

/// Injects `<div class="<bg_class>"></div>` as the first child of every
/// element bearing `class`.
pub fn inject_background_div(doc: &mut HtmlDoc, class: &str, bg_class: &str) {
    doc.walk_mut(|node| {
        if let HtmlNode::Element(el) = node {
            if el.has_class(class) {
                let mut attrs = Attributes::default();
                attrs.set("class", bg_class);
                el.children.insert(0, HtmlNode::element("div", attrs));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbridge_css::{build_class_index, parse_stylesheet};

    #[test]
    fn splits_gradient_and_transform_into_parent_child() {
        let sheet = parse_stylesheet(
            ".card { background: linear-gradient(red, blue); transform: scale(1.05); }",
        );
        let mut index = build_class_index(&sheet.rules);
        let result = decouple(&mut index, "-bg");
        assert_eq!(result.injected, vec![("card".to_string(), "card-bg".to_string())]);

        let card = index.classes.get("card").unwrap();
        assert_eq!(card.base.get("position"), Some("relative"));
        assert_eq!(card.base.get("transform"), Some("scale(1.05)"));
        assert!(card.base.get("background-image").is_none());

        let bg = index.classes.get("card-bg").unwrap();
        assert_eq!(bg.base.get("position"), Some("absolute"));
        assert_eq!(bg.base.get("inset"), Some("0"));
        assert_eq!(bg.base.get("z-index"), Some("-1"));
        assert_eq!(bg.base.get("background-image"), Some("linear-gradient(red, blue)"));
    }

    #[test]
    fn collision_aborts_with_warning() {
        let sheet = parse_stylesheet(
            ".card { background: linear-gradient(red, blue); transform: scale(1.05); } \
             .card-bg { color: red; }",
        );
        let mut index = build_class_index(&sheet.rules);
        let result = decouple(&mut index, "-bg");
        assert!(result.injected.is_empty());
        assert_eq!(result.issues.issues.len(), 1);
    }

    #[test]
    fn non_qualifying_class_is_untouched() {
        let sheet = parse_stylesheet(".plain { color: red; }");
        let mut index = build_class_index(&sheet.rules);
        let result = decouple(&mut index, "-bg");
        assert!(result.injected.is_empty());
    }
}
