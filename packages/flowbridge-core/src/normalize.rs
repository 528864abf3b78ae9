//! The HTML/CSS normalizer (§4.3): rewrites the parsed tree and the parsed
//! stylesheet so every element the target cares about carries a class, and
//! every rule becomes `.class[:pseudo] { … }`. Steps run in the order §4.3
//! lists them; none abort, every change is appended to the issue log.

use std::collections::BTreeMap;

use flowbridge_css::{
    build_class_index, classify_selector, extract_token_manifest, literalize_declarations_with_depth,
    parse_stylesheet_with_breakpoints, round_gradient_percentages, Breakpoint, ClassIndex, Combinator,
    Declarations, SelectorKind, TokenManifest,
};
use flowbridge_html::{Attributes, Element, HtmlDoc, HtmlNode};

use crate::config::PipelineConfig;
use crate::validation::{self, codes, Issue, ValidationResult};

/// Canonical `tag → wf-<tag>` map (§4.3 step 7).
const CANONICAL_TAG_CLASSES: &[(&str, &str)] = &[
    ("section", "wf-section"),
    ("nav", "wf-nav"),
    ("header", "wf-header"),
    ("footer", "wf-footer"),
    ("main", "wf-main"),
    ("article", "wf-article"),
    ("aside", "wf-aside"),
    ("body", "wf-body"),
];

pub struct NormalizeOutput {
    pub html: HtmlDoc,
    pub class_index: ClassIndex,
    pub tokens: TokenManifest,
    pub issues: ValidationResult,
}

/// Concatenates every `<style>` element's text content, and every inline
/// (non-`src`) `<script>` element's text content, in document order.
fn extract_inline_assets(doc: &HtmlDoc) -> (String, String) {
    let mut css = String::new();
    let mut js = String::new();
    doc.walk(|node| {
        if let HtmlNode::Element(el) = node {
            if el.tag.eq_ignore_ascii_case("style") {
                css.push_str(&el.text_content());
                css.push('\n');
            } else if el.tag.eq_ignore_ascii_case("script") && !el.attributes.has("src") {
                js.push_str(&el.text_content());
                js.push('\n');
            }
        }
    });
    (css, js)
}

/// Step 2: strip inline event handlers and `contenteditable`.
fn strip_problematic_attributes(el: &mut Element, issues: &mut ValidationResult) {
    let offending: Vec<String> = el
        .attributes
        .iter()
        .filter(|a| a.name.to_ascii_lowercase().starts_with("on") || a.name.eq_ignore_ascii_case("contenteditable"))
        .map(|a| a.name.clone())
        .collect();
    for name in offending {
        el.attributes.remove(&name);
        issues.push(
            Issue::info(codes::BROKEN_INTERACTION_STRIPPED, format!("removed attribute {name}"))
                .with_location(el.tag.clone()),
        );
    }
}

/// Step 3: `<br>` inside a heading becomes a block-display span (avoids the
/// documented reactive-runtime crash).
fn fix_heading_br(children: &mut [HtmlNode]) {
    for child in children.iter_mut() {
        if let HtmlNode::Element(el) = child {
            if el.tag.eq_ignore_ascii_case("br") {
                let mut attrs = Attributes::default();
                attrs.set("style", "display:block");
                *child = HtmlNode::element("span", attrs);
            }
        }
    }
    for child in children.iter_mut() {
        if let HtmlNode::Element(el) = child {
            fix_heading_br(&mut el.children);
        }
    }
}

fn apply_heading_br_fix(doc: &mut HtmlDoc) {
    doc.walk_mut(|node| {
        if let HtmlNode::Element(el) = node {
            if is_heading_tag(&el.tag) {
                fix_heading_br(&mut el.children);
            }
        }
    });
}

fn is_heading_tag(tag: &str) -> bool {
    matches!(tag.to_ascii_lowercase().as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Steps 4+5: resolve `var()` inside gradients and round their stops, then
/// literalize every remaining `var()` reference across the whole index.
fn literalize_and_sanitize(
    index: &mut ClassIndex,
    tokens: &TokenManifest,
    max_var_resolution_depth: usize,
    issues: &mut ValidationResult,
) {
    let sanitize = |decls: &mut Declarations| {
        for d in decls.0.iter_mut() {
            if d.value.to_ascii_lowercase().contains("gradient(") {
                let resolved = flowbridge_css::literalize_with_depth(&d.value, tokens, max_var_resolution_depth);
                d.value = round_gradient_percentages(&resolved);
            }
        }
        let (literalized, warnings) = literalize_declarations_with_depth(decls, tokens, max_var_resolution_depth);
        *decls = literalized;
        for w in warnings {
            issues.push(Issue::warning(codes::UNRESOLVED_CSS_VARIABLE, w));
        }
    };

    for entry in index.classes.values_mut() {
        sanitize(&mut entry.base);
        for decls in entry.narrow.values_mut() {
            sanitize(decls);
        }
        for decls in entry.pseudo_states.values_mut() {
            sanitize(decls);
        }
        // Pseudo-elements are dropped wholesale per §4.4; not sanitized here.
    }
}

fn canonical_tag_class(tag: &str) -> Option<&'static str> {
    let lower = tag.to_ascii_lowercase();
    CANONICAL_TAG_CLASSES.iter().find(|(t, _)| *t == lower).map(|(_, c)| *c)
}

fn has_class_prefixed(el: &Element, prefix: &str) -> bool {
    el.classes().iter().any(|c| c.starts_with(prefix))
}

/// Step 7 (tag half): injects `wf-<tag>`, `heading-h<N>`, or `text-body`
/// classes on every matching element, and folds the originating tag-level
/// CSS rule's declarations into that synthetic class.
fn rewrite_tag_selectors(doc: &mut HtmlDoc, index: &mut ClassIndex, rules: &[flowbridge_css::ParsedRule]) {
    for parsed in rules {
        let SelectorKind::Tag(tag) = &parsed.rule.kind else { continue };
        let synthetic = if let Some(wf) = canonical_tag_class(tag) {
            Some(wf.to_string())
        } else if is_heading_tag(tag) {
            let n = tag.chars().last().unwrap_or('1');
            Some(format!("heading-h{n}"))
        } else if tag.eq_ignore_ascii_case("p") {
            Some("text-body".to_string())
        } else {
            None
        };
        let Some(synthetic) = synthetic else { continue };

        let entry = index.classes.entry(synthetic.clone()).or_default();
        for d in parsed.rule.properties.iter() {
            entry.base.set(d.name.clone(), d.value.clone());
        }

        let is_fallback_class = synthetic == "heading-h1"
            || synthetic.starts_with("heading-h")
            || synthetic == "text-body";
        let guard_prefix = if synthetic.starts_with("heading-") {
            Some("heading-")
        } else if synthetic == "text-body" {
            Some("text-")
        } else {
            None
        };

        doc.walk_mut(|node| {
            if let HtmlNode::Element(el) = node {
                if el.tag.eq_ignore_ascii_case(tag) {
                    let skip = is_fallback_class
                        && guard_prefix.is_some_and(|p| has_class_prefixed(el, p));
                    if !skip {
                        el.add_class(&synthetic);
                    }
                }
            }
        });
    }
}

fn descendant_token_class(kind: &SelectorKind) -> Option<(String, Option<String>)> {
    match kind {
        SelectorKind::PureClass(c) => Some((c.clone(), None)),
        SelectorKind::Tag(t) => Some((canonical_tag_class(t).unwrap_or(t).to_string(), Some(t.clone()))),
        SelectorKind::TagClass { tag, class } => Some((class.clone(), Some(tag.clone()))),
        _ => None,
    }
}

/// Step 7 (descendant half): `.parent .child`/`.parent > .child` flatten to
/// a synthetic `parent-child` class assigned to every matching descendant at
/// rewrite time; `.parent tag` uses the same canonical tag table.
fn rewrite_descendant_selectors(
    doc: &mut HtmlDoc,
    index: &mut ClassIndex,
    rules: &[flowbridge_css::ParsedRule],
    issues: &mut ValidationResult,
) {
    for parsed in rules {
        let SelectorKind::Descendant { ancestor, child, combinator } = &parsed.rule.kind else {
            continue;
        };
        let ancestor_kind = classify_selector(ancestor);
        let child_kind = classify_selector(child);
        let (Some((ancestor_name, _)), Some((child_name, child_tag))) =
            (descendant_token_class(&ancestor_kind), descendant_token_class(&child_kind))
        else {
            issues.push(Issue::info(
                codes::UNCLASSED_SELECTOR_DROPPED,
                format!("descendant selector '{}' could not be flattened", parsed.rule.selector),
            ));
            continue;
        };

        let synthetic = format!("{ancestor_name}-{child_name}");
        let entry = index.classes.entry(synthetic.clone()).or_default();
        for d in parsed.rule.properties.iter() {
            entry.base.set(d.name.clone(), d.value.clone());
        }

        let direct_only = matches!(combinator, Combinator::Child);
        assign_descendant_class(doc, &ancestor_name, child_tag.as_deref(), &child_name, direct_only, &synthetic);
    }
}

fn assign_descendant_class(
    doc: &mut HtmlDoc,
    ancestor_class: &str,
    child_tag: Option<&str>,
    child_class: &str,
    direct_only: bool,
    synthetic: &str,
) {
    fn walk(
        node: &mut HtmlNode,
        inside_ancestor: bool,
        depth_since_ancestor: usize,
        ancestor_class: &str,
        child_tag: Option<&str>,
        child_class: &str,
        direct_only: bool,
        synthetic: &str,
    ) {
        if let HtmlNode::Element(el) = node {
            let this_is_ancestor = el.has_class(ancestor_class);
            let now_inside = inside_ancestor || this_is_ancestor;
            let depth = if this_is_ancestor { 0 } else { depth_since_ancestor + 1 };

            if now_inside && !this_is_ancestor && (!direct_only || depth == 1) {
                let matches_tag = child_tag.is_some_and(|t| el.tag.eq_ignore_ascii_case(t));
                let matches_class = el.has_class(child_class);
                if matches_tag || matches_class {
                    el.add_class(synthetic);
                }
            }

            for child in el.children.iter_mut() {
                walk(child, now_inside, depth, ancestor_class, child_tag, child_class, direct_only, synthetic);
            }
        }
    }
    doc.walk_mut(|node| {
        walk(node, false, 0, ancestor_class, child_tag, child_class, direct_only, synthetic)
    });
}

/// Step 8: if any `body { … }` rule existed, wrap the whole document in
/// `<div class="wf-body">`.
fn wrap_body_if_needed(doc: &mut HtmlDoc, had_body_rule: bool) {
    if !had_body_rule || doc.roots.iter().any(|n| matches!(n, HtmlNode::Element(e) if e.has_class("wf-body"))) {
        return;
    }
    let mut attrs = Attributes::default();
    attrs.set("class", "wf-body");
    let mut wrapper = Element::new("div", attrs);
    wrapper.children = std::mem::take(&mut doc.roots);
    doc.roots = vec![HtmlNode::Element(wrapper)];
}

/// Step 9: assigns a BEM-style class to every classless `<div>`, derived from
/// its nearest classed ancestor.
fn name_classless_divs(doc: &mut HtmlDoc) {
    fn walk(node: &mut HtmlNode, ancestor_block: Option<&str>, counters: &mut BTreeMap<String, usize>) {
        if let HtmlNode::Element(el) = node {
            let mut block_for_children = ancestor_block.map(|s| s.to_string());
            if el.tag.eq_ignore_ascii_case("div") && el.classes().is_empty() {
                if let Some(block) = ancestor_block {
                    let base = format!("{block}__content");
                    let count = counters.entry(base.clone()).or_insert(0);
                    *count += 1;
                    let name = if *count == 1 { base } else { format!("{base}-{count}") };
                    el.add_class(&name);
                    block_for_children = Some(name);
                }
            } else if let Some(primary) = el.classes().first() {
                block_for_children = Some(primary.clone());
            }
            for child in el.children.iter_mut() {
                walk(child, block_for_children.as_deref(), counters);
            }
        }
    }
    let mut counters = BTreeMap::new();
    doc.walk_mut(|node| walk(node, None, &mut counters));
}

/// Collects every `id` and `class` actually present on an element in the
/// final tree, the ground truth the JS cross-reference pass (§4.5) checks
/// extracted script references against.
fn collect_live_ids_and_classes(doc: &HtmlDoc) -> (std::collections::HashSet<String>, std::collections::HashSet<String>) {
    let mut ids = std::collections::HashSet::new();
    let mut classes = std::collections::HashSet::new();
    doc.walk(|node| {
        if let HtmlNode::Element(el) = node {
            if let Some(id) = el.id() {
                ids.insert(id.to_string());
            }
            classes.extend(el.classes());
        }
    });
    (ids, classes)
}

/// Step 10: inject the site-default `font-family` into any class required by
/// headings/paragraphs/buttons that is still missing one.
fn apply_typography_fallback(doc: &HtmlDoc, index: &mut ClassIndex) {
    let default_family = index
        .classes
        .get("wf-body")
        .and_then(|e| e.base.get("font-family"))
        .map(|s| s.to_string())
        .or_else(|| index.classes.values().find_map(|e| e.base.get("font-family").map(|s| s.to_string())));

    let Some(family) = default_family else { return };

    let mut needing_fallback: Vec<String> = Vec::new();
    doc.walk(|node| {
        if let HtmlNode::Element(el) = node {
            let is_typographic = is_heading_tag(&el.tag)
                || el.tag.eq_ignore_ascii_case("p")
                || el.tag.eq_ignore_ascii_case("button");
            if is_typographic {
                needing_fallback.extend(el.classes());
            }
        }
    });

    for class in needing_fallback {
        let entry = index.classes.entry(class).or_default();
        if entry.base.get("font-family").is_none() {
            entry.base.set("font-family", family.clone());
        }
    }
}

pub fn normalize(raw_html: &str, config: &PipelineConfig) -> NormalizeOutput {
    let mut issues = ValidationResult::default();

    let mut doc = flowbridge_html::parse_with_depth(raw_html, config.max_html_depth);
    for w in &doc.warnings {
        issues.push(Issue::info(codes::EXCESSIVE_DEPTH, w.clone()));
    }

    let (css_text, js_text) = extract_inline_assets(&doc);
    let stylesheet = parse_stylesheet_with_breakpoints(&css_text, &config.breakpoints);
    for w in &stylesheet.warnings {
        issues.push(Issue::warning(codes::MEDIA_QUERY_DROPPED, w.clone()));
    }

    let tokens = extract_token_manifest(&stylesheet.rules);
    let mut class_index = build_class_index(&stylesheet.rules);
    for selector in &class_index.unindexed.clone() {
        if matches!(classify_selector(selector), SelectorKind::Other(_)) {
            issues.push(Issue::info(
                codes::UNCLASSED_SELECTOR_DROPPED,
                format!("selector '{selector}' retained unchanged (normalizer could not flatten)"),
            ));
        }
    }

    let had_body_rule = stylesheet
        .rules
        .iter()
        .any(|r| matches!(&r.rule.kind, SelectorKind::Tag(t) if t.eq_ignore_ascii_case("body")));

    doc.walk_mut(|node| {
        if let HtmlNode::Element(el) = node {
            strip_problematic_attributes(el, &mut issues);
        }
    });
    apply_heading_br_fix(&mut doc);

    literalize_and_sanitize(&mut class_index, &tokens, config.max_var_resolution_depth, &mut issues);

    let decouple_result = crate::decouple::decouple(&mut class_index, &config.decoupler_suffix);
    for (class, suffix_class) in &decouple_result.injected {
        crate::decouple::inject_background_div(&mut doc, class, suffix_class);
    }
    issues.extend(decouple_result.issues);

    rewrite_tag_selectors(&mut doc, &mut class_index, &stylesheet.rules);
    rewrite_descendant_selectors(&mut doc, &mut class_index, &stylesheet.rules, &mut issues);

    wrap_body_if_needed(&mut doc, had_body_rule);
    name_classless_divs(&mut doc);
    apply_typography_fallback(&doc, &mut class_index);

    if !js_text.trim().is_empty() {
        let refs = validation::extract_js_references(&js_text);
        let (live_ids, live_classes) = collect_live_ids_and_classes(&doc);
        for issue in validation::cross_reference_js(&refs, &live_ids, &live_classes) {
            issues.push(issue);
        }
    }

    NormalizeOutput { html: doc, class_index, tokens, issues }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_inline_handlers_and_contenteditable() {
        let cfg = PipelineConfig::default();
        let out = normalize(r#"<div onclick="go()" contenteditable="true">x</div>"#, &cfg);
        let el = out.html.roots[0].as_element().unwrap();
        assert!(!el.attributes.has("onclick"));
        assert!(!el.attributes.has("contenteditable"));
    }

    #[test]
    fn heading_br_becomes_block_span() {
        let cfg = PipelineConfig::default();
        let out = normalize("<h1>line one<br>line two</h1>", &cfg);
        let h1 = out.html.roots[0].as_element().unwrap();
        assert!(h1.children.iter().any(|c| matches!(c, HtmlNode::Element(e) if e.tag == "span")));
    }

    #[test]
    fn tag_selector_injects_canonical_class() {
        let cfg = PipelineConfig::default();
        let out = normalize("<style>section { padding: 8px; }</style><section>x</section>", &cfg);
        let section = out.html.roots[1].as_element().unwrap();
        assert!(section.has_class("wf-section"));
        assert_eq!(out.class_index.classes.get("wf-section").unwrap().base.get("padding-top"), Some("8px"));
    }

    #[test]
    fn classless_div_gets_bem_name() {
        let cfg = PipelineConfig::default();
        let out = normalize(r#"<div class="card"><div>inner</div></div>"#, &cfg);
        let card = out.html.roots[0].as_element().unwrap();
        let inner = card.children[0].as_element().unwrap();
        assert_eq!(inner.classes(), vec!["card__content".to_string()]);
    }

    #[test]
    fn custom_breakpoint_thresholds_reach_the_css_parser() {
        let cfg = PipelineConfig::default().with_breakpoints(flowbridge_css::BreakpointThresholds {
            small_max_px: 600.0,
            ..Default::default()
        });
        let html = r#"<style>.card { color: red; } @media (max-width: 650px) { .card { color: blue; } }</style><div class="card">x</div>"#;
        let out = normalize(html, &cfg);
        let entry = out.class_index.classes.get("card").unwrap();
        assert!(entry.narrow.contains_key(&flowbridge_css::Breakpoint::Medium));
        assert!(!entry.narrow.contains_key(&flowbridge_css::Breakpoint::Small));
    }

    #[test]
    fn shallow_var_resolution_depth_leaves_deep_chains_unresolved() {
        let cfg = PipelineConfig::default().with_max_var_resolution_depth(1);
        let html = r#"<style>:root { --a: var(--b); --b: var(--c); --c: 4px; } .card { padding: var(--a); }</style><div class="card">x</div>"#;
        let out = normalize(html, &cfg);
        assert!(out.issues.issues.iter().any(|i| i.code == codes::UNRESOLVED_CSS_VARIABLE));
    }

    #[test]
    fn body_rule_triggers_wrapper_synthesis() {
        let cfg = PipelineConfig::default();
        let out = normalize("<style>body { background: red; }</style><section>x</section>", &cfg);
        assert_eq!(out.html.roots.len(), 1);
        let wrapper = out.html.roots[0].as_element().unwrap();
        assert!(wrapper.has_class("wf-body"));
    }

    #[test]
    fn orphan_js_reference_is_reported() {
        let cfg = PipelineConfig::default();
        let html = r#"<script>document.getElementById('missing-button').addEventListener('click', go);</script><div id="present">x</div>"#;
        let out = normalize(html, &cfg);
        assert!(out.issues.issues.iter().any(|i| i.code == codes::ORPHAN_ID_REFERENCE));
    }

    #[test]
    fn js_reference_to_live_id_is_not_flagged() {
        let cfg = PipelineConfig::default();
        let html = r#"<script>document.getElementById('present').addEventListener('click', go);</script><div id="present">x</div>"#;
        let out = normalize(html, &cfg);
        assert!(!out.issues.issues.iter().any(|i| i.code == codes::ORPHAN_ID_REFERENCE));
    }
}
