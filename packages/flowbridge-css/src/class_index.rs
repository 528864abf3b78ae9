//! Aggregates parsed rules into a per-class index with resolved
//! mobile-first → desktop-first tiers and pseudo-state/pseudo-element
//! variants (§4.2, §3).

use std::collections::BTreeMap;

use crate::parser::ParsedRule;
use crate::rule::{Breakpoint, Declarations, SelectorKind};

const PSEUDO_ELEMENTS: &[&str] =
    &["before", "after", "first-line", "first-letter", "placeholder", "selection", "marker"];

pub fn is_pseudo_element(name: &str) -> bool {
    PSEUDO_ELEMENTS.contains(&name.trim_start_matches(':'))
}

/// Everything this tool knows about a single class name after merging all
/// rules that target it.
#[derive(Clone, Debug, Default)]
pub struct ClassEntry {
    pub base: Declarations,
    /// Tiny/Small/Medium only — Large/Xl/Xxl promote into `base` (§4.2).
    pub narrow: BTreeMap<Breakpoint, Declarations>,
    /// Interactive/state variants: `:hover`, `:focus`, `:active`, ...
    pub pseudo_states: BTreeMap<String, Declarations>,
    /// `::before`, `::after`, ... — unsupported by the target scene graph;
    /// kept so the safety gate can report them, never emitted as variants.
    pub pseudo_elements: BTreeMap<String, Declarations>,
}

#[derive(Clone, Debug, Default)]
pub struct ClassIndex {
    pub classes: BTreeMap<String, ClassEntry>,
    /// Rules this index could not attach to a class (tag/descendant/other
    /// selectors) — not a failure, just out of scope for class-based
    /// styling; surfaced as info-level issues upstream.
    pub unindexed: Vec<String>,
}

fn merge_into(target: &mut Declarations, src: &Declarations) {
    for d in src.iter() {
        target.set(d.name.clone(), d.value.clone());
    }
}

/// Backfills `snapshot`'s declarations into every narrow tier, without
/// overwriting a value the tier already set for itself (§4.2: a narrower
/// breakpoint's own declarations always win over a backfilled base value).
fn backfill_narrow_tiers(entry: &mut ClassEntry, snapshot: &Declarations) {
    for tier in Breakpoint::narrow_tiers() {
        let tier_decls = entry.narrow.entry(*tier).or_default();
        for d in snapshot.iter() {
            if tier_decls.get(&d.name).is_none() {
                tier_decls.set(d.name.clone(), d.value.clone());
            }
        }
    }
}

/// Overlays `patch` on top of `base`, declaration-by-declaration, per class
/// (§4.8: a `replaceFinalCss` semantic patch becomes "the CSS feeding the
/// emitter" — applied as an overlay so untouched classes keep their
/// normally-resolved declarations rather than disappearing).
pub fn overlay(base: &ClassIndex, patch: &ClassIndex) -> ClassIndex {
    let mut merged = base.clone();
    for (name, patch_entry) in &patch.classes {
        let entry = merged.classes.entry(name.clone()).or_default();
        merge_into(&mut entry.base, &patch_entry.base);
        for (tier, decls) in &patch_entry.narrow {
            merge_into(entry.narrow.entry(*tier).or_default(), decls);
        }
        for (state, decls) in &patch_entry.pseudo_states {
            merge_into(entry.pseudo_states.entry(state.clone()).or_default(), decls);
        }
        for (el, decls) in &patch_entry.pseudo_elements {
            merge_into(entry.pseudo_elements.entry(el.clone()).or_default(), decls);
        }
    }
    merged
}

pub fn build_class_index(rules: &[ParsedRule]) -> ClassIndex {
    let mut classes: BTreeMap<String, ClassEntry> = BTreeMap::new();
    let mut unindexed = Vec::new();

    for parsed in rules {
        let rule = &parsed.rule;
        let (class_name, pseudo) = match &rule.kind {
            SelectorKind::PureClass(c) => (c.clone(), None),
            SelectorKind::PseudoClass { class, pseudo } => (class.clone(), Some(pseudo.clone())),
            _ => {
                unindexed.push(rule.selector.clone());
                continue;
            }
        };

        let entry = classes.entry(class_name).or_default();

        if let Some(pseudo) = pseudo {
            if is_pseudo_element(&pseudo) {
                let decls = entry.pseudo_elements.entry(pseudo).or_default();
                merge_into(decls, &rule.properties);
            } else {
                let decls = entry.pseudo_states.entry(pseudo).or_default();
                merge_into(decls, &rule.properties);
            }
            continue;
        }

        match rule.media {
            None if parsed.promoted => {
                let snapshot = entry.base.clone();
                backfill_narrow_tiers(entry, &snapshot);
                merge_into(&mut entry.base, &rule.properties);
            }
            None => merge_into(&mut entry.base, &rule.properties),
            Some(tier) => {
                let tier_decls = entry.narrow.entry(tier).or_default();
                merge_into(tier_decls, &rule.properties);
            }
        }
    }

    ClassIndex { classes, unindexed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    #[test]
    fn merges_declarations_across_rules_for_same_class() {
        let sheet = parse_stylesheet(".card { color: red; } .card { background: blue; }");
        let idx = build_class_index(&sheet.rules);
        let card = idx.classes.get("card").unwrap();
        assert_eq!(card.base.get("color"), Some("red"));
        assert_eq!(card.base.get("background-color"), Some("blue"));
    }

    #[test]
    fn promotion_backfills_narrow_tiers_without_overwriting() {
        let css = ".card { color: red; } \
                   @media (max-width: 767px) { .card { color: green; } } \
                   @media (min-width: 992px) { .card { color: blue; font-size: 20px; } }";
        let sheet = parse_stylesheet(css);
        let idx = build_class_index(&sheet.rules);
        let card = idx.classes.get("card").unwrap();
        assert_eq!(card.base.get("color"), Some("blue"));
        assert_eq!(card.base.get("font-size"), Some("20px"));
        let small = card.narrow.get(&Breakpoint::Small).unwrap();
        assert_eq!(small.get("color"), Some("green"));
        assert_eq!(small.get("font-size"), Some("20px"));
    }

    #[test]
    fn pseudo_state_and_pseudo_element_are_separated() {
        let sheet = parse_stylesheet(".btn:hover { color: red; } .btn::after { content: \"x\"; }");
        let idx = build_class_index(&sheet.rules);
        let btn = idx.classes.get("btn").unwrap();
        assert!(btn.pseudo_states.contains_key("hover"));
        assert!(btn.pseudo_elements.contains_key("after"));
    }

    #[test]
    fn non_class_selectors_are_recorded_as_unindexed() {
        let sheet = parse_stylesheet("h1 { color: red; }");
        let idx = build_class_index(&sheet.rules);
        assert!(idx.classes.is_empty());
        assert_eq!(idx.unindexed, vec!["h1".to_string()]);
    }

    #[test]
    fn overlay_patches_only_named_classes() {
        let base = build_class_index(&parse_stylesheet(".card { color: red; } .nav { display: flex; }").rules);
        let patch = build_class_index(&parse_stylesheet(".card { color: blue; }").rules);
        let merged = overlay(&base, &patch);
        assert_eq!(merged.classes.get("card").unwrap().base.get("color"), Some("blue"));
        assert_eq!(merged.classes.get("nav").unwrap().base.get("display"), Some("flex"));
    }
}
