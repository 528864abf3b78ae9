//! CSS parser and selector classifier (§4.2).

use crate::rule::{Breakpoint, Combinator, CssRule, Declarations, SelectorKind};
use crate::scan::{find_brace_block, split_top_level, strip_comments};
use crate::shorthand::expand_shorthand;

/// The §4.2 breakpoint threshold table that `@media (max-width/min-width)`
/// preludes are classified against. A caller embedding this crate in a
/// different product can retune it per `parse_stylesheet_with_breakpoints`
/// without forking this module.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreakpointThresholds {
    pub tiny_max_px: f64,
    pub small_max_px: f64,
    pub medium_max_px: f64,
    pub large_min_px: f64,
    pub xl_min_px: f64,
    pub xxl_min_px: f64,
}

impl Default for BreakpointThresholds {
    fn default() -> Self {
        Self {
            tiny_max_px: 479.0,
            small_max_px: 767.0,
            medium_max_px: 991.0,
            large_min_px: 992.0,
            xl_min_px: 1280.0,
            xxl_min_px: 1440.0,
        }
    }
}

/// The result of classifying an `@media` prelude.
enum MediaOutcome {
    /// Maps onto one of the narrow breakpoint tags.
    Breakpoint(Breakpoint),
    /// A `min-width` query wide enough to promote into the base styles
    /// (§4.2: "min-width rules promote into base styles").
    Promote,
    /// No width axis in the feature list, or a width this tool does not
    /// recognize — the whole block is dropped with a warning.
    Unsupported,
}

/// A CSS rule tagged with whether it originated from a promoted `@media
/// (min-width...)` block. The class-index builder needs this bit to know
/// when to snapshot-and-backfill base styles into the narrow tiers (§4.2).
#[derive(Clone, Debug)]
pub struct ParsedRule {
    pub rule: CssRule,
    pub promoted: bool,
}

#[derive(Debug, Default)]
pub struct ParsedStylesheet {
    pub rules: Vec<ParsedRule>,
    pub warnings: Vec<String>,
}

/// Parses a complete (already `<style>`-concatenated) CSS string, classifying
/// `@media` preludes against the default breakpoint table.
pub fn parse_stylesheet(css: &str) -> ParsedStylesheet {
    parse_stylesheet_with_breakpoints(css, &BreakpointThresholds::default())
}

/// Same as [`parse_stylesheet`], with the `@media` breakpoint table
/// overridable — a caller embedding this crate in a different product can
/// retune it via `PipelineConfig::breakpoints` without forking this module.
pub fn parse_stylesheet_with_breakpoints(css: &str, thresholds: &BreakpointThresholds) -> ParsedStylesheet {
    let stripped = strip_comments(css);
    let mut rules = Vec::new();
    let mut warnings = Vec::new();
    parse_rules(&stripped, None, false, &mut rules, &mut warnings, thresholds);
    ParsedStylesheet { rules, warnings }
}

fn skip_ws(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn skip_unsupported_at_rule(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = pos;
    let mut paren_depth = 0i32;
    while i < len {
        match bytes[i] {
            b'(' => paren_depth += 1,
            b')' => paren_depth -= 1,
            b';' if paren_depth == 0 => return i + 1,
            b'{' if paren_depth == 0 => {
                return find_brace_block(text, i).map(|(_, c)| c + 1).unwrap_or(len);
            }
            _ => {}
        }
        i += 1;
    }
    len
}

fn parse_rules(
    text: &str,
    media: Option<Breakpoint>,
    inside_promoted: bool,
    out: &mut Vec<ParsedRule>,
    warnings: &mut Vec<String>,
    thresholds: &BreakpointThresholds,
) {
    let len = text.len();
    let mut pos = 0usize;
    loop {
        pos = skip_ws(text, pos);
        if pos >= len {
            break;
        }
        if text.as_bytes()[pos] == b';' || text.as_bytes()[pos] == b'}' {
            pos += 1;
            continue;
        }

        if text.as_bytes()[pos] == b'@' {
            let rest = &text[pos..];
            let name_end = rest[1..]
                .find(|c: char| c.is_whitespace() || c == '(' || c == '{' || c == ';')
                .map(|i| 1 + i)
                .unwrap_or(rest.len());
            let at_name = rest[1..name_end].to_ascii_lowercase();

            if at_name == "media" {
                match find_brace_block(text, pos) {
                    Some((open, close)) => {
                        let prelude = &text[pos + 1 + at_name.len()..open];
                        match classify_media_prelude(prelude, thresholds) {
                            MediaOutcome::Breakpoint(tag) => {
                                let inner = &text[open + 1..close];
                                parse_rules(inner, Some(tag), false, out, warnings, thresholds);
                            }
                            MediaOutcome::Promote => {
                                let inner = &text[open + 1..close];
                                parse_rules(inner, None, true, out, warnings, thresholds);
                            }
                            MediaOutcome::Unsupported => {
                                warnings.push(format!(
                                    "@media {} dropped: no recognized width axis",
                                    prelude.trim()
                                ));
                            }
                        }
                        pos = close + 1;
                    }
                    None => {
                        warnings.push("malformed @media block (no closing brace)".to_string());
                        pos = len;
                    }
                }
                continue;
            }

            warnings.push(format!("unsupported at-rule @{at_name} skipped"));
            pos = skip_unsupported_at_rule(text, pos);
            continue;
        }

        match find_brace_block(text, pos) {
            Some((open, close)) => {
                let selector_text = &text[pos..open];
                let body = &text[open + 1..close];
                let (properties, custom_properties) = parse_declarations(body);
                for raw in split_top_level(selector_text, ',') {
                    let raw = raw.trim();
                    if raw.is_empty() {
                        continue;
                    }
                    let kind = classify_selector(raw);
                    out.push(ParsedRule {
                        rule: CssRule {
                            selector: raw.to_string(),
                            kind,
                            properties: properties.clone(),
                            custom_properties: custom_properties.clone(),
                            media,
                        },
                        promoted: inside_promoted,
                    });
                }
                pos = close + 1;
            }
            None => break,
        }
    }
}

fn parse_declarations(body: &str) -> (Declarations, Declarations) {
    let mut properties = Declarations::default();
    let mut custom = Declarations::default();
    for decl in split_top_level(body, ';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = strip_important(value.trim());
        if name.is_empty() || value.is_empty() {
            continue;
        }
        if let Some(stripped) = name.strip_prefix("--") {
            custom.set(format!("--{stripped}"), value);
            continue;
        }
        match expand_shorthand(name, value) {
            Some(longhands) => {
                for d in longhands {
                    properties.set(d.name, d.value);
                }
            }
            None => properties.set(name, value),
        }
    }
    (properties, custom)
}

fn strip_important(value: &str) -> &str {
    value
        .strip_suffix("!important")
        .map(|v| v.trim_end())
        .unwrap_or(value)
}

fn classify_media_prelude(prelude: &str, thresholds: &BreakpointThresholds) -> MediaOutcome {
    let lower = prelude.to_ascii_lowercase();
    let (axis_is_max, idx) = if let Some(i) = lower.find("max-width") {
        (true, i)
    } else if let Some(i) = lower.find("min-width") {
        (false, i)
    } else {
        return MediaOutcome::Unsupported;
    };

    let after_axis = &prelude[idx..];
    let Some(colon_rel) = after_axis.find(':') else {
        return MediaOutcome::Unsupported;
    };
    let value_start = idx + colon_rel + 1;
    let value_end = prelude[value_start..]
        .find(')')
        .map(|e| value_start + e)
        .unwrap_or(prelude.len());
    let value_str = prelude[value_start..value_end].trim();

    let Some(px) = parse_length_to_px(value_str) else {
        return MediaOutcome::Unsupported;
    };

    if axis_is_max {
        if px <= thresholds.tiny_max_px {
            MediaOutcome::Breakpoint(Breakpoint::Tiny)
        } else if px <= thresholds.small_max_px {
            MediaOutcome::Breakpoint(Breakpoint::Small)
        } else if px <= thresholds.medium_max_px {
            MediaOutcome::Breakpoint(Breakpoint::Medium)
        } else {
            MediaOutcome::Unsupported
        }
    } else if px >= thresholds.large_min_px {
        MediaOutcome::Promote
    } else {
        MediaOutcome::Unsupported
    }
}

/// Parses a CSS length to a raw pixel number, using base-16 for `rem`/`em`
/// (§4.2). Returns `None` for units this tool doesn't track on media
/// features (e.g. `vw`).
pub fn parse_length_to_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let split_at = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    let (num_str, unit) = value.split_at(split_at);
    let num: f64 = num_str.parse().ok()?;
    match unit.trim() {
        "px" | "" => Some(num),
        "rem" | "em" => Some(num * 16.0),
        _ => None,
    }
}

fn classify_compound(raw: &str) -> SelectorKind {
    let (base, pseudo) = match raw.find(':') {
        Some(i) => (&raw[..i], Some(raw[i + 1..].trim_start_matches(':').to_string())),
        None => (raw, None),
    };

    if let Some(dot) = base.find('.') {
        let tag_part = &base[..dot];
        let class_part = base[dot + 1..].to_string();
        if class_part.is_empty() {
            return SelectorKind::Other(raw.to_string());
        }
        if tag_part.is_empty() {
            return match pseudo {
                Some(p) => SelectorKind::PseudoClass { class: class_part, pseudo: p },
                None => SelectorKind::PureClass(class_part),
            };
        }
        if pseudo.is_some() {
            return SelectorKind::Other(raw.to_string());
        }
        return SelectorKind::TagClass { tag: tag_part.to_string(), class: class_part };
    }

    if !base.is_empty() && base.chars().next().unwrap().is_ascii_alphabetic() {
        if pseudo.is_some() {
            return SelectorKind::Other(raw.to_string());
        }
        return SelectorKind::Tag(base.to_string());
    }

    SelectorKind::Other(raw.to_string())
}

/// Classifies a single, already comma-split selector (§4.2).
pub fn classify_selector(raw: &str) -> SelectorKind {
    let raw = raw.trim();

    let gt_parts: Vec<String> = split_top_level(raw, '>')
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if gt_parts.len() >= 2 {
        let child = gt_parts.last().cloned().unwrap();
        let ancestor = gt_parts[..gt_parts.len() - 1].join(" > ");
        return SelectorKind::Descendant { ancestor, child, combinator: Combinator::Child };
    }

    let space_parts: Vec<String> = split_top_level(raw, ' ')
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if space_parts.len() >= 2 {
        let child = space_parts.last().cloned().unwrap();
        let ancestor = space_parts[..space_parts.len() - 1].join(" ");
        return SelectorKind::Descendant { ancestor, child, combinator: Combinator::Descendant };
    }

    classify_compound(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_pure_class() {
        assert_eq!(classify_selector(".card"), SelectorKind::PureClass("card".into()));
    }

    #[test]
    fn classifies_pseudo_class() {
        assert_eq!(
            classify_selector(".card:hover"),
            SelectorKind::PseudoClass { class: "card".into(), pseudo: "hover".into() }
        );
    }

    #[test]
    fn classifies_tag_and_tag_class() {
        assert_eq!(classify_selector("h1"), SelectorKind::Tag("h1".into()));
        assert_eq!(
            classify_selector("h1.big"),
            SelectorKind::TagClass { tag: "h1".into(), class: "big".into() }
        );
    }

    #[test]
    fn classifies_descendant_and_child() {
        assert_eq!(
            classify_selector(".parent .child"),
            SelectorKind::Descendant {
                ancestor: ".parent".into(),
                child: ".child".into(),
                combinator: Combinator::Descendant
            }
        );
        assert_eq!(
            classify_selector(".parent > h1"),
            SelectorKind::Descendant {
                ancestor: ".parent".into(),
                child: "h1".into(),
                combinator: Combinator::Child
            }
        );
    }

    #[test]
    fn splits_comma_selectors_and_expands_shorthand() {
        let sheet = parse_stylesheet(".a, .b { padding: 4px 8px; }");
        assert_eq!(sheet.rules.len(), 2);
        let a = &sheet.rules[0].rule;
        assert_eq!(a.properties.get("padding-top"), Some("4px"));
        assert_eq!(a.properties.get("padding-left"), Some("8px"));
    }

    #[test]
    fn media_max_width_classification() {
        let sheet = parse_stylesheet(".a { color: red; } @media (max-width: 767px) { .a { color: blue; } }");
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[1].rule.media, Some(Breakpoint::Small));
        assert!(!sheet.rules[1].promoted);
    }

    #[test]
    fn media_min_width_promotes() {
        let sheet = parse_stylesheet("@media (min-width: 992px) { .a { color: blue; } }");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].rule.media, None);
        assert!(sheet.rules[0].promoted);
    }

    #[test]
    fn custom_breakpoint_thresholds_change_classification() {
        let thresholds = BreakpointThresholds { small_max_px: 600.0, ..BreakpointThresholds::default() };
        let sheet = parse_stylesheet_with_breakpoints(
            "@media (max-width: 650px) { .a { color: blue; } }",
            &thresholds,
        );
        assert_eq!(sheet.rules[0].rule.media, Some(Breakpoint::Medium));
    }

    #[test]
    fn media_without_width_axis_is_dropped() {
        let sheet = parse_stylesheet("@media (prefers-color-scheme: dark) { .a { color: blue; } }");
        assert!(sheet.rules.is_empty());
        assert!(sheet.warnings.iter().any(|w| w.contains("dropped")));
    }

    #[test]
    fn nested_braces_in_calc_do_not_confuse_brace_matching() {
        let sheet = parse_stylesheet(".a { width: calc(100% - 10px); }");
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].rule.properties.get("width"), Some("calc(100% - 10px)"));
    }

    #[test]
    fn custom_properties_kept_distinct() {
        let sheet = parse_stylesheet(".a { --local: 1; color: red; }");
        let rule = &sheet.rules[0].rule;
        assert_eq!(rule.custom_properties.get("--local"), Some("1"));
        assert_eq!(rule.properties.get("color"), Some("red"));
    }

    #[test]
    fn unsupported_at_rule_is_skipped() {
        let sheet = parse_stylesheet("@font-face { font-family: X; src: url(a.woff); } .a { color: red; }");
        assert_eq!(sheet.rules.len(), 1);
        assert!(sheet.warnings.iter().any(|w| w.contains("font-face")));
    }
}
