//! Resolves `var(--token[, fallback])` chains against a [`TokenManifest`]
//! into literal values (§4.2). Recursion is bounded at depth 8 — a token
//! whose fallback chain is deeper than that is left partially unresolved
//! rather than risking a cycle.

use crate::rule::Declarations;
use crate::scan::split_top_level;
use crate::tokens::TokenManifest;

const MAX_DEPTH: usize = 8;

pub fn literalize(value: &str, tokens: &TokenManifest) -> String {
    literalize_with_depth(value, tokens, MAX_DEPTH)
}

/// Same as [`literalize`], but with the recursion bound overridable — a
/// caller embedding this pipeline can retune it via
/// `PipelineConfig::max_var_resolution_depth` without forking this crate.
pub fn literalize_with_depth(value: &str, tokens: &TokenManifest, max_depth: usize) -> String {
    literalize_inner(value, tokens, max_depth)
}

fn literalize_inner(value: &str, tokens: &TokenManifest, depth: usize) -> String {
    if depth == 0 || !value.contains("var(") {
        return value.to_string();
    }

    let bytes = value.as_bytes();
    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;
    while i < len {
        if value[i..].starts_with("var(") {
            let args_start = i + 4;
            if let Some(close) = find_matching_paren(value, args_start) {
                let inner = &value[args_start..close];
                let (name, fallback) = split_var_args(inner);
                let resolved = tokens
                    .get(name.trim())
                    .map(|t| t.value.clone())
                    .or(fallback);
                match resolved {
                    Some(r) => out.push_str(&literalize_inner(&r, tokens, depth - 1)),
                    None => out.push_str(&value[i..=close]),
                }
                i = close + 1;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn find_matching_paren(value: &str, start: usize) -> Option<usize> {
    let bytes = value.as_bytes();
    let len = bytes.len();
    let mut depth = 1i32;
    let mut i = start;
    while i < len {
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

fn split_var_args(inner: &str) -> (String, Option<String>) {
    let parts = split_top_level(inner, ',');
    let name = parts[0].trim().to_string();
    if parts.len() > 1 {
        (name, Some(parts[1..].join(",").trim().to_string()))
    } else {
        (name, None)
    }
}

/// Normalizes single-quoted string literals to double quotes, so `content`
/// values survive a round trip through JSON (§4.2).
pub fn normalize_quotes(value: &str) -> String {
    if !value.contains('\'') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut in_single = false;
    for c in value.chars() {
        match c {
            '\'' if !in_single => {
                in_single = true;
                out.push('"');
            }
            '\'' if in_single => {
                in_single = false;
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Unsupported `content` generators this tool cannot carry into the scene
/// graph (no live DOM to evaluate `attr()`/`counter()` against).
fn is_unsupported_content_function(value: &str) -> bool {
    let v = value.trim();
    v.starts_with("attr(") || v.starts_with("counter(") || v.starts_with("counters(")
}

/// Runs every declaration's value through [`literalize`], collecting a
/// warning for each `var()` reference that had neither a matching token nor
/// a fallback, and for `content` values this tool cannot evaluate.
pub fn literalize_declarations(decls: &Declarations, tokens: &TokenManifest) -> (Declarations, Vec<String>) {
    literalize_declarations_with_depth(decls, tokens, MAX_DEPTH)
}

/// Same as [`literalize_declarations`], with the recursion bound overridable.
pub fn literalize_declarations_with_depth(
    decls: &Declarations,
    tokens: &TokenManifest,
    max_depth: usize,
) -> (Declarations, Vec<String>) {
    let mut out = Declarations::default();
    let mut warnings = Vec::new();
    for d in decls.iter() {
        if d.name == "content" && is_unsupported_content_function(&d.value) {
            warnings.push(format!("content: {} is not evaluatable without a live DOM", d.value));
            continue;
        }
        let resolved = literalize_with_depth(&d.value, tokens, max_depth);
        let resolved = normalize_quotes(&resolved);
        if resolved.contains("var(") {
            warnings.push(format!("unresolved token reference in {}: {}", d.name, resolved));
        }
        out.set(d.name.clone(), resolved);
    }
    (out, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{TokenCategory, TokenManifest, TokenVariable};

    fn manifest_with(name: &str, value: &str) -> TokenManifest {
        let mut m = TokenManifest::default();
        m.variables.insert(
            name.to_string(),
            TokenVariable {
                name: name.to_string(),
                value: value.to_string(),
                category: TokenCategory::Spacing,
                light_value: None,
                dark_value: None,
                path: "Spacing / Test".to_string(),
            },
        );
        m
    }

    #[test]
    fn resolves_simple_var() {
        let tokens = manifest_with("--gap", "16px");
        assert_eq!(literalize("var(--gap)", &tokens), "16px");
    }

    #[test]
    fn resolves_fallback_when_token_missing() {
        let tokens = TokenManifest::default();
        assert_eq!(literalize("var(--missing, 8px)", &tokens), "8px");
    }

    #[test]
    fn resolves_nested_var_chain_within_depth() {
        let mut tokens = manifest_with("--a", "var(--b)");
        tokens.variables.insert(
            "--b".to_string(),
            TokenVariable {
                name: "--b".to_string(),
                value: "blue".to_string(),
                category: TokenCategory::Color,
                light_value: None,
                dark_value: None,
                path: "Colors / Test".to_string(),
            },
        );
        assert_eq!(literalize("var(--a)", &tokens), "blue");
    }

    #[test]
    fn leaves_unresolvable_var_untouched() {
        let tokens = TokenManifest::default();
        assert_eq!(literalize("var(--missing)", &tokens), "var(--missing)");
    }

    #[test]
    fn normalizes_single_quotes() {
        assert_eq!(normalize_quotes("'hello'"), "\"hello\"");
    }

    #[test]
    fn flags_unsupported_content_function() {
        let mut decls = Declarations::default();
        decls.set("content", "attr(data-label)");
        let (_, warnings) = literalize_declarations(&decls, &TokenManifest::default());
        assert_eq!(warnings.len(), 1);
    }
}
