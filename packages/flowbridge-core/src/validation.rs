//! The `Issue` taxonomy (§4.5, §7, §9). This is the one place in the crate
//! that deliberately does not use `Result`/`thiserror`: every recoverable,
//! malformed-input condition is a value pushed onto a running log instead
//! of an error propagated with `?` (§1.2).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// Stable issue codes (§4.5). Not exhaustive of every string the spec
/// names, but covers every code this implementation actually emits —
/// new passes should extend this rather than inventing ad hoc strings.
pub mod codes {
    pub const DUPLICATE_UUID: &str = "DUPLICATE_UUID";
    pub const CIRCULAR_REFERENCE: &str = "CIRCULAR_REFERENCE";
    pub const EXCESSIVE_DEPTH: &str = "EXCESSIVE_DEPTH";
    pub const MULTIPLE_ROOTS: &str = "MULTIPLE_ROOTS";
    pub const ORPHAN_CHILD_REFERENCE: &str = "ORPHAN_CHILD_REFERENCE";
    pub const ORPHAN_ID_REFERENCE: &str = "ORPHAN_ID_REFERENCE";
    pub const ORPHAN_CLASS_REFERENCE: &str = "ORPHAN_CLASS_REFERENCE";
    pub const DYNAMIC_REFERENCE_SKIPPED: &str = "DYNAMIC_REFERENCE_SKIPPED";
    pub const RESERVED_CLASS_NAME: &str = "RESERVED_CLASS_NAME";
    pub const GHOST_VARIANT_KEY: &str = "GHOST_VARIANT_KEY";
    pub const INVALID_VARIANT_KEY: &str = "INVALID_VARIANT_KEY";
    pub const CSS_EXTRACTED_TO_EMBED: &str = "CSS_EXTRACTED_TO_EMBED";
    pub const UNRESOLVED_CSS_VARIABLE: &str = "UNRESOLVED_CSS_VARIABLE";
    pub const DECOUPLER_COLLISION: &str = "DECOUPLER_COLLISION";
    pub const EMBED_SIZE_EXCEEDED: &str = "EMBED_SIZE_EXCEEDED";
    pub const BROKEN_INTERACTION_STRIPPED: &str = "BROKEN_INTERACTION_STRIPPED";
    pub const SEMANTIC_PATCH_REJECTED: &str = "SEMANTIC_PATCH_REJECTED";
    pub const MEDIA_QUERY_DROPPED: &str = "MEDIA_QUERY_DROPPED";
    pub const UNCLASSED_SELECTOR_DROPPED: &str = "UNCLASSED_SELECTOR_DROPPED";
    pub const IMPORT_CANCELLED: &str = "IMPORT_CANCELLED";
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        match severity {
            Severity::Fatal | Severity::Error => {
                tracing::warn!(code, message = %message, "pipeline issue")
            }
            Severity::Warning => tracing::warn!(code, message = %message, "pipeline warning"),
            Severity::Info => tracing::debug!(code, message = %message, "pipeline info"),
        }
        Self {
            severity,
            code,
            message,
            context: None,
            suggestion: None,
            line_number: None,
            location: None,
        }
    }

    pub fn fatal(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, code, message)
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<Issue>,
}

impl ValidationResult {
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// `isValid` (§3): no fatal, no error.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| matches!(i.severity, Severity::Fatal | Severity::Error))
    }

    /// `canProceed` (§3): no fatal.
    pub fn can_proceed(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Fatal)
    }

    pub fn summary(&self) -> String {
        let count = |s: Severity| self.issues.iter().filter(|i| i.severity == s).count();
        format!(
            "{} fatal, {} error, {} warning, {} info",
            count(Severity::Fatal),
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }
}

/// Extracts `id`/`class` references from inline JS per the fixed pattern
/// list of §4.5, used by the cross-reference pass.
pub fn extract_js_references(js: &str) -> JsReferences {
    let mut ids = Vec::new();
    let mut classes = Vec::new();
    let mut dynamic = 0usize;

    // `forced`: Some(true) = always an id, Some(false) = always a class,
    // None = sigil-dependent (`querySelector`/`$` accept either).
    let markers: &[(&str, Option<bool>)] = &[
        ("getElementById(", Some(true)),
        ("getElementsByClassName(", Some(false)),
        ("querySelector(", None),
        ("$(", None),
        ("classList.add(", Some(false)),
        ("classList.remove(", Some(false)),
        ("classList.toggle(", Some(false)),
        ("classList.contains(", Some(false)),
    ];

    for (marker, forced) in markers {
        let mut search_from = 0usize;
        while let Some(rel) = js[search_from..].find(marker) {
            let start = search_from + rel + marker.len();
            let rest = &js[start..];
            match extract_arg_literal(rest, *forced) {
                Some((name, is_id)) => {
                    if is_id {
                        ids.push(name);
                    } else {
                        classes.push(name);
                    }
                }
                None => dynamic += 1,
            }
            search_from = start;
        }
    }

    JsReferences { ids, classes, dynamic_reference_count: dynamic }
}

#[derive(Clone, Debug, Default)]
pub struct JsReferences {
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub dynamic_reference_count: usize,
}

/// Cross-checks extracted JS references against the ids/classes actually
/// present in the normalized document (§4.5): a reference to an id/class
/// the document never defines becomes an orphan warning, and a reference
/// the extractor couldn't resolve statically is surfaced rather than
/// silently dropped.
pub fn cross_reference_js(
    refs: &JsReferences,
    live_ids: &std::collections::HashSet<String>,
    live_classes: &std::collections::HashSet<String>,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for id in &refs.ids {
        if !live_ids.contains(id) {
            issues.push(
                Issue::warning(codes::ORPHAN_ID_REFERENCE, format!("script references id '#{id}' with no matching element"))
                    .with_context(id.clone()),
            );
        }
    }
    for class in &refs.classes {
        if !live_classes.contains(class) {
            issues.push(
                Issue::warning(codes::ORPHAN_CLASS_REFERENCE, format!("script references class '.{class}' with no matching element"))
                    .with_context(class.clone()),
            );
        }
    }
    if refs.dynamic_reference_count > 0 {
        issues.push(Issue::info(
            codes::DYNAMIC_REFERENCE_SKIPPED,
            format!("{} script reference(s) could not be statically resolved", refs.dynamic_reference_count),
        ));
    }
    issues
}

/// Pulls the quoted string literal out of `rest`, which starts right after
/// the marker's opening paren. `forced` fixes whether the result is an id
/// or a class; when `None`, a leading `#`/`.` sigil decides (an unprefixed
/// literal, e.g. `querySelector('div')`, is neither and is skipped).
fn extract_arg_literal(rest: &str, forced: Option<bool>) -> Option<(String, bool)> {
    let rest = rest.trim_start();
    let quote = match rest.chars().next()? {
        q @ ('\'' | '"') => q,
        _ => return None,
    };
    let body = &rest[1..];
    let end = body.find(quote)?;
    let mut literal = &body[..end];
    if literal.is_empty() {
        return None;
    }
    let is_id = match forced {
        Some(v) => v,
        None => {
            if let Some(stripped) = literal.strip_prefix('#') {
                literal = stripped;
                true
            } else if let Some(stripped) = literal.strip_prefix('.') {
                literal = stripped;
                false
            } else {
                return None;
            }
        }
    };
    if literal.is_empty() {
        None
    } else {
        Some((literal.to_string(), is_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_result_severity_gates() {
        let mut result = ValidationResult::default();
        result.push(Issue::warning(codes::MEDIA_QUERY_DROPPED, "dropped"));
        assert!(result.is_valid());
        assert!(result.can_proceed());

        result.push(Issue::error(codes::ORPHAN_ID_REFERENCE, "missing id"));
        assert!(!result.is_valid());
        assert!(result.can_proceed());

        result.push(Issue::fatal(codes::DUPLICATE_UUID, "dup"));
        assert!(!result.can_proceed());
    }

    #[test]
    fn extracts_id_and_class_references() {
        let js = "document.getElementById('hero'); $('.nav-link').on('click'); el.classList.toggle('open');";
        let refs = extract_js_references(js);
        assert!(refs.ids.contains(&"hero".to_string()));
        assert!(refs.classes.contains(&"nav-link".to_string()));
        assert!(refs.classes.contains(&"open".to_string()));
    }

    #[test]
    fn cross_reference_flags_orphans_and_dynamic_skips() {
        let js = "document.getElementById('missing'); document.querySelector(sel);";
        let refs = extract_js_references(js);
        let live_ids = std::collections::HashSet::new();
        let live_classes = std::collections::HashSet::new();
        let issues = cross_reference_js(&refs, &live_ids, &live_classes);
        assert!(issues.iter().any(|i| i.code == codes::ORPHAN_ID_REFERENCE));
        assert!(issues.iter().any(|i| i.code == codes::DYNAMIC_REFERENCE_SKIPPED));
    }

    #[test]
    fn cross_reference_allows_known_ids_and_classes() {
        let js = "document.getElementById('hero'); el.classList.add('active');";
        let refs = extract_js_references(js);
        let live_ids = std::collections::HashSet::from(["hero".to_string()]);
        let live_classes = std::collections::HashSet::from(["active".to_string()]);
        let issues = cross_reference_js(&refs, &live_ids, &live_classes);
        assert!(issues.is_empty());
    }
}
