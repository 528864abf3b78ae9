//! Void elements never have children and self-close on serialization (§3, §4.1).

const VOID_TAGS: &[&str] = &[
    "img", "br", "hr", "input", "meta", "link", "area", "base", "col", "embed", "param",
    "source", "track", "wbr",
];

pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}
