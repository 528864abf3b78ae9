//! CSS rule data model (§3).

use serde::{Deserialize, Serialize};

/// A single `name: value` declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// An ordered, last-writer-wins declaration list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declarations(pub Vec<Declaration>);

impl Declarations {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.0.iter_mut().find(|d| d.name == name) {
            existing.value = value;
        } else {
            self.0.push(Declaration { name, value });
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|d| d.name == name).map(|d| d.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Declaration> {
        self.0.iter()
    }

    /// Renders as `name: value;` pairs separated by a single space, the
    /// `styleLess` wire format (§3, §6).
    pub fn to_style_less(&self) -> String {
        self.0
            .iter()
            .map(|d| format!("{}: {};", d.name, d.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Breakpoint tag, the closed set of §4.2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Tiny,
    Small,
    Medium,
    Large,
    Xl,
    Xxl,
}

impl Breakpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Tiny => "tiny",
            Breakpoint::Small => "small",
            Breakpoint::Medium => "medium",
            Breakpoint::Large => "large",
            Breakpoint::Xl => "xl",
            Breakpoint::Xxl => "xxl",
        }
    }

    /// Breakpoints narrower than base that a promoted min-width rule must
    /// back-fill (§4.2).
    pub fn narrow_tiers() -> &'static [Breakpoint] {
        &[Breakpoint::Medium, Breakpoint::Small, Breakpoint::Tiny]
    }

    /// Whether this tag is one of the "promotes to base" desktop tiers.
    pub fn promotes_to_base(&self) -> bool {
        matches!(self, Breakpoint::Large | Breakpoint::Xl | Breakpoint::Xxl)
    }
}

/// Combinator between two compound selectors in a descendant/child selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// The classification of a single (comma-split) selector (§4.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorKind {
    /// `.foo`
    PureClass(String),
    /// `.foo:hover`
    PseudoClass { class: String, pseudo: String },
    /// `h1`
    Tag(String),
    /// `h1.big`
    TagClass { tag: String, class: String },
    /// `.parent .child` / `.parent > .child`
    Descendant {
        ancestor: String,
        child: String,
        combinator: Combinator,
    },
    /// Anything else, retained verbatim for the normalizer to flatten.
    Other(String),
}

/// A single, already-comma-split CSS rule (§3). After CSS parsing every
/// rule's `selector` field holds the raw text that `kind` was classified
/// from.
#[derive(Clone, Debug)]
pub struct CssRule {
    pub selector: String,
    pub kind: SelectorKind,
    pub properties: Declarations,
    pub custom_properties: Declarations,
    /// `None` means "base" (no media query, or a promoted min-width rule).
    pub media: Option<Breakpoint>,
}
