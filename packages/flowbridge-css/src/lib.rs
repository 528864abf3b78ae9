//! CSS parsing, class indexing, design-token extraction and
//! literalization (§3, §4.2). Deliberately hand-rolled rather than built on
//! a general CSS parsing crate: the tolerant, depth-aware scanning this
//! tool needs (brace/paren counting, not a full grammar) is simpler and
//! more predictable to write by hand than to bend a conformant parser to
//! accept AI-generated, occasionally malformed CSS.

pub mod class_index;
pub mod gradient;
pub mod literalizer;
pub mod parser;
pub mod rule;
pub mod scan;
pub mod shorthand;
pub mod tokens;

pub use class_index::{build_class_index, overlay, ClassEntry, ClassIndex};
pub use gradient::round_gradient_percentages;
pub use literalizer::{
    literalize, literalize_declarations, literalize_declarations_with_depth, literalize_with_depth,
    normalize_quotes,
};
pub use parser::{
    classify_selector, parse_stylesheet, parse_stylesheet_with_breakpoints, BreakpointThresholds,
    ParsedRule, ParsedStylesheet,
};
pub use rule::{Breakpoint, Combinator, CssRule, Declaration, Declarations, SelectorKind};
pub use tokens::{
    classify_value, extract_token_manifest, RadiusBucket, RadiusVariable, TokenCategory,
    TokenFonts, TokenManifest, TokenVariable,
};
