//! Design-token manifest extraction (§3, §4.4). Custom properties declared
//! in root scope (`:root`, `.fp-root`) become named tokens; a token's
//! category is inferred primarily from its *value* shape, falling back to
//! name heuristics only where the value alone is ambiguous — the explicit
//! resolution of §9's open question, recorded in DESIGN.md (the
//! alternative, name-first, breaks the moment an author names a spacing
//! variable `--brand-gap` instead of `--spacing-gap`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parser::ParsedRule;

/// §3: `TokenVariable.type ∈ {color, fontFamily, spacing}`. `--radius-*`
/// variables are deliberately not a manifest category — §4.4 skips them
/// from the manifest and tracks them only for CSS re-emission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenCategory {
    Color,
    FontFamily,
    Spacing,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenVariable {
    pub name: String,
    /// Effective value (light value when a dark pairing exists).
    pub value: String,
    pub category: TokenCategory,
    pub light_value: Option<String>,
    pub dark_value: Option<String>,
    /// Display grouping, e.g. `"Colors / Background / Base"` (§3).
    pub path: String,
}

/// `TokenVariable` serializes to the manifest's wire shape (§3): `cssVar`,
/// `path`, `type`, and either a flat `value` or a `values{light,dark}` pair
/// when a dark-mode override exists, rather than carrying both shapes at
/// once with a redundant flag.
impl Serialize for TokenVariable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("TokenVariable", 4)?;
        state.serialize_field("cssVar", &self.name)?;
        state.serialize_field("path", &self.path)?;
        state.serialize_field("type", &self.category)?;
        if let Some(dark) = &self.dark_value {
            #[derive(Serialize)]
            struct Values<'a> {
                light: &'a str,
                dark: &'a str,
            }
            let light = self.light_value.as_deref().unwrap_or(&self.value);
            state.serialize_field("values", &Values { light, dark })?;
        } else {
            state.serialize_field("value", &self.value)?;
        }
        state.end()
    }
}

/// Size bucket for a `--radius-*` variable, inferred from its name (§4.4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadiusBucket {
    Small,
    Medium,
    Large,
    Xlarge,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RadiusVariable {
    pub name: String,
    pub value: String,
    pub bucket: Option<RadiusBucket>,
}

/// `fonts` half of the manifest (§3): families actually in use, plus an
/// optional Google Fonts stylesheet URL when one is detected.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenFonts {
    pub families: Vec<String>,
    #[serde(rename = "googleFontsUrl", skip_serializing_if = "Option::is_none")]
    pub google_fonts_url: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenManifest {
    /// Project name this manifest belongs to; set by the pipeline once the
    /// project name is known (extraction itself only sees the stylesheet).
    pub name: String,
    pub slug: String,
    /// Scoping prefix for generated variables, matching the `.fp-root`
    /// selector this extractor also recognizes as root scope.
    pub namespace: String,
    /// `["light"]`, or `["light", "dark"]` once any variable pairs a dark
    /// override.
    pub modes: Vec<String>,
    pub variables: BTreeMap<String, TokenVariable>,
    /// `--radius-*` variables: emitted only as CSS, never into `variables`.
    pub radii: BTreeMap<String, RadiusVariable>,
    pub fonts: TokenFonts,
}

impl TokenManifest {
    pub fn get(&self, name: &str) -> Option<&TokenVariable> {
        self.variables.get(name)
    }
}

fn is_root_scope(selector: &str) -> bool {
    let s = selector.trim().to_ascii_lowercase();
    s == ":root" || s == ".fp-root" || s.starts_with(":root") || s.starts_with(".fp-root")
}

fn is_dark_scope(selector: &str) -> bool {
    selector.to_ascii_lowercase().contains("dark")
}

fn looks_like_color_value(v: &str) -> bool {
    let v = v.trim();
    v.starts_with('#')
        || v.starts_with("rgb(")
        || v.starts_with("rgba(")
        || v.starts_with("hsl(")
        || v.starts_with("hsla(")
        || v.starts_with("oklch(")
        || v.starts_with("color-mix(")
        || v.starts_with("var(")
        || matches!(
            v.to_ascii_lowercase().as_str(),
            "transparent" | "currentcolor" | "inherit" | "black" | "white"
        )
}

fn is_length_value(v: &str) -> bool {
    const UNITS: &[&str] = &["px", "rem", "em", "%", "vh", "vw", "vmin", "vmax"];
    let mut saw_any = false;
    for tok in v.split_whitespace() {
        let mut matched = false;
        for unit in UNITS {
            if let Some(prefix) = tok.strip_suffix(unit) {
                if prefix.parse::<f64>().is_ok() {
                    matched = true;
                    break;
                }
            }
        }
        if !matched {
            return false;
        }
        saw_any = true;
    }
    saw_any
}

fn looks_like_font_stack(v: &str) -> bool {
    let v = v.trim();
    if looks_like_color_value(v) || is_length_value(v) {
        return false;
    }
    v.contains(',') || v.starts_with('"') || v.starts_with('\'')
}

fn name_suggests(name: &str, needles: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

const SPACING_NAME_HINTS: &[&str] =
    &["padding", "margin", "gap", "spacing", "section-", "page-", "container-"];
const COLOR_NAME_HINTS: &[&str] =
    &["bg", "text", "border", "accent", "coral", "dark", "light", "card", "muted"];

/// Classifies a `--*` declaration into the manifest's category set, per the
/// §4.4 rule list with §9's value-first resolution for ambiguous cases.
pub fn classify_value(value: &str, name: &str) -> Option<TokenCategory> {
    let v = value.trim();
    let lower_name = name.to_ascii_lowercase();

    if lower_name.starts_with("--font") || lower_name.starts_with("font") {
        return Some(TokenCategory::FontFamily);
    }
    if looks_like_color_value(v) {
        return Some(TokenCategory::Color);
    }
    if is_length_value(v) || name_suggests(&lower_name, SPACING_NAME_HINTS) {
        return Some(TokenCategory::Spacing);
    }
    if looks_like_font_stack(v) {
        return Some(TokenCategory::FontFamily);
    }
    if name_suggests(&lower_name, COLOR_NAME_HINTS) {
        return Some(TokenCategory::Color);
    }
    None
}

fn category_group(category: TokenCategory) -> &'static str {
    match category {
        TokenCategory::Color => "Colors",
        TokenCategory::FontFamily => "Typography",
        TokenCategory::Spacing => "Spacing",
    }
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Builds the manifest's display grouping for a variable, e.g.
/// `--brand-ink` (a color) becomes `"Colors / Brand / Ink"`.
fn derive_path(name: &str, category: TokenCategory) -> String {
    let mut parts = vec![category_group(category).to_string()];
    parts.extend(name.trim_start_matches("--").split(['-', '_']).filter(|s| !s.is_empty()).map(title_case));
    parts.join(" / ")
}

fn radius_bucket(name: &str) -> Option<RadiusBucket> {
    let lower = name.to_ascii_lowercase();
    if lower.contains("xlarge") || lower.contains("xl") {
        Some(RadiusBucket::Xlarge)
    } else if lower.contains("large") {
        Some(RadiusBucket::Large)
    } else if lower.contains("medium") {
        Some(RadiusBucket::Medium)
    } else if lower.contains("small") {
        Some(RadiusBucket::Small)
    } else {
        None
    }
}

pub fn extract_token_manifest(rules: &[ParsedRule]) -> TokenManifest {
    let mut variables: BTreeMap<String, TokenVariable> = BTreeMap::new();
    let mut radii: BTreeMap<String, RadiusVariable> = BTreeMap::new();

    for parsed in rules {
        let rule = &parsed.rule;
        if !is_root_scope(&rule.selector) {
            continue;
        }
        let dark = is_dark_scope(&rule.selector);

        for decl in rule.custom_properties.iter() {
            if decl.name.to_ascii_lowercase().starts_with("--radius") {
                radii.entry(decl.name.clone()).or_insert_with(|| RadiusVariable {
                    name: decl.name.clone(),
                    value: decl.value.clone(),
                    bucket: radius_bucket(&decl.name),
                });
                continue;
            }

            let Some(category) = classify_value(&decl.value, &decl.name) else {
                continue;
            };

            let entry = variables.entry(decl.name.clone()).or_insert_with(|| TokenVariable {
                name: decl.name.clone(),
                value: decl.value.clone(),
                category,
                light_value: None,
                dark_value: None,
                path: derive_path(&decl.name, category),
            });
            if dark {
                entry.dark_value = Some(decl.value.clone());
            } else {
                entry.value = decl.value.clone();
                entry.light_value = Some(decl.value.clone());
                entry.category = category;
                entry.path = derive_path(&decl.name, category);
            }
        }
    }

    let modes = if variables.values().any(|v| v.dark_value.is_some()) {
        vec!["light".to_string(), "dark".to_string()]
    } else {
        vec!["light".to_string()]
    };

    let mut families: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for v in variables.values() {
        if v.category != TokenCategory::FontFamily {
            continue;
        }
        let family = v.value.split(',').next().unwrap_or(&v.value).trim().trim_matches(['"', '\''].as_slice()).to_string();
        if !family.is_empty() && seen.insert(family.clone()) {
            families.push(family);
        }
    }

    TokenManifest {
        name: String::new(),
        slug: String::new(),
        namespace: "fp".to_string(),
        modes,
        variables,
        radii,
        fonts: TokenFonts { families, google_fonts_url: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stylesheet;

    #[test]
    fn extracts_root_tokens_with_value_first_categories() {
        let sheet = parse_stylesheet(
            ":root { --brand-gap: 16px; --brand-ink: #111827; --radius-card: 8px; }",
        );
        let manifest = extract_token_manifest(&sheet.rules);
        assert_eq!(manifest.get("--brand-gap").unwrap().category, TokenCategory::Spacing);
        assert_eq!(manifest.get("--brand-ink").unwrap().category, TokenCategory::Color);
        assert!(manifest.get("--radius-card").is_none());
        assert!(manifest.radii.contains_key("--radius-card"));
    }

    #[test]
    fn pairs_light_and_dark_values() {
        let sheet = parse_stylesheet(
            ":root { --surface: #fff; } \
             :root.dark { --surface: #111; }",
        );
        let manifest = extract_token_manifest(&sheet.rules);
        let token = manifest.get("--surface").unwrap();
        assert_eq!(token.light_value.as_deref(), Some("#fff"));
        assert_eq!(token.dark_value.as_deref(), Some("#111"));
        assert_eq!(token.value, "#fff");
    }

    #[test]
    fn non_root_scopes_are_ignored() {
        let sheet = parse_stylesheet(".card { --local: 1; }");
        let manifest = extract_token_manifest(&sheet.rules);
        assert!(manifest.variables.is_empty());
    }

    #[test]
    fn fp_root_scope_is_also_collected() {
        let sheet = parse_stylesheet(".fp-root { --brand-gap: 8px; }");
        let manifest = extract_token_manifest(&sheet.rules);
        assert!(manifest.get("--brand-gap").is_some());
    }

    #[test]
    fn font_family_values_are_classified() {
        let sheet = parse_stylesheet(":root { --font-body: Inter, sans-serif; }");
        let manifest = extract_token_manifest(&sheet.rules);
        assert_eq!(manifest.get("--font-body").unwrap().category, TokenCategory::FontFamily);
        assert!(manifest.fonts.families.contains(&"Inter".to_string()));
    }

    #[test]
    fn path_groups_by_category_and_name_segments() {
        let sheet = parse_stylesheet(":root { --brand-ink: #111827; }");
        let manifest = extract_token_manifest(&sheet.rules);
        assert_eq!(manifest.get("--brand-ink").unwrap().path, "Colors / Brand / Ink");
    }

    #[test]
    fn modes_reflect_whether_a_dark_pairing_exists() {
        let light_only = extract_token_manifest(&parse_stylesheet(":root { --surface: #fff; }").rules);
        assert_eq!(light_only.modes, vec!["light".to_string()]);

        let with_dark = extract_token_manifest(
            &parse_stylesheet(":root { --surface: #fff; } :root.dark { --surface: #111; }").rules,
        );
        assert_eq!(with_dark.modes, vec!["light".to_string(), "dark".to_string()]);
    }

    #[test]
    fn serializes_dark_paired_variable_as_values_object() {
        let sheet =
            parse_stylesheet(":root { --surface: #fff; } :root.dark { --surface: #111; }");
        let manifest = extract_token_manifest(&sheet.rules);
        let json = serde_json::to_value(manifest.get("--surface").unwrap()).unwrap();
        assert_eq!(json["values"]["light"], "#fff");
        assert_eq!(json["values"]["dark"], "#111");
        assert!(json.get("value").is_none());
    }
}
