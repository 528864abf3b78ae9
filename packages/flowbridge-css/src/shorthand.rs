//! Shorthand property expansion (§4.2). The target's `styleLess` language
//! does not reliably accept shorthands, so every shorthand this tool
//! recognizes is expanded into its longhand components at parse time.

use crate::rule::Declaration;
use crate::scan::split_top_level;

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];
const BORDER_WIDTH_KEYWORDS: &[&str] = &["thin", "medium", "thick"];
const BG_REPEAT_KEYWORDS: &[&str] = &["repeat", "no-repeat", "repeat-x", "repeat-y", "space", "round"];
const BG_ATTACHMENT_KEYWORDS: &[&str] = &["scroll", "fixed", "local"];
const FONT_STYLE_KEYWORDS: &[&str] = &["italic", "oblique", "normal"];
const FONT_VARIANT_KEYWORDS: &[&str] = &["small-caps"];
const FONT_WEIGHT_KEYWORDS: &[&str] = &[
    "bold", "bolder", "lighter", "normal", "100", "200", "300", "400", "500", "600", "700", "800",
    "900",
];

/// Expands a shorthand declaration into longhands. Returns `None` if `name`
/// is not a recognized shorthand (caller should keep the declaration as-is).
pub fn expand_shorthand(name: &str, value: &str) -> Option<Vec<Declaration>> {
    match name {
        "padding" => Some(expand_box(value, "padding")),
        "margin" => Some(expand_box(value, "margin")),
        "background" => Some(expand_background(value)),
        "font" => Some(expand_font(value)),
        "border" => Some(expand_border(value, "border")),
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            Some(expand_border(value, name))
        }
        "outline" => Some(expand_border(value, "outline")),
        _ => None,
    }
}

fn tokens(value: &str) -> Vec<String> {
    split_top_level(value.trim(), ' ')
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn expand_box(value: &str, prefix: &str) -> Vec<Declaration> {
    let t = tokens(value);
    let (top, right, bottom, left) = match t.len() {
        1 => (t[0].clone(), t[0].clone(), t[0].clone(), t[0].clone()),
        2 => (t[0].clone(), t[1].clone(), t[0].clone(), t[1].clone()),
        3 => (t[0].clone(), t[1].clone(), t[2].clone(), t[1].clone()),
        _ if t.len() >= 4 => (t[0].clone(), t[1].clone(), t[2].clone(), t[3].clone()),
        _ => return Vec::new(),
    };
    vec![
        Declaration { name: format!("{prefix}-top"), value: top },
        Declaration { name: format!("{prefix}-right"), value: right },
        Declaration { name: format!("{prefix}-bottom"), value: bottom },
        Declaration { name: format!("{prefix}-left"), value: left },
    ]
}

fn looks_like_color(tok: &str) -> bool {
    let t = tok.trim();
    t.starts_with('#')
        || t.starts_with("rgb(")
        || t.starts_with("rgba(")
        || t.starts_with("hsl(")
        || t.starts_with("hsla(")
        || t.starts_with("oklch(")
        || t.starts_with("color-mix(")
        || t.starts_with("var(")
        || matches!(
            t.to_ascii_lowercase().as_str(),
            "transparent" | "currentcolor" | "inherit" | "black" | "white"
        )
}

fn looks_like_image(tok: &str) -> bool {
    let t = tok.to_ascii_lowercase();
    t.starts_with("url(")
        || t.contains("gradient(")
        || t == "none"
}

fn expand_background(value: &str) -> Vec<Declaration> {
    let mut color = None;
    let mut image = None;
    let mut repeat = None;
    let mut attachment = None;
    let mut position_size: Vec<String> = Vec::new();

    for tok in tokens(value) {
        let lower = tok.to_ascii_lowercase();
        if looks_like_image(&tok) {
            image = Some(tok);
        } else if BG_REPEAT_KEYWORDS.contains(&lower.as_str()) {
            repeat = Some(tok);
        } else if BG_ATTACHMENT_KEYWORDS.contains(&lower.as_str()) {
            attachment = Some(tok);
        } else if looks_like_color(&tok) {
            color = Some(tok);
        } else {
            position_size.push(tok);
        }
    }

    let mut out = Vec::new();
    out.push(Declaration {
        name: "background-color".into(),
        value: color.unwrap_or_else(|| "transparent".into()),
    });
    out.push(Declaration {
        name: "background-image".into(),
        value: image.unwrap_or_else(|| "none".into()),
    });
    out.push(Declaration {
        name: "background-repeat".into(),
        value: repeat.unwrap_or_else(|| "repeat".into()),
    });
    out.push(Declaration {
        name: "background-attachment".into(),
        value: attachment.unwrap_or_else(|| "scroll".into()),
    });
    if !position_size.is_empty() {
        let joined = position_size.join(" ");
        if let Some((pos, size)) = joined.split_once('/') {
            out.push(Declaration {
                name: "background-position".into(),
                value: pos.trim().to_string(),
            });
            out.push(Declaration {
                name: "background-size".into(),
                value: size.trim().to_string(),
            });
        } else {
            out.push(Declaration {
                name: "background-position".into(),
                value: joined,
            });
        }
    }
    out
}

fn expand_font(value: &str) -> Vec<Declaration> {
    let mut t = tokens(value);
    let mut style = None;
    let mut variant = None;
    let mut weight = None;

    while let Some(first) = t.first() {
        let lower = first.to_ascii_lowercase();
        if FONT_STYLE_KEYWORDS.contains(&lower.as_str()) && style.is_none() {
            style = Some(t.remove(0));
        } else if FONT_VARIANT_KEYWORDS.contains(&lower.as_str()) && variant.is_none() {
            variant = Some(t.remove(0));
        } else if FONT_WEIGHT_KEYWORDS.contains(&lower.as_str()) && weight.is_none() {
            weight = Some(t.remove(0));
        } else {
            break;
        }
    }

    let mut out = vec![
        Declaration {
            name: "font-style".into(),
            value: style.unwrap_or_else(|| "normal".into()),
        },
        Declaration {
            name: "font-variant".into(),
            value: variant.unwrap_or_else(|| "normal".into()),
        },
        Declaration {
            name: "font-weight".into(),
            value: weight.unwrap_or_else(|| "normal".into()),
        },
    ];

    if t.is_empty() {
        return out;
    }

    // Remaining tokens: "<size>[/<line-height>] <family...>"
    let size_tok = t.remove(0);
    let (size, line_height) = match size_tok.split_once('/') {
        Some((s, l)) => (s.to_string(), Some(l.to_string())),
        None => (size_tok, None),
    };
    out.push(Declaration { name: "font-size".into(), value: size });
    out.push(Declaration {
        name: "line-height".into(),
        value: line_height.unwrap_or_else(|| "normal".into()),
    });
    out.push(Declaration {
        name: "font-family".into(),
        value: t.join(" "),
    });
    out
}

fn expand_border(value: &str, prefix: &str) -> Vec<Declaration> {
    let mut width = None;
    let mut style = None;
    let mut color = None;

    for tok in tokens(value) {
        let lower = tok.to_ascii_lowercase();
        if BORDER_STYLES.contains(&lower.as_str()) {
            style = Some(tok);
        } else if BORDER_WIDTH_KEYWORDS.contains(&lower.as_str()) || starts_with_digit(&tok) {
            width = Some(tok);
        } else {
            color = Some(tok);
        }
    }

    vec![
        Declaration {
            name: format!("{prefix}-width"),
            value: width.unwrap_or_else(|| "medium".into()),
        },
        Declaration {
            name: format!("{prefix}-style"),
            value: style.unwrap_or_else(|| "none".into()),
        },
        Declaration {
            name: format!("{prefix}-color"),
            value: color.unwrap_or_else(|| "currentcolor".into()),
        },
    ]
}

fn starts_with_digit(tok: &str) -> bool {
    tok.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_padding_shorthand() {
        let decls = expand_shorthand("padding", "1px 2px 3px 4px").unwrap();
        assert_eq!(decls[0].value, "1px");
        assert_eq!(decls[1].value, "2px");
        assert_eq!(decls[2].value, "3px");
        assert_eq!(decls[3].value, "4px");
    }

    #[test]
    fn expands_padding_single_value() {
        let decls = expand_shorthand("padding", "8px").unwrap();
        assert!(decls.iter().all(|d| d.value == "8px"));
    }

    #[test]
    fn expands_border_shorthand() {
        let decls = expand_shorthand("border", "1px solid red").unwrap();
        assert_eq!(decls[0].value, "1px");
        assert_eq!(decls[1].value, "solid");
        assert_eq!(decls[2].value, "red");
    }

    #[test]
    fn expands_background_with_gradient_and_position() {
        let decls =
            expand_shorthand("background", "linear-gradient(red, blue) center / cover no-repeat")
                .unwrap();
        let image = decls.iter().find(|d| d.name == "background-image").unwrap();
        assert!(image.value.starts_with("linear-gradient"));
        let repeat = decls.iter().find(|d| d.name == "background-repeat").unwrap();
        assert_eq!(repeat.value, "no-repeat");
    }

    #[test]
    fn expands_font_shorthand() {
        let decls = expand_shorthand("font", "italic bold 16px/1.5 Inter, sans-serif").unwrap();
        assert_eq!(decls.iter().find(|d| d.name == "font-style").unwrap().value, "italic");
        assert_eq!(decls.iter().find(|d| d.name == "font-weight").unwrap().value, "bold");
        assert_eq!(decls.iter().find(|d| d.name == "font-size").unwrap().value, "16px");
        assert_eq!(decls.iter().find(|d| d.name == "line-height").unwrap().value, "1.5");
        assert_eq!(
            decls.iter().find(|d| d.name == "font-family").unwrap().value,
            "Inter, sans-serif"
        );
    }
}
