//! `process_import` (§5, §6): composes the leaves-first stage diagram into
//! one entrypoint, reporting progress and checking cancellation at every
//! stage boundary the diagram names.

use std::collections::BTreeMap;

use flowbridge_css::{TokenCategory, TokenManifest};
use flowbridge_net::LlmClient;
use tokio_util::sync::CancellationToken;

use crate::componentize::{self, slugify};
use crate::config::PipelineConfig;
use crate::emit;
use crate::model::{
    ArtifactBundle, ClassRenamingReport, Component, ComponentArtifact, DetectedFont, EmbedContent,
};
use crate::safety;
use crate::semantic_patch;
use crate::validation::ValidationResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Parsing,
    Extracting,
    Componentizing,
    Semantic,
    Generating,
    Complete,
}

impl Stage {
    pub fn percent(self) -> u8 {
        match self {
            Stage::Parsing => 10,
            Stage::Extracting => 30,
            Stage::Componentizing => 50,
            Stage::Semantic => 70,
            Stage::Generating => 90,
            Stage::Complete => 100,
        }
    }
}

fn installation_guidance(family: &str) -> String {
    format!("Ensure '{family}' is loaded (e.g. @font-face or a font service) before this design is rendered.")
}

fn primary_family(value: &str) -> String {
    value.split(',').next().unwrap_or(value).trim().trim_matches(['"', '\''].as_slice()).to_string()
}

fn collect_fonts(tokens: &TokenManifest) -> Vec<DetectedFont> {
    let mut seen = std::collections::HashSet::new();
    tokens
        .variables
        .values()
        .filter(|v| v.category == TokenCategory::FontFamily)
        .filter_map(|v| {
            let family = primary_family(&v.value);
            if family.is_empty() || !seen.insert(family.clone()) {
                None
            } else {
                Some(DetectedFont { installation_guidance: installation_guidance(&family), family })
            }
        })
        .collect()
}

fn collect_images(components: &[Component]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for c in components {
        for asset in &c.assets_used {
            if seen.insert(asset.clone()) {
                out.push(asset.clone());
            }
        }
    }
    out
}

/// Renders one style's `styleLess` (and its variants) back into plain CSS —
/// the `codePayload` half of a `ComponentArtifact` (§3), grounded in the
/// same declaration-rendering discipline the emitter uses.
fn render_code_payload(styles: &[crate::model::Style]) -> String {
    let mut out = String::new();
    for style in styles {
        if !style.style_less.is_empty() {
            out.push_str(&format!(".{} {{ {} }}\n", style.name, style.style_less));
        }
        for (key, body) in &style.variants {
            if body.style_less.is_empty() {
                continue;
            }
            out.push_str(&format!(".{}:{} {{ {} }}\n", style.name, key, body.style_less));
        }
    }
    out
}

/// Runs the full import pipeline (§5): normalize → componentize →
/// semantic-patch → emit → safety, reporting progress at each named stage
/// and returning the dedicated cancelled artifact with no partial side
/// effects if `cancel` fires before completion.
pub async fn process_import(
    html_input: &str,
    project_name: &str,
    mut progress: impl FnMut(Stage, u8),
    cancel: &CancellationToken,
    llm: Option<&dyn LlmClient>,
    config: &PipelineConfig,
) -> ArtifactBundle {
    macro_rules! bail_if_cancelled {
        () => {
            if cancel.is_cancelled() {
                return ArtifactBundle::cancelled(project_name);
            }
        };
    }

    bail_if_cancelled!();
    tracing::debug!(stage = "parsing", project_name, "pipeline stage");
    progress(Stage::Parsing, Stage::Parsing.percent());
    let normalized = crate::normalize::normalize(html_input, config);
    let mut issues = normalized.issues;

    bail_if_cancelled!();
    tracing::debug!(stage = "extracting", variables = normalized.tokens.variables.len(), "pipeline stage");
    progress(Stage::Extracting, Stage::Extracting.percent());
    let mut tokens = normalized.tokens;
    tokens.name = project_name.to_string();
    tokens.slug = slugify(project_name);

    bail_if_cancelled!();
    tracing::debug!(stage = "componentizing", "pipeline stage");
    progress(Stage::Componentizing, Stage::Componentizing.percent());
    let mut tree = componentize::componentize(&normalized.html);
    tracing::info!(components = tree.components.len(), "componentized document");

    bail_if_cancelled!();
    tracing::debug!(stage = "semantic", "pipeline stage");
    progress(Stage::Semantic, Stage::Semantic.percent());
    let outcome = semantic_patch::run(&normalized.html, tree.clone(), &tokens, &tree.warnings.clone(), llm, config, cancel, &mut issues).await;
    tree = outcome.tree;
    let llm_summary = match outcome.mode {
        flowbridge_net::ResponseMode::Live => Some("semantic patch applied a live model response".to_string()),
        flowbridge_net::ResponseMode::Mock => Some("semantic patch applied a mock response".to_string()),
        flowbridge_net::ResponseMode::Fallback => None,
    };

    bail_if_cancelled!();
    tracing::debug!(stage = "generating", "pipeline stage");
    progress(Stage::Generating, Stage::Generating.percent());

    let mut renamed_classes: BTreeMap<String, String> = BTreeMap::new();
    let mut component_artifacts = Vec::with_capacity(tree.components.len());
    for component in &tree.components {
        let mut scene_payload =
            emit::emit_component(&component.html_content, &normalized.class_index, outcome.final_css.as_deref());
        let mut embed = EmbedContent::default();
        let mut component_issues = ValidationResult::default();
        let report = safety::run(&mut scene_payload, &mut embed, config, &mut component_issues);
        issues.extend(component_issues);
        for (old, new) in &report.renamed_reserved_classes {
            renamed_classes.insert(old.clone(), new.clone());
        }

        let code_payload = render_code_payload(&scene_payload.payload.styles);
        let slug = slugify(&component.name);

        component_artifacts.push(ComponentArtifact {
            id: component.id.clone(),
            name: component.name.clone(),
            slug,
            category: component.component_type,
            html_content: component.html_content.clone(),
            classes_used: component.classes_used.clone(),
            js_hooks: component.js_hooks.clone(),
            scene_payload,
            code_payload,
            embed,
        });
    }

    let fonts = collect_fonts(&tokens);
    let images = collect_images(&tree.components);
    let token_scene_payload = emit::emit_token_scene_payload(&tokens);
    let project_slug = slugify(project_name);

    progress(Stage::Complete, Stage::Complete.percent());

    ArtifactBundle {
        project_name: project_name.to_string(),
        project_slug,
        tokens,
        token_scene_payload,
        components: component_artifacts,
        fonts,
        images,
        llm_summary,
        class_renaming: ClassRenamingReport { renamed: renamed_classes, source: "safety-gate reserved-prefix renaming".to_string() },
        issues: crate::model::SkipDebugValidation(issues),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<!doctype html><html><head><style>
        :root { --font-primary: "Inter", sans-serif; }
        .hero { padding: 16px; color: #336699; }
    </style></head><body><section class="hero"><h1>Welcome</h1><img src="/hero.png"></section></body></html>"#;

    #[tokio::test]
    async fn runs_end_to_end_without_llm() {
        let config = PipelineConfig::default();
        let cancel = CancellationToken::new();
        let mut stages = Vec::new();
        let bundle = process_import(
            HTML,
            "My Project",
            |stage, pct| stages.push((stage, pct)),
            &cancel,
            None,
            &config,
        )
        .await;

        assert_eq!(bundle.project_slug, "my-project");
        assert!(!bundle.components.is_empty());
        assert!(bundle.images.contains(&"/hero.png".to_string()));
        assert!(bundle.fonts.iter().any(|f| f.family == "Inter"));
        assert_eq!(stages.last(), Some(&(Stage::Complete, 100)));
    }

    #[tokio::test]
    async fn cancelled_before_start_yields_sentinel_artifact() {
        let config = PipelineConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let bundle = process_import(HTML, "Proj", |_, _| {}, &cancel, None, &config).await;
        assert!(bundle.components.is_empty());
        assert!(!bundle.issues.0.can_proceed());
    }
}
