//! Semantic patch: the optional LLM-assisted finishing pass (§4.8). The
//! pipeline invokes this only when deterministic naming and token
//! resolution left visible gaps — never as a required step.

use std::collections::BTreeMap;

use flowbridge_css::TokenManifest;
use flowbridge_html::{HtmlDoc, HtmlNode};
use flowbridge_net::{
    ComponentRef, CssPatchOp, DomOutlineNode, HtmlPatchOp, LlmClient, ResponseMode,
    SemanticPatchRequest, SemanticPatchResponse,
};
use tokio_util::sync::CancellationToken;

use crate::componentize::collect_classes;
use crate::model::ComponentTree;
use crate::validation::{codes, Issue};

const MAX_OUTLINE_TEXT: usize = 80;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// BFS over the whole document, minting `n1, n2, ...` node ids in visit
/// order (§4.8) so the model can refer to elements without depending on any
/// identifier this tool invented for its own internal use.
fn build_dom_outline(doc: &HtmlDoc) -> Vec<DomOutlineNode> {
    let mut outline = Vec::new();
    let mut queue: std::collections::VecDeque<&HtmlNode> = doc.roots.iter().collect();
    let mut counter = 1usize;
    while let Some(node) = queue.pop_front() {
        if let HtmlNode::Element(el) = node {
            let node_id = format!("n{counter}");
            counter += 1;
            outline.push(DomOutlineNode {
                node_id,
                tag: el.tag.clone(),
                classes: el.classes(),
                id: el.id().map(str::to_string),
                text: truncate(el.text_content().trim(), MAX_OUTLINE_TEXT),
            });
            for child in &el.children {
                queue.push_back(child);
            }
        }
    }
    outline
}

fn is_generic_name(name: &str) -> bool {
    name.starts_with("Section ") || name == "Block" || name == "Page"
}

/// Decides whether the semantic patch round trip is worth its latency
/// (§4.8): only when normalization left something a human would notice —
/// an unresolved token, a class-index warning, or a component that never
/// got a real name — or when the caller forces it.
pub fn should_invoke(tree: &ComponentTree, warnings: &[String], config: &crate::config::PipelineConfig) -> bool {
    config.force_llm
        || !warnings.is_empty()
        || tree.components.iter().any(|c| is_generic_name(&c.name))
}

/// Assembles the wire request (§4.8, §6) from the normalized document, the
/// componentizer's output, and the resolved token manifest.
pub fn build_request(
    doc: &HtmlDoc,
    tree: &ComponentTree,
    tokens: &TokenManifest,
    warnings: &[String],
) -> SemanticPatchRequest {
    let dom_outline = build_dom_outline(doc);
    let components = tree
        .components
        .iter()
        .map(|c| ComponentRef { component_id: c.id.clone(), name: c.name.clone(), root_node_ids: Vec::new() })
        .collect();
    let token_map: BTreeMap<String, String> =
        tokens.variables.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect();
    let full_html = flowbridge_html::serialize(&doc.roots);
    let component_html: Vec<String> = tree.components.iter().map(|c| c.html_content.clone()).collect();
    let component_full_html = component_html.clone();

    SemanticPatchRequest {
        dom_outline,
        components,
        warnings: warnings.to_vec(),
        tokens: token_map,
        full_html,
        component_html,
        component_full_html,
    }
}

pub struct AppliedPatch {
    pub tree: ComponentTree,
    pub final_css: Option<String>,
}

/// Applies a response's renames, HTML patches, and CSS patches (§4.8). An
/// unknown component id in a rename is ignored rather than treated as an
/// error; the result is rejected in toto if any component would end up
/// with empty `htmlContent`.
pub fn apply_response(original: &ComponentTree, response: &SemanticPatchResponse) -> Result<AppliedPatch, Issue> {
    let mut tree = original.clone();

    for rename in &response.component_renames {
        if let Some(c) = tree.get_mut(&rename.id) {
            c.name = rename.name.clone();
        }
    }

    for patch in &response.html_patches {
        let HtmlPatchOp::ReplaceHtml = patch.op;
        if let Some(c) = tree.get_mut(&patch.component_id) {
            c.html_content = patch.html.clone();
            let parsed = flowbridge_html::parse(&c.html_content);
            if let Some(root) = parsed.roots.iter().find_map(HtmlNode::as_element) {
                c.classes_used = collect_classes(root);
                c.primary_class = root.classes().first().cloned();
            }
        }
    }

    if tree.components.iter().any(|c| c.html_content.trim().is_empty()) {
        return Err(Issue::error(
            codes::SEMANTIC_PATCH_REJECTED,
            "semantic patch would have emptied a component's html; discarding the whole response",
        ));
    }

    let final_css = response
        .css_patches
        .iter()
        .rev()
        .find(|p| matches!(p.op, CssPatchOp::ReplaceFinalCss))
        .map(|p| p.css.clone());

    Ok(AppliedPatch { tree, final_css })
}

pub struct SemanticPatchOutcome {
    pub tree: ComponentTree,
    pub final_css: Option<String>,
    pub mode: ResponseMode,
}

/// Runs the full decide → request → apply cycle. Returns the tree
/// untouched (mode `Fallback`) when invocation isn't warranted, the client
/// errors, or the response is rejected; the caller's issue log absorbs any
/// failure so the pipeline always has a usable component tree to emit.
pub async fn run(
    doc: &HtmlDoc,
    tree: ComponentTree,
    tokens: &TokenManifest,
    warnings: &[String],
    client: Option<&dyn LlmClient>,
    config: &crate::config::PipelineConfig,
    cancel: &CancellationToken,
    issues: &mut crate::validation::ValidationResult,
) -> SemanticPatchOutcome {
    let Some(client) = client else {
        return SemanticPatchOutcome { tree, final_css: None, mode: ResponseMode::Fallback };
    };
    if !should_invoke(&tree, warnings, config) {
        return SemanticPatchOutcome { tree, final_css: None, mode: ResponseMode::Fallback };
    }

    let request = build_request(doc, &tree, tokens, warnings);
    match client.request_patch(&request, cancel).await {
        Ok(response) => match apply_response(&tree, &response) {
            Ok(applied) => {
                let mode = if config.mock_llm { ResponseMode::Mock } else { ResponseMode::Live };
                SemanticPatchOutcome { tree: applied.tree, final_css: applied.final_css, mode }
            }
            Err(issue) => {
                issues.push(issue);
                SemanticPatchOutcome { tree, final_css: None, mode: ResponseMode::Fallback }
            }
        },
        Err(err) => {
            issues.push(Issue::warning(
                codes::SEMANTIC_PATCH_REJECTED,
                format!("semantic patch call failed, falling back to deterministic output: {err}"),
            ));
            SemanticPatchOutcome { tree, final_css: None, mode: ResponseMode::Fallback }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowbridge_net::{ComponentRename, CssPatch, HtmlPatch, MockLlmClient};

    fn sample_tree() -> ComponentTree {
        ComponentTree {
            components: vec![crate::model::Component {
                id: "section-1".to_string(),
                name: "Section 1".to_string(),
                component_type: crate::model::ComponentType::Section,
                tag: "section".to_string(),
                primary_class: Some("section".to_string()),
                html_content: "<section class=\"section\">x</section>".to_string(),
                classes_used: vec!["section".to_string()],
                assets_used: Vec::new(),
                js_hooks: Vec::new(),
                children: Vec::new(),
                order: 0,
            }],
            root_order: vec!["section-1".to_string()],
            warnings: Vec::new(),
        }
    }

    #[test]
    fn generic_name_triggers_invocation() {
        let tree = sample_tree();
        let config = crate::config::PipelineConfig::default();
        assert!(should_invoke(&tree, &[], &config));
    }

    #[test]
    fn named_tree_with_no_warnings_skips_invocation() {
        let mut tree = sample_tree();
        tree.components[0].name = "Pricing".to_string();
        let config = crate::config::PipelineConfig::default();
        assert!(!should_invoke(&tree, &[], &config));
    }

    #[test]
    fn unknown_rename_id_is_ignored() {
        let tree = sample_tree();
        let response = SemanticPatchResponse {
            component_renames: vec![ComponentRename { id: "missing".to_string(), name: "Nope".to_string() }],
            ..Default::default()
        };
        let applied = apply_response(&tree, &response).unwrap();
        assert_eq!(applied.tree.components[0].name, "Section 1");
    }

    #[test]
    fn empty_replacement_html_rejects_whole_response() {
        let tree = sample_tree();
        let response = SemanticPatchResponse {
            html_patches: vec![HtmlPatch {
                component_id: "section-1".to_string(),
                op: HtmlPatchOp::ReplaceHtml,
                html: "   ".to_string(),
            }],
            ..Default::default()
        };
        assert!(apply_response(&tree, &response).is_err());
    }

    #[test]
    fn last_css_patch_wins() {
        let tree = sample_tree();
        let response = SemanticPatchResponse {
            css_patches: vec![
                CssPatch { op: CssPatchOp::ReplaceFinalCss, css: "a{}".to_string() },
                CssPatch { op: CssPatchOp::ReplaceFinalCss, css: "b{}".to_string() },
            ],
            ..Default::default()
        };
        let applied = apply_response(&tree, &response).unwrap();
        assert_eq!(applied.final_css, Some("b{}".to_string()));
    }

    #[tokio::test]
    async fn mock_client_leaves_tree_in_mock_mode() {
        let tree = sample_tree();
        let doc = flowbridge_html::parse("<section class=\"section\">x</section>");
        let tokens = TokenManifest::default();
        let client = MockLlmClient;
        let config = crate::config::PipelineConfig::default().with_mock_llm(true);
        let mut issues = crate::validation::ValidationResult::default();
        let cancel = CancellationToken::new();
        let outcome =
            run(&doc, tree, &tokens, &[], Some(&client), &config, &cancel, &mut issues).await;
        assert_eq!(outcome.mode, ResponseMode::Mock);
    }
}
