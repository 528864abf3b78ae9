//! The semantic patch wire protocol (§4.8, §6). Intentionally over-
//! constrained — every response-side type rejects unknown fields so a
//! model's influence on the pipeline stays auditable and capped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomOutlineNode {
    pub node_id: String,
    pub tag: String,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Truncated to 80 chars by the caller before this is built.
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    pub component_id: String,
    pub name: String,
    pub root_node_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticPatchRequest {
    pub dom_outline: Vec<DomOutlineNode>,
    pub components: Vec<ComponentRef>,
    pub warnings: Vec<String>,
    pub tokens: BTreeMap<String, String>,
    pub full_html: String,
    pub component_html: Vec<String>,
    pub component_full_html: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentRename {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HtmlPatchOp {
    #[serde(rename = "replaceHtml")]
    ReplaceHtml,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct HtmlPatch {
    pub component_id: String,
    pub op: HtmlPatchOp,
    pub html: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CssPatchOp {
    #[serde(rename = "replaceFinalCss")]
    ReplaceFinalCss,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CssPatch {
    pub op: CssPatchOp,
    pub css: String,
}

/// Closed-schema response body (§4.8): any extra key, wrong `op`, or wrong
/// type fails deserialization outright, which `HttpLlmClient` turns into
/// `LlmError::BadResponse`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SemanticPatchResponse {
    #[serde(default)]
    pub component_renames: Vec<ComponentRename>,
    #[serde(default)]
    pub html_patches: Vec<HtmlPatch>,
    #[serde(default)]
    pub css_patches: Vec<CssPatch>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Mock,
    Live,
    Fallback,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticEnvelopeMeta {
    pub mode: ResponseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `POST /api/flowbridge/semantic` response envelope (§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticEnvelope {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<SemanticPatchResponse>,
    pub meta: SemanticEnvelopeMeta,
}
