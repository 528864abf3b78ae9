//! The data model of §3. Node/style graphs are arena-shaped: every node and
//! style lives in a flat `Vec` inside its owning `ScenePayload` and
//! references its neighbors by UUID string rather than by pointer or
//! index, matching §9's "arena + stable index, no back-edges" guidance —
//! a UUID is simply the stable index that also happens to survive
//! serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::validation::{codes, Issue, ValidationResult};

pub const SCENE_PAYLOAD_TYPE: &str = "@webflow/XscpData";

/// The finite variant-key set (§6), plus live node UUIDs (checked
/// separately since that set is per-payload, not closed).
pub const CANONICAL_VARIANT_KEYS: &[&str] = &[
    "large",
    "xl",
    "xxl",
    "medium",
    "small",
    "tiny",
    "hover",
    "focus",
    "active",
    "visited",
    "focus-visible",
    "focus-within",
    "disabled",
];

pub fn is_canonical_variant_key(key: &str) -> bool {
    CANONICAL_VARIANT_KEYS.contains(&key)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    Block,
    HtmlEmbed,
    Link,
    Image,
    Heading,
    Paragraph,
    List,
    ListItem,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attr: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<EmbedMeta>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbedMeta {
    pub meta: EmbedMetaInner,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbedMetaInner {
    /// Duplicated at `node.v` too (§6) — both must be kept in sync.
    pub html: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub tag: String,
    /// Style UUIDs, never class names (§6).
    pub classes: Vec<String>,
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NodeData>,
}

impl Node {
    pub fn new_block(tag: impl Into<String>) -> Self {
        Self {
            id: new_uuid(),
            node_type: NodeType::Block,
            tag: tag.into(),
            classes: Vec::new(),
            children: Vec::new(),
            text: None,
            v: None,
            data: None,
        }
    }

    pub fn new_text(value: impl Into<String>) -> Self {
        Self {
            id: new_uuid(),
            node_type: NodeType::Block,
            tag: "span".to_string(),
            classes: Vec::new(),
            children: Vec::new(),
            text: Some(true),
            v: Some(value.into()),
            data: None,
        }
    }

    pub fn is_text(&self) -> bool {
        self.text.unwrap_or(false)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "styleLess")]
    pub style_less: String,
    /// Variant key → scoped `styleLess` override.
    pub variants: BTreeMap<String, VariantBody>,
    pub children: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VariantBody {
    #[serde(rename = "styleLess")]
    pub style_less: String,
}

impl Style {
    pub fn new(name: impl Into<String>, style_less: impl Into<String>) -> Self {
        Self {
            id: new_uuid(),
            name: name.into(),
            style_less: style_less.into(),
            variants: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScenePayloadBody {
    pub nodes: Vec<Node>,
    pub styles: Vec<Style>,
    pub assets: Vec<String>,
    pub ix1: serde_json::Value,
    pub ix2: Ix2,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ix2 {
    pub interactions: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScenePayloadMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<bool>,
}

/// The target builder's clipboard artifact (§3, §6). `type` is enforced to
/// the exact literal `@webflow/XscpData` by a custom `Serialize` impl so it
/// can never drift from the bit-significant value the builder requires.
#[derive(Clone, Debug)]
pub struct ScenePayload {
    pub payload: ScenePayloadBody,
    pub meta: ScenePayloadMeta,
}

impl Default for ScenePayload {
    fn default() -> Self {
        Self { payload: ScenePayloadBody::default(), meta: ScenePayloadMeta::default() }
    }
}

impl ScenePayload {
    /// The literal `{"placeholder": true}` the safety gate substitutes for
    /// a blocked component (§4.10).
    pub fn placeholder() -> Self {
        Self { payload: ScenePayloadBody::default(), meta: ScenePayloadMeta { placeholder: Some(true) } }
    }

    pub fn is_placeholder(&self) -> bool {
        self.meta.placeholder.unwrap_or(false)
    }
}

impl Serialize for ScenePayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        if self.is_placeholder() {
            let mut state = serializer.serialize_struct("ScenePayload", 1)?;
            state.serialize_field("placeholder", &true)?;
            return state.end();
        }
        let mut state = serializer.serialize_struct("ScenePayload", 3)?;
        state.serialize_field("type", SCENE_PAYLOAD_TYPE)?;
        state.serialize_field("payload", &self.payload)?;
        state.serialize_field("meta", &self.meta)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ScenePayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            placeholder: Option<bool>,
            #[serde(default)]
            payload: ScenePayloadBody,
            #[serde(default)]
            meta: ScenePayloadMeta,
        }
        let raw = Raw::deserialize(deserializer)?;
        if raw.placeholder.unwrap_or(false) {
            Ok(ScenePayload::placeholder())
        } else {
            Ok(ScenePayload { payload: raw.payload, meta: raw.meta })
        }
    }
}

pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Nav,
    Header,
    Hero,
    Section,
    Footer,
    Subcomponent,
    Wrapper,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub tag: String,
    pub primary_class: Option<String>,
    pub html_content: String,
    pub classes_used: Vec<String>,
    pub assets_used: Vec<String>,
    pub js_hooks: Vec<String>,
    pub children: Vec<String>,
    pub order: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComponentTree {
    pub components: Vec<Component>,
    pub root_order: Vec<String>,
    pub warnings: Vec<String>,
}

impl ComponentTree {
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id == id)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EmbedContent {
    pub css: String,
    pub js: String,
    pub html: String,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentArtifact {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub category: ComponentType,
    pub html_content: String,
    pub classes_used: Vec<String>,
    pub js_hooks: Vec<String>,
    pub scene_payload: ScenePayload,
    pub code_payload: String,
    pub embed: EmbedContent,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectedFont {
    pub family: String,
    pub installation_guidance: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClassRenamingReport {
    pub renamed: BTreeMap<String, String>,
    pub source: String,
}

/// The pipeline's terminal value (§3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub project_name: String,
    pub project_slug: String,
    pub tokens: flowbridge_css::TokenManifest,
    pub token_scene_payload: ScenePayload,
    pub components: Vec<ComponentArtifact>,
    pub fonts: Vec<DetectedFont>,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_summary: Option<String>,
    pub class_renaming: ClassRenamingReport,
    #[serde(skip)]
    pub issues: SkipDebugValidation,
}

/// `ValidationResult` participates in the bundle but is not part of the
/// wire artifact (§4.5's report is surfaced separately by the CLI) —
/// wrapped so `ArtifactBundle` can still derive `Debug`/`Clone` uniformly.
#[derive(Clone, Debug, Default)]
pub struct SkipDebugValidation(pub ValidationResult);

impl ArtifactBundle {
    /// The dedicated cancelled-run artifact (§5): no partial side effects,
    /// just a fatal issue recording that the caller's token fired.
    pub fn cancelled(project_name: impl Into<String>) -> Self {
        let mut issues = ValidationResult::default();
        issues.push(Issue::fatal(codes::IMPORT_CANCELLED, "import was cancelled"));
        Self {
            project_name: project_name.into(),
            project_slug: String::new(),
            tokens: flowbridge_css::TokenManifest::default(),
            token_scene_payload: ScenePayload::placeholder(),
            components: Vec::new(),
            fonts: Vec::new(),
            images: Vec::new(),
            llm_summary: None,
            class_renaming: ClassRenamingReport::default(),
            issues: SkipDebugValidation(issues),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_payload_serializes_fixed_type_string() {
        let payload = ScenePayload::default();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], SCENE_PAYLOAD_TYPE);
    }

    #[test]
    fn placeholder_serializes_to_bare_object() {
        let payload = ScenePayload::placeholder();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "placeholder": true }));
    }

    #[test]
    fn canonical_variant_keys_are_recognized() {
        assert!(is_canonical_variant_key("hover"));
        assert!(is_canonical_variant_key("xxl"));
        assert!(!is_canonical_variant_key("bogus"));
    }
}
