//! `PipelineConfig` (§1.3, §9): a single read-only struct threaded
//! explicitly through every pipeline stage instead of a process-wide
//! singleton. The CLI is the only place that reads environment variables
//! (§6) and folds them in; the library itself never does, so
//! `process_import` stays referentially transparent for a fixed input.

use std::time::Duration;

/// The §4.2 breakpoint threshold table `flowbridge_css::parse_stylesheet_with_breakpoints`
/// classifies `@media` preludes against. Re-exported here (rather than
/// redefined) so a caller embedding this pipeline in a different product
/// retunes the very table the CSS crate reads, not a decorative copy of it.
pub use flowbridge_css::BreakpointThresholds;

#[derive(Clone, Debug, PartialEq)]
pub struct EmbedSizeLimits {
    pub soft: usize,
    pub hard: usize,
}

impl Default for EmbedSizeLimits {
    fn default() -> Self {
        Self { soft: 40_000, hard: 50_000 }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub breakpoints: BreakpointThresholds,
    /// The target builder's reserved class prefix (§4.10 step 10).
    pub reserved_class_prefix: String,
    pub embed_size_limits: EmbedSizeLimits,
    /// Suffix appended to a decoupled gradient class (§4.6): `card` → `card-bg`.
    pub decoupler_suffix: String,
    /// Max scene-graph node depth before depth-flattening kicks in (§4.10 step 4).
    pub max_node_depth: usize,
    /// Hard cap on HTML parser recursion (§4.1, §5).
    pub max_html_depth: usize,
    /// Bounded recursion depth for `var()` resolution (§4.4, §5).
    pub max_var_resolution_depth: usize,
    /// Deadline for the optional semantic-patch HTTP call (§5).
    pub llm_deadline: Duration,
    /// Force the LLM to run even if the decision heuristics of §4.8 would skip it.
    pub force_llm: bool,
    /// Use `MockLlmClient` regardless of what client the caller passed in.
    pub mock_llm: bool,
    pub llm_model: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            breakpoints: BreakpointThresholds::default(),
            reserved_class_prefix: "w-".to_string(),
            embed_size_limits: EmbedSizeLimits::default(),
            decoupler_suffix: "-bg".to_string(),
            max_node_depth: 30,
            max_html_depth: 512,
            max_var_resolution_depth: 8,
            llm_deadline: Duration::from_secs(30),
            force_llm: false,
            mock_llm: false,
            llm_model: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_force_llm(mut self, force: bool) -> Self {
        self.force_llm = force;
        self
    }

    pub fn with_mock_llm(mut self, mock: bool) -> Self {
        self.mock_llm = mock;
        self
    }

    pub fn with_llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = Some(model.into());
        self
    }

    pub fn with_llm_deadline(mut self, deadline: Duration) -> Self {
        self.llm_deadline = deadline;
        self
    }

    pub fn with_max_node_depth(mut self, depth: usize) -> Self {
        self.max_node_depth = depth;
        self
    }

    pub fn with_breakpoints(mut self, breakpoints: BreakpointThresholds) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn with_max_var_resolution_depth(mut self, depth: usize) -> Self {
        self.max_var_resolution_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.reserved_class_prefix, "w-");
        assert_eq!(cfg.embed_size_limits.soft, 40_000);
        assert_eq!(cfg.embed_size_limits.hard, 50_000);
        assert_eq!(cfg.max_node_depth, 30);
        assert_eq!(cfg.max_html_depth, 512);
        assert_eq!(cfg.max_var_resolution_depth, 8);
    }

    #[test]
    fn builder_overrides_individual_knobs() {
        let cfg = PipelineConfig::default().with_force_llm(true).with_max_node_depth(10);
        assert!(cfg.force_llm);
        assert_eq!(cfg.max_node_depth, 10);
    }

    #[test]
    fn builder_overrides_breakpoints_and_var_depth() {
        let breakpoints = BreakpointThresholds { small_max_px: 600.0, ..BreakpointThresholds::default() };
        let cfg = PipelineConfig::default().with_breakpoints(breakpoints).with_max_var_resolution_depth(2);
        assert_eq!(cfg.breakpoints.small_max_px, 600.0);
        assert_eq!(cfg.max_var_resolution_depth, 2);
    }
}
