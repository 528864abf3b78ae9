//! Thin CLI front end (§6): reads one HTML file, runs the pipeline, writes
//! the artifact bundle out as a handful of JSON files. No DB, no auth, no
//! upload handling — this exists only so the library is runnable end to end.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use flowbridge_core::pipeline::Stage;
use flowbridge_core::{process_import, PipelineConfig};
use flowbridge_net::{HttpLlmClient, LlmClient, MockLlmClient};
use tokio_util::sync::CancellationToken;
use url::Url;

const DEFAULT_SEMANTIC_ENDPOINT: &str = "https://api.flowbridge.dev/api/flowbridge/semantic";

#[derive(Parser, Debug)]
#[command(name = "flowbridge-cli", about = "Transpile one AI-generated HTML document into a flowbridge artifact bundle")]
struct Cli {
    /// Path to the HTML document to import.
    input: PathBuf,

    #[arg(long = "project-name")]
    project_name: String,

    #[arg(long = "out-dir", default_value = "out")]
    out_dir: PathBuf,

    /// Invoke the semantic-patch LLM call even if the §4.8 heuristics would skip it.
    #[arg(long = "use-llm")]
    use_llm: bool,
}

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true"))
}

fn config_from_env(cli: &Cli) -> PipelineConfig {
    let mut config = PipelineConfig::default()
        .with_force_llm(cli.use_llm || env_flag("USE_LLM") || env_flag("FLOWBRIDGE_FORCE_LLM"))
        .with_mock_llm(env_flag("FLOWBRIDGE_LLM_MOCK"));
    if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
        config = config.with_llm_model(model);
    }
    config
}

fn build_client(config: &PipelineConfig) -> Box<dyn LlmClient> {
    if config.mock_llm {
        return Box::new(MockLlmClient);
    }
    let endpoint = std::env::var("FLOWBRIDGE_SEMANTIC_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_SEMANTIC_ENDPOINT.to_string());
    let endpoint = Url::parse(&endpoint).expect("FLOWBRIDGE_SEMANTIC_ENDPOINT must be a valid URL");
    Box::new(HttpLlmClient::new(endpoint, config.llm_deadline, config.llm_model.clone()))
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value).expect("artifact types always serialize");
    fs::write(path, body)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let html_input = match fs::read_to_string(&cli.input) {
        Ok(s) => s,
        Err(err) => {
            tracing::error!(path = %cli.input.display(), %err, "failed to read input HTML");
            return ExitCode::FAILURE;
        }
    };

    let config = config_from_env(&cli);
    let client = build_client(&config);
    let llm_ref: Option<&dyn LlmClient> = Some(client.as_ref());
    let cancel = CancellationToken::new();

    let progress = |stage: Stage, percent: u8| {
        tracing::info!(stage = ?stage, percent, "import progress");
    };

    let bundle =
        process_import(&html_input, &cli.project_name, progress, &cancel, llm_ref, &config).await;

    if !bundle.issues.0.can_proceed() {
        tracing::warn!(summary = ?bundle.issues.0.summary(), "import completed with fatal issues");
    }

    let tokens_path = cli.out_dir.join("tokens.json");
    let tokens_doc = serde_json::json!({
        "tokens": bundle.tokens,
        "scenePayload": bundle.token_scene_payload,
        "fonts": bundle.fonts,
        "images": bundle.images,
        "classRenaming": bundle.class_renaming,
        "llmSummary": bundle.llm_summary,
    });
    if let Err(err) = write_json(&tokens_path, &tokens_doc) {
        tracing::error!(%err, "failed to write tokens.json");
        return ExitCode::FAILURE;
    }

    for component in &bundle.components {
        let path = cli.out_dir.join("components").join(format!("{}.json", component.slug));
        if let Err(err) = write_json(&path, component) {
            tracing::error!(%err, slug = %component.slug, "failed to write component artifact");
            return ExitCode::FAILURE;
        }
    }

    let safety_path = cli.out_dir.join("safety-report.json");
    let safety_doc = serde_json::json!({
        "canProceed": bundle.issues.0.can_proceed(),
        "summary": bundle.issues.0.summary(),
    });
    if let Err(err) = write_json(&safety_path, &safety_doc) {
        tracing::error!(%err, "failed to write safety-report.json");
        return ExitCode::FAILURE;
    }

    tracing::info!(out_dir = %cli.out_dir.display(), components = bundle.components.len(), "import complete");
    ExitCode::SUCCESS
}
