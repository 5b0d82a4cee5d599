//! galaxy-host: run canvas macros over a scene file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use galaxy_engine::{
    BatchReport, Capabilities, ChannelTransport, EngineConfig, InMemoryScene, MacroEngine, RemoteBridge,
    SceneAccessor,
};
use galaxy_host::{spawn_bridge_host, DirStore, FsPaths, HttpClient, LogNavigator, LogNotifier, SceneFile, SubprocessRunner, TerminalPrompt};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "galaxy-host", version, about = "Run canvas macros over a scene file")]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the macros that apply to a selection
    Scan {
        /// Scene file (element array or canvas export)
        scene: PathBuf,

        /// Selected element ids; empty lists anchors
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
    },

    /// Run macros over a selection and write the resulting scene
    Run {
        scene: PathBuf,

        /// Macro to run; repeat to run several batches in order
        #[arg(long = "macro", required = true)]
        macros: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        /// Output file; defaults to rewriting the input
        #[arg(long)]
        out: Option<PathBuf>,

        /// Directory canvas paths are resolved under
        #[arg(long, default_value = "/")]
        root: PathBuf,

        /// Directory backing `save`
        #[arg(long, default_value = ".galaxy")]
        store: PathBuf,

        /// Prompt answers, used in order before asking on the terminal
        #[arg(long = "answer")]
        answers: Vec<String>,

        /// Never read prompt answers from the terminal
        #[arg(long)]
        no_input: bool,

        /// HTTP timeout for `fetch`, in seconds
        #[arg(long, default_value_t = 30)]
        http_timeout: u64,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_toml_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn summary(report: &BatchReport) -> serde_json::Value {
    json!({
        "macro": report.macro_name,
        "applied": report.applied.len(),
        "failed": report
            .failed
            .iter()
            .map(|(invocation, err)| json!({
                "input": invocation.input_from,
                "output": invocation.output_to,
                "error": err.to_string(),
            }))
            .collect::<Vec<_>>(),
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Command::Scan { scene, select } => {
            let file = SceneFile::load(&scene).await?;
            let canvas = Arc::new(InMemoryScene::new(file.elements));
            canvas.select(select);
            let engine = MacroEngine::new(config, canvas);
            let scan = engine.scan_selection();
            println!("{}", serde_json::to_string_pretty(&scan)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            scene,
            macros,
            select,
            out,
            root,
            store,
            answers,
            no_input,
            http_timeout,
        } => {
            let mut file = SceneFile::load(&scene).await?;
            let canvas = Arc::new(InMemoryScene::new(std::mem::take(&mut file.elements)));
            canvas.select(select);

            let http = HttpClient::new(Duration::from_secs(http_timeout)).context("building HTTP client")?;
            let capabilities = Capabilities::new()
                .with_notifier(Arc::new(LogNotifier))
                .with_navigator(Arc::new(LogNavigator))
                .with_prompt(Arc::new(TerminalPrompt::new(answers, !no_input)))
                .with_kv(Arc::new(DirStore::new(store)))
                .with_paths(Arc::new(FsPaths::new(root)))
                .with_http(Arc::new(http));

            let (transport, requests) = ChannelTransport::new();
            let bridge = Arc::new(RemoteBridge::new(Arc::new(transport)).with_timeout(config.bridge_timeout()));
            let host = spawn_bridge_host(&bridge, requests, SubprocessRunner::new());

            let engine = MacroEngine::new(config, canvas.clone())
                .with_capabilities(capabilities)
                .with_bridge(bridge);

            let mut failed = false;
            for name in &macros {
                let report = engine.invoke_selected(name).await;
                if report.is_empty() {
                    tracing::warn!(macro_name = %name, "nothing in the selection invokes this macro");
                }
                failed |= !report.is_success();
                println!("{}", summary(&report));
            }
            drop(engine);
            host.abort();

            file.elements = canvas.elements();
            let target = out.unwrap_or(scene);
            file.save(&target).await?;
            tracing::info!(path = %target.display(), revision = canvas.revision(), "scene written");

            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
    }
}
