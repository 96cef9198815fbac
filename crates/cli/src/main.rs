//! `weaver` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server (trigger + streaming endpoints).
//! - `validate` — validate a workflow JSON file's DAG, standalone.

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "weaver", about = "Web-automation workflow execution engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST + websocket API server.
    Serve(RunnerConfig),
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: std::path::PathBuf,
    },
}

/// Process-wide runner configuration, read from environment variables —
/// there is no config-file loader. Per-node timeouts (element-locate,
/// user-input, screenshot quality) stay workflow-document config, not
/// process-wide settings, since a single workflow can reasonably mix
/// slow and fast steps.
#[derive(Args)]
struct RunnerConfig {
    /// Address the HTTP/websocket server binds to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,

    /// Default `headless` value for a trigger request that omits it.
    #[arg(long, env = "HEADLESS", default_value = "true")]
    headless: bool,

    /// Directory `ExecutionRecord`s are persisted under.
    #[arg(long, env = "EXECUTION_STORE_DIR", default_value = "./data/executions")]
    execution_store_dir: std::path::PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => {
            info!(bind = %config.bind_addr, "starting server");

            let repository = persistence::JsonFileExecutionRepository::new(config.execution_store_dir)
                .await
                .expect("failed to initialize execution store");

            let engine = Arc::new(engine::Engine::new(engine::ActionRegistry::with_builtins(), Arc::new(repository)));
            let connections = Arc::new(streaming::ConnectionRegistry::new());

            let llm = match browser::HttpLlmClient::from_env() {
                Ok(client) => Some(Arc::new(client) as Arc<dyn browser::LlmClient>),
                Err(_) => {
                    info!("no LLM configured (set LLM_API_KEY to enable AI-assisted locating)");
                    None
                }
            };

            api::serve(&config.bind_addr, engine, connections, config.headless, llm).await.expect("server error");
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let workflow: engine::Workflow =
                serde_json::from_str(&content).unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            match engine::validate_dag(&workflow) {
                Ok(order) => {
                    println!("workflow is valid. execution order: {order:?}");
                }
                Err(e) => {
                    eprintln!("validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
