use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use logrelay::config::AppConfig;
use logrelay::emitter::{ClientContext, Emitter};
use logrelay::record::LogLevel;
use logrelay::server::{self, AppState};
use logrelay::sink::{ConsoleSink, RollingFileSink, RotationPolicy, Sink};
use logrelay::transport::HttpTransport;
use logrelay::writer::Pipeline;

#[derive(Parser)]
#[command(name = "logrelay", about = "Log relay server and client for the fitness tracker app")]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, default_value = "logrelay.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingestion server
    Serve,
    /// Send one record through the client emitter (echoes locally in
    /// development mode, ships to the endpoint in production mode)
    Emit {
        #[arg(long, default_value = "info")]
        level: String,
        #[arg(long)]
        message: String,
        /// key=value metadata pairs, repeatable
        #[arg(long = "meta", value_parser = parse_meta)]
        meta: Vec<(String, String)>,
    },
}

fn parse_meta(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Serve => run_server(config).await,
        Command::Emit {
            level,
            message,
            meta,
        } => run_emit(config, &level, message, meta).await,
    }
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.files.dir)?;
    let policy = RotationPolicy {
        max_size_bytes: config.files.max_size_bytes,
        max_age_days: config.files.max_age_days,
    };
    let sinks: Vec<Box<dyn Sink>> = vec![
        Box::new(ConsoleSink),
        Box::new(RollingFileSink::new(
            config.files.error_path(),
            Some(LogLevel::Error),
            policy,
        )),
        Box::new(RollingFileSink::new(
            config.files.combined_path(),
            None,
            policy,
        )),
    ];

    let (writer, pipeline) = Pipeline::new(config.component.clone(), config.level, sinks, 1024);
    tokio::spawn(pipeline.run());

    let state = AppState {
        writer,
        nav: config.nav.clone(),
    };
    server::serve(&config.listen, state).await
}

async fn run_emit(
    config: AppConfig,
    level: &str,
    message: String,
    meta: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let transport = HttpTransport::new(config.endpoint.clone());
    let context = ClientContext {
        url: "cli://logrelay".to_string(),
        user_agent: format!("logrelay/{}", env!("CARGO_PKG_VERSION")),
    };
    let emitter = Emitter::new(config.mode, "frontend", context, transport);

    let metadata: BTreeMap<String, serde_json::Value> = meta
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect();

    // Hold the process open until delivery settles; a real page has its
    // keepalive semantics instead.
    if let Some(handle) = emitter.emit(LogLevel::parse(level), message, metadata) {
        handle.await?;
    }
    Ok(())
}
