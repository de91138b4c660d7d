use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use secrecy::SecretString;

use sentient_engine::google::{GoogleClient, GoogleConfig};
use sentient_engine::{Agent, EngineError, RunnerConfig, ToolRegistry};
use sentient_llm::{GeminiConfig, GeminiEngine};
use sentient_settings::SentientSettings;
use sentient_store::{Database, MemoryStore};
use sentient_telemetry::TelemetryConfig;

/// Personal assistant agent over mail, calendar and long-term memory.
#[derive(Parser)]
#[command(name = "sentient", version)]
struct Cli {
    /// Settings file (defaults to ~/.sentient/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP backend (default).
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one message and print the reply.
    Ask { text: Vec<String> },
    /// Interactive conversation on stdin.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => sentient_settings::load_settings_from_path(path),
        None => sentient_settings::load_settings(),
    }
    .context("loading settings")?;

    sentient_telemetry::init_telemetry(&TelemetryConfig::from_level_str(
        &settings.logging.level,
        settings.logging.json,
    ));

    let agent = Arc::new(build_agent(&settings)?);

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(&settings, port, agent).await,
        Command::Ask { text } => {
            println!("{}", reply_or_apology(agent.submit(&text.join(" ")).await));
            Ok(())
        }
        Command::Chat => chat(agent).await,
    }
}

fn build_agent(settings: &SentientSettings) -> anyhow::Result<Agent> {
    let timezone: chrono_tz::Tz = settings
        .agent
        .timezone
        .parse()
        .map_err(|e| anyhow!("invalid timezone {:?}: {e}", settings.agent.timezone))?;

    let db = Database::open(Path::new(&settings.storage.memory_db_path))?;
    let memory = MemoryStore::new(db);
    tracing::info!(facts = memory.count()?, "long-term memory loaded");

    let google = Arc::new(GoogleClient::new(GoogleConfig {
        token_path: PathBuf::from(&settings.google.token_path),
        gmail_base_url: settings.google.gmail_base_url.clone(),
        calendar_base_url: settings.google.calendar_base_url.clone(),
        request_timeout: Duration::from_secs(settings.google.request_timeout_secs),
    })?);

    let api_key = std::env::var("GEMINI_API_KEY")
        .or_else(|_| std::env::var("GOOGLE_API_KEY"))
        .context("GEMINI_API_KEY is not set")?;
    let engine = GeminiEngine::new(GeminiConfig {
        api_key: SecretString::from(api_key),
        model: settings.llm.model.clone(),
        base_url: settings.llm.base_url.clone(),
        temperature: settings.llm.temperature,
        request_timeout: Duration::from_secs(settings.llm.request_timeout_secs),
    })?;

    let registry = Arc::new(ToolRegistry::new(
        google.clone(),
        google,
        memory,
        timezone,
    ));

    Ok(Agent::new(
        Arc::new(engine),
        registry,
        RunnerConfig {
            max_cycles: settings.agent.max_cycles,
            tool_timeout: Duration::from_secs(settings.agent.tool_timeout_secs),
            timezone,
        },
    ))
}

async fn serve(settings: &SentientSettings, port: Option<u16>, agent: Arc<Agent>) -> anyhow::Result<()> {
    let config = sentient_server::ServerConfig {
        host: settings.server.host.clone(),
        port: port.unwrap_or(settings.server.port),
    };
    let handle = sentient_server::start(config, agent)
        .await
        .context("starting server")?;

    tracing::info!(port = handle.port, "Sentient ready");

    tokio::signal::ctrl_c().await.context("listening for ctrl+c")?;
    tracing::info!("Shutting down");
    handle.shutdown();
    Ok(())
}

async fn chat(agent: Arc<Agent>) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(1);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    prompt()?;
    while let Some(line) = rx.recv().await {
        let line = line.trim();
        if matches!(line, "exit" | "quit") {
            break;
        }
        if !line.is_empty() {
            println!("{}\n", reply_or_apology(agent.submit(line).await));
        }
        prompt()?;
    }
    Ok(())
}

/// The caller always gets a reply string; request-level failures are logged
/// and answered with an apology.
fn reply_or_apology(result: Result<String, EngineError>) -> String {
    match result {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, kind = e.error_kind(), "request failed");
            e.apology()
        }
    }
}

fn prompt() -> std::io::Result<()> {
    let mut out = std::io::stdout();
    write!(out, "> ")?;
    out.flush()
}
