use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod chat;
mod config;

use config::{CourierConfig, SchemaEngine};
use courier_a2a::{A2aClient, A2aServer, AgentCard};
use courier_core::{
    CompletionClient, FsLoader, OllamaClient, Orchestrator, RemoteAgent, RuleInferencer,
    SchemaAgent,
};

#[derive(Parser)]
#[command(name = "courier")]
#[command(version)]
#[command(about = "Courier routes requests between a local model and a schema-inference agent")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,

    /// Serve the orchestrator agent
    Orchestrator,

    /// Serve the schema-inference agent
    SchemaAgent,

    /// Serve both agents in one process
    Start,

    /// Interactive chat with the orchestrator
    Chat {
        /// Agent endpoint (defaults to [chat].endpoint)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Send a one-shot message to the orchestrator
    Ask {
        /// The message to send
        message: String,

        /// Agent endpoint (defaults to [chat].endpoint)
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug when set
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Orchestrator => cmd_orchestrator(&cli.config).await,
        Commands::SchemaAgent => cmd_schema_agent(&cli.config).await,
        Commands::Start => cmd_start(&cli.config).await,
        Commands::Chat { endpoint } => cmd_chat(&cli.config, endpoint).await,
        Commands::Ask { message, endpoint } => cmd_ask(&cli.config, endpoint, &message).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        tokio::fs::write(&config_path, config::DEFAULT_CONFIG).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("Courier initialized at {}", config_dir.display());
    println!("Edit {} to point at your Ollama server.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = CourierConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg)?);
    Ok(())
}

async fn cmd_orchestrator(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = CourierConfig::load(config_path)?;
    let cancel = CancellationToken::new();
    let mut servers = JoinSet::new();
    servers.spawn(serve_orchestrator(cfg, cancel.clone()));
    wait_for_shutdown(cancel, servers).await
}

async fn cmd_schema_agent(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = CourierConfig::load(config_path)?;
    let cancel = CancellationToken::new();
    let mut servers = JoinSet::new();
    servers.spawn(serve_schema_agent(cfg, cancel.clone()));
    wait_for_shutdown(cancel, servers).await
}

async fn cmd_start(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = CourierConfig::load(config_path)?;
    info!("Starting Courier agents...");

    let cancel = CancellationToken::new();
    let mut servers = JoinSet::new();
    servers.spawn(serve_schema_agent(cfg.clone(), cancel.clone()));
    servers.spawn(serve_orchestrator(cfg, cancel.clone()));

    println!("Courier is running. Press Ctrl+C to stop.");
    wait_for_shutdown(cancel, servers).await
}

async fn cmd_chat(config_path: &Option<PathBuf>, endpoint: Option<String>) -> Result<()> {
    let cfg = CourierConfig::load(config_path)?;
    let client = chat_client(&cfg, endpoint)?;

    println!("Chatting with {}. Type 'exit' to quit.", client.endpoint());
    let stdin = BufReader::new(tokio::io::stdin());
    chat::run(&client, stdin, tokio::io::stdout()).await
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    endpoint: Option<String>,
    message: &str,
) -> Result<()> {
    let cfg = CourierConfig::load(config_path)?;
    let client = chat_client(&cfg, endpoint)?;
    let reply = chat::ask(&client, message)
        .await
        .with_context(|| format!("No reply from {}", client.endpoint()))?;
    println!("{}", reply);
    Ok(())
}

// ── Wiring ──

fn completion_client(cfg: &CourierConfig) -> Result<OllamaClient> {
    let engine = &cfg.engine;
    let client = OllamaClient::new(&engine.base_url, engine.model.clone(), engine.timeout())
        .context("Failed to build completion client")?
        .with_max_tokens(engine.max_tokens);
    info!("Completion engine: {} at {}", cfg.engine.model, cfg.engine.base_url);
    Ok(client)
}

fn build_orchestrator(cfg: &CourierConfig) -> Result<Orchestrator> {
    let engine = completion_client(cfg)?;
    let schema_agent = A2aClient::new(
        &cfg.orchestrator.schema_agent_url,
        cfg.orchestrator.request_timeout(),
    )
    .context("Invalid schema_agent_url")?
    .with_token(cfg.orchestrator.auth_token.clone());
    info!("Schema agent at {}", cfg.orchestrator.schema_agent_url);

    Ok(Orchestrator::new(
        Arc::new(engine),
        Arc::new(schema_agent),
        cfg.orchestrator.routing(),
    ))
}

fn build_schema_agent(cfg: &CourierConfig) -> Result<SchemaAgent> {
    let engine: Arc<dyn CompletionClient> = match cfg.schema_agent.engine {
        SchemaEngine::Model => Arc::new(completion_client(cfg)?),
        SchemaEngine::Rules => {
            info!("Schema inference uses the rule-based engine");
            Arc::new(RuleInferencer::new())
        }
    };

    let mut loader = FsLoader::new();
    if let Some(dir) = &cfg.schema_agent.base_dir {
        let dir = shellexpand(dir);
        if !dir.is_dir() {
            warn!("Configured base_dir does not exist: {}", dir.display());
        }
        loader = loader.with_base_dir(dir);
    }

    Ok(SchemaAgent::new(
        engine,
        Arc::new(loader),
        cfg.schema_agent.inference(),
    ))
}

fn chat_client(cfg: &CourierConfig, endpoint: Option<String>) -> Result<A2aClient> {
    let endpoint = endpoint.unwrap_or_else(|| cfg.chat.endpoint.clone());
    let client = A2aClient::new(&endpoint, cfg.chat.timeout())
        .with_context(|| format!("Invalid chat endpoint: {}", endpoint))?
        .with_token(cfg.chat.auth_token.clone());
    Ok(client)
}

fn agent_card(name: &str, description: &str, host: &str, port: u16, token: &str) -> AgentCard {
    let card = AgentCard::new(name, description, format!("http://{}:{}", host, port));
    if token.is_empty() { card } else { card.with_bearer_auth() }
}

fn token(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

async fn serve_orchestrator(cfg: CourierConfig, cancel: CancellationToken) -> Result<()> {
    let orchestrator = build_orchestrator(&cfg)?;
    let oc = &cfg.orchestrator;
    let card = agent_card(
        "orchestrator",
        "Answers with the local model; forwards JSON file analysis to the schema agent",
        &oc.host,
        oc.port,
        &oc.auth_token,
    )
    .with_capability("chat")
    .with_capability("routing");

    let server = A2aServer::new(Arc::new(orchestrator), card, token(&oc.auth_token));
    server
        .serve(&oc.host, oc.port, async move { cancel.cancelled().await })
        .await
}

async fn serve_schema_agent(cfg: CourierConfig, cancel: CancellationToken) -> Result<()> {
    let agent = build_schema_agent(&cfg)?;
    let sc = &cfg.schema_agent;
    let card = agent_card(
        "schema-analyzer",
        "Infers JSON Schemas for the JSON files referenced in a message",
        &sc.host,
        sc.port,
        &sc.auth_token,
    )
    .with_capability("json_schema_inference");

    let server = A2aServer::new(Arc::new(agent), card, token(&sc.auth_token));
    server
        .serve(&sc.host, sc.port, async move { cancel.cancelled().await })
        .await
}

/// Wait for Ctrl+C or for any server to exit, then stop the rest
async fn wait_for_shutdown(
    cancel: CancellationToken,
    mut servers: JoinSet<Result<()>>,
) -> Result<()> {
    let mut outcome = Ok(());
    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Shutdown signal received");
        }
        Some(joined) = servers.join_next() => {
            outcome = joined.context("Server task panicked")?;
            if let Err(e) = &outcome {
                warn!("Server stopped: {:#}", e);
            }
        }
    }

    cancel.cancel();
    while let Some(joined) = servers.join_next().await {
        if let Err(e) = joined.context("Server task panicked")? {
            warn!("Server error during shutdown: {:#}", e);
        }
    }

    info!("Courier stopped");
    outcome
}

// Utility: expand a leading ~ in paths
fn shellexpand(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}
