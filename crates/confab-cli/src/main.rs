//! The `confab` binary: loads configuration, initializes logging and serves
//! the gateway.

mod config;

use anyhow::bail;
use clap::{Parser, Subcommand};
use config::ConfabConfig;
use confab_agent::{AgentRegistry, EchoAgent, StreamDispatcher};
use confab_core::Identity;
use confab_gateway::{AppState, AuthConfig, GatewayServer};
use confab_security::TokenAuthority;
use confab_session::{SessionStore, SqliteSessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confab", about = "Confab: owner-scoped agent chat server")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "confab.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print a signed access token for local use
    Token {
        /// Identity the token is issued to
        #[arg(short, long)]
        subject: String,
    },
    /// List the sessions stored for an owner
    Sessions {
        /// Owner whose sessions are listed
        #[arg(short, long)]
        owner: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = ConfabConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve(&config, &host, port).await?;
        }
        Commands::Token { subject } => {
            let authority = TokenAuthority::new(&config.auth.secret_key);
            let ttl = chrono::Duration::minutes(config.auth.token_ttl_minutes);
            println!("{}", authority.issue(&subject, ttl)?);
        }
        Commands::Sessions { owner } => {
            let store = SqliteSessionStore::open(config.database_path()).await?;
            let sessions = store.list_sessions(&Identity::new(owner)).await?;
            if sessions.is_empty() {
                println!("No sessions.");
            }
            for session in &sessions {
                println!(
                    "{}\t{}\t{}\t{}",
                    session.id,
                    session.agent_name,
                    session.last_message_at.to_rfc3339(),
                    session.title
                );
            }
        }
    }

    Ok(())
}

async fn serve(config: &ConfabConfig, host: &str, port: u16) -> anyhow::Result<()> {
    info!("Starting Confab on {}:{}", host, port);

    let database = config.database_path();
    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::open(&database).await?);
    info!(database = %database.display(), "Session store opened");

    let mut registry = AgentRegistry::new(config.agents.default.clone());
    registry.register("echo", Arc::new(EchoAgent::default()));
    if !registry.contains(&config.agents.default) {
        bail!("default agent '{}' is not registered", config.agents.default);
    }

    let mut auth = AuthConfig::new(config.auth.cookie_name.clone());
    auth.secure_cookies = config.auth.secure_cookies;

    let state = Arc::new(AppState {
        store: store.clone(),
        dispatcher: Arc::new(StreamDispatcher::new(store, Arc::new(registry))),
        resolver: Arc::new(TokenAuthority::new(&config.auth.secret_key)),
        auth,
    });
    let app = GatewayServer::build(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Confab listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
