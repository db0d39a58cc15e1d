//! Tic-tac-toe rooms - Unified CLI
//!
//! Runs the two-player session server.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use tictactoe_rooms::{AppState, ServerConfig, router};
use tracing::{debug, info, instrument};
use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Subscriber first so config loading is logged; RUST_LOG wins over the
    // configured filter.
    let from_env = EnvFilter::try_from_default_env().ok();
    let configurable = from_env.is_none();
    let (filter, handle) =
        reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Serve { port, host, config } => {
            let config = load_config(config)?.with_host(host).with_port(port);
            if configurable {
                apply_log_filter(&handle, config.log_filter())?;
            }
            run_server(config).await
        }
        Command::Config { config } => {
            let config = load_config(config)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Defaults, then the optional file, then environment overrides.
#[instrument(skip_all, fields(path = ?path))]
fn load_config(path: Option<PathBuf>) -> Result<ServerConfig> {
    let config = match path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    let config = config.with_env_overrides()?;
    debug!(address = %config.bind_address(), "Configuration loaded");
    Ok(config)
}

fn apply_log_filter(handle: &FilterHandle, directives: &str) -> Result<()> {
    handle.reload(EnvFilter::try_new(directives)?)?;
    debug!(filter = directives, "Log filter applied");
    Ok(())
}

/// Run the session server until the listener fails.
#[instrument(skip_all, fields(address = %config.bind_address()))]
async fn run_server(config: ServerConfig) -> Result<()> {
    let app = router(AppState::new());

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let local = listener.local_addr()?;

    info!("Tic-tac-toe session server started");
    info!("Local access: http://localhost:{}", local.port());
    info!("Bound to: http://{}", local);
    info!("WebSocket endpoint: ws://localhost:{}/ws", local.port());

    axum::serve(listener, app).await?;

    Ok(())
}
