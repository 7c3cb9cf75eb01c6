//! Alert Bridge - Main Entry Point
//!
//! HTTP service receiving TradingView alerts and placing the configured
//! orders on the user's exchange account.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use alert_bridge::config::{load_config, load_from_env};
use alert_bridge::storage::{
    postgres, InMemoryConfigStore, InMemoryCredentialVault, InMemoryHistoryStore,
    PgConfigStore, PgCredentialVault, PgHistoryStore,
};
use alert_bridge::{
    create_router, AlertPipeline, AppConfig, AppState, ConfigStore, CredentialCipher,
    CredentialVault, ExchangeGateway, HistoryStore, RestConnector,
};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides settings.log_level
    #[arg(long)]
    log_level: Option<String>,

    /// Socket address to listen on; overrides server.bind_addr
    #[arg(long)]
    bind: Option<String>,

    /// Read configuration from plain environment variables (DATABASE_URL, ...)
    #[arg(long)]
    from_env: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut config = if args.from_env {
        load_from_env()?
    } else {
        load_config(Some(&args.config))?
    };
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    // Initialize logging
    let log_level = args
        .log_level
        .unwrap_or_else(|| config.settings.log_level.clone());
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting TradingView Alert Bridge");
    if !args.from_env {
        info!("Configuration file: {}", args.config);
    }

    let state = build_state(&config).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wire stores, gateway and pipeline from configuration
async fn build_state(config: &AppConfig) -> Result<Arc<AppState>> {
    let cipher = match &config.vault.encryption_key {
        Some(key) => CredentialCipher::from_base64(key)?,
        None => {
            warn!("No vault.encryption_key configured; generated a key for this run only");
            CredentialCipher::generate()
        }
    };

    let (vault, configs, history): (
        Arc<dyn CredentialVault>,
        Arc<dyn ConfigStore>,
        Arc<dyn HistoryStore>,
    ) = match &config.database {
        Some(database) => {
            let pool = postgres::connect(database).await?;
            postgres::migrate(&pool).await?;
            info!("Using PostgreSQL stores");
            (
                Arc::new(PgCredentialVault::new(pool.clone(), cipher)),
                Arc::new(PgConfigStore::new(pool.clone())),
                Arc::new(PgHistoryStore::new(pool)),
            )
        }
        None => {
            warn!("No database configured; using in-memory stores");
            (
                Arc::new(InMemoryCredentialVault::new(cipher)),
                Arc::new(InMemoryConfigStore::new()),
                Arc::new(InMemoryHistoryStore::new()),
            )
        }
    };

    let connector = Arc::new(RestConnector::from_config(config));
    let gateway = Arc::new(ExchangeGateway::new(Arc::clone(&vault), connector));
    let pipeline = Arc::new(AlertPipeline::new(
        Arc::clone(&configs),
        gateway,
        Arc::clone(&history),
    ));

    Ok(Arc::new(AppState::new(
        pipeline,
        vault,
        configs,
        history,
        config.settings.default_user_id.clone(),
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Received shutdown signal, cleaning up...");
}
