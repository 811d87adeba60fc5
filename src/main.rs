use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use clevermoney_api::app::{router, AppState};
use clevermoney_api::config::{self, StorageBackend};

#[derive(Parser)]
#[command(name = "clevermoney-api")]
#[command(about = "CleverMoney REST API server")]
#[command(version)]
struct Args {
    #[arg(long, env = "PORT", help = "Port to listen on (overrides configuration)")]
    port: Option<u16>,

    #[arg(long, value_parser = ["postgres", "memory"], help = "Storage backend (overrides STORAGE_BACKEND)")]
    storage: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = config::config().clone();
    if let Some(port) = args.port {
        config.server.port = port;
    }
    match args.storage.as_deref() {
        Some("memory") => config.database.backend = StorageBackend::Memory,
        Some("postgres") => config.database.backend = StorageBackend::Postgres,
        _ => {}
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Starting CleverMoney API in {:?} mode", config.environment);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let state = AppState::from_config(config).await?;
    let app = router(state.clone());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    state.close().await;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
