use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trmote_core::{
    load_config, validate_config, SnapshotSink, SyncOrchestrator, SyncRunner, TorrentSession,
    TransmissionSession,
};
use trmote_server::api::create_router;
use trmote_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TRMOTE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Transmission RPC: {}", config.session.url);
    info!(
        "Auto reload: {} (every {} ms), page size {}",
        config.sync.auto_reload, config.sync.reload_interval_ms, config.sync.page_size
    );

    let session: Arc<dyn TorrentSession> = Arc::new(
        TransmissionSession::new(config.session.clone())
            .context("Failed to create Transmission session")?,
    );

    // Sync layer: one runner task owns all view state, readers get snapshots
    let (sink, view_rx) = SnapshotSink::new();
    let orchestrator = SyncOrchestrator::new(&config.sync, Box::new(sink));
    let (runner, sync_handle) = SyncRunner::new(&config.sync, session, orchestrator);
    let runner_task = tokio::spawn(runner.run());
    info!("Sync runner started");

    let state = Arc::new(AppState::new(config.clone(), sync_handle.clone(), view_rx));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    sync_handle.shutdown();
    match runner_task.await {
        Ok(stats) => info!(
            "Sync runner stopped ({} fetches, {} failures, {} ticks dropped)",
            stats.fetches_started, stats.failures, stats.ticks_dropped
        ),
        Err(e) => error!("Sync runner task failed: {}", e),
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
