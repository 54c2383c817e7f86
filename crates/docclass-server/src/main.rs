//! docclass Server
//!
//! Loads the classification model once, then serves predictions over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use docclass_server::{cli::Cli, create_router, AppState, ServerConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting docclass server");

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Configuration loaded successfully");

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    // Load and verify the model before accepting connections
    let addr: SocketAddr = config.bind_address().parse()?;
    let state = AppState::from_config(config, metrics_handle)
        .context("model could not be loaded, refusing to start")?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    // Graceful shutdown handler
    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("docclass=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docclass=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "docclass_requests_total",
        "Total number of prediction requests"
    );
    metrics::describe_counter!(
        "docclass_predictions_total",
        "Successful predictions by label"
    );
    metrics::describe_counter!("docclass_errors_total", "Failed predictions by error kind");
    metrics::describe_histogram!(
        "docclass_predict_latency_us",
        metrics::Unit::Microseconds,
        "Prediction pipeline latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
