//! retain-server - REST API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use retain_core::RetainConfig;
use retain_server::{create_server, AppState};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    let json_logs = std::env::var("RETAIN_LOG_FORMAT").is_ok_and(|f| f == "json");
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("retain_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    // Get configuration from environment
    let host = std::env::var("RETAIN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("RETAIN_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("RETAIN_PORT must be a valid port number")?;

    let config = match std::env::var("RETAIN_CONFIG") {
        Ok(path) => RetainConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => RetainConfig::from_env()?,
    };

    let state = AppState::from_config(&config)?;
    if !state.classifier_configured {
        info!(
            service = %state.classifier_service,
            "Classifier not configured; reviews will be recorded as FORGOT"
        );
    }

    let app = create_server(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting retain-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped cleanly");
    Ok(())
}
