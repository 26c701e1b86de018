//! HTTP server loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use staticbust::{web, ServerConfig, StaticServer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Serve `config` on `listen` until ctrl-c or SIGTERM.
pub async fn run(config: ServerConfig, listen: SocketAddr) -> Result<()> {
    if !config.dir.is_dir() {
        warn!("Directory {} does not exist or is not a directory", config.dir.display());
    }

    info!("staticbust starting");
    info!("   Dir: {}", config.dir.display());
    if let Some(alt) = &config.alt_dir {
        info!("   Alt dir: {}", alt.display());
    }
    if !config.root.is_empty() {
        info!("   Root: {}", config.root);
    }
    info!("   Hashing: {}", config.hashing);

    let server = Arc::new(StaticServer::new(config));
    let app = web::router(server).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind to {}", listen))?;

    info!("Listening on http://{}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            warn!("Failed to install SIGTERM handler: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
