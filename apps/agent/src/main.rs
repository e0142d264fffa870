//! Remote agent binary.
//!
//! Run with: cargo run -p remote-agent -- --server-url http://controller:8080

mod cli;
mod identity;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use remote_agent_core::StreamStore;
use remote_agent_executor::host_capabilities;
use remote_agent_session::Session;
use remote_agent_transport::{WebSocketConnector, viewer::create_viewer_router};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let client_id = resolve_client_id(&cli)?;
    let config = cli.agent_config(client_id)?;
    tracing::info!(
        client_id = %config.client_id,
        server = %config.server_url,
        "Starting remote agent"
    );

    let connector = WebSocketConnector::from_config(&config)?;
    let session = Session::new(&config, host_capabilities(&config), Arc::new(connector))?;
    let handle = session.handle();

    let shutdown = CancellationToken::new();
    if let Some(addr) = cli.viewer_addr {
        tokio::spawn(serve_viewer(addr, handle.store(), shutdown.clone()));
    }

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            return;
        }
        tracing::info!("Shutdown requested");
        signal.cancel();
    });

    session.run(shutdown).await;
    let liveness = handle.liveness();
    tracing::info!(
        reachable = liveness.reachable,
        connected = liveness.connected,
        "Remote agent exited"
    );
    Ok(())
}

fn resolve_client_id(cli: &Cli) -> anyhow::Result<String> {
    if let Some(id) = cli.client_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    let Some(path) = cli.id_file.clone().or_else(identity::default_path) else {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::warn!(client_id = %id, "No data directory; client id will not persist");
        return Ok(id);
    };
    identity::load_or_create(&path)
}

async fn serve_viewer(addr: SocketAddr, store: Arc<StreamStore>, shutdown: CancellationToken) {
    if let Err(e) = run_viewer(addr, store, shutdown).await {
        tracing::error!(error = %e, "Stream viewer stopped");
    }
}

async fn run_viewer(
    addr: SocketAddr,
    store: Arc<StreamStore>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding viewer to {addr}"))?;
    tracing::info!("Stream viewer listening on http://{addr}");
    axum::serve(listener, create_viewer_router(store))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("viewer server")
}
