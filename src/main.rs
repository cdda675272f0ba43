//! Faraway Game Server
//!
//! Authoritative session server for Faraway.
//! Configured from the environment; serves until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use faraway::{
    PROTOCOL_VERSION, VERSION,
    diagnostics::TracingSink,
    network::{GameServer, ServerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Faraway Server v{} (protocol {})", VERSION, PROTOCOL_VERSION);

    let config = ServerConfig::from_env().context("reading configuration")?;
    let catalog = config.load_catalog().context("loading card catalog")?;
    info!(
        "Catalog: {} regions, {} sanctuaries",
        catalog.region_count(),
        catalog.sanctuary_count()
    );
    info!(
        "Rooms: up to {} players, {:?} start grace",
        config.room.max_players, config.room.start_grace
    );

    let server = GameServer::new(config, Arc::new(catalog), Arc::new(TracingSink));

    tokio::select! {
        result = server.run() => {
            result.context("server stopped")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
            server.shutdown();
            // Let connections flush their shutdown notice.
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    Ok(())
}
