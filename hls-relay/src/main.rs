use std::sync::Arc;

use hls_relay::api::{ApiServer, AppState};
use hls_relay::config::ServerConfig;
use hls_relay::logging;
use mimalloc::MiMalloc;
use relay_engine::{Relay, RelayConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let server_config = ServerConfig::from_env_or_default();

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(server_config.log_dir.as_deref())?;

    let relay_config = RelayConfig::from_env_or_default();
    tracing::info!(
        cache_root = %relay_config.cache_root.display(),
        cache_ttl_secs = relay_config.cache_ttl.as_secs(),
        proxy_prefix = %relay_config.proxy_prefix,
        "Relay configured"
    );

    let relay = Relay::with_http(relay_config)?;
    relay.cache().init().await?;

    let server = ApiServer::new(server_config, AppState::new(Arc::new(relay)));

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Received Ctrl+C, shutting down");
        cancel_token.cancel();
    });

    server.run().await?;

    tracing::info!("hls-relay stopped");
    Ok(())
}
