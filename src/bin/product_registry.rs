//! product-registry: HTTP server for the product provenance registry
//!
//! Restores every recorded history from the configured store, then serves
//! the registry API until Ctrl+C or SIGTERM.
//!
//! ## Configuration
//! - `--config <path>` or REGISTRY_CONFIG: YAML config file (default: config.yaml)
//! - REGISTRY__SERVER__PORT, REGISTRY__STORAGE__TYPE, ...: per-field overrides
//! - REGISTRY_LOG: tracing filter (default: info)

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use product_registry::api::{create_router, AppState};
use product_registry::bus::ChannelNotificationBus;
use product_registry::clock::SystemClock;
use product_registry::config::Config;
use product_registry::registry::Registry;
use product_registry::storage::init_storage;
use product_registry::utils::bootstrap::{init_tracing, parse_config_path, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting product-registry");

    let config_path = parse_config_path();
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let store = init_storage(&config.storage).await.map_err(|e| {
        error!("Failed to initialize storage: {}", e);
        e
    })?;
    let bus = Arc::new(ChannelNotificationBus::new(
        config.notifications.channel_capacity,
    ));

    let registry = Registry::open(store, Arc::new(SystemClock), bus)
        .await
        .map_err(|e| {
            error!("Failed to restore registry: {}", e);
            e
        })?;
    info!(
        items = registry.count().await,
        storage = ?config.storage.storage_type,
        "Registry restored"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = Arc::new(AppState::new(Arc::new(registry), shutdown_rx));
    let app = create_router(state, config.server.body_limit_bytes);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %listener.local_addr()?, "product-registry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Long-lived notification streams would otherwise hold the server open
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("product-registry stopped");
    Ok(())
}
