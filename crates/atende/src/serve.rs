// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atende serve` command implementation.
//!
//! Wires the full backend: SQLite storage, real-time hub, the WhatsApp
//! channel adapter with its session supervisor, the routing engine, and the
//! operator gateway. Supports graceful shutdown via signal handlers.

use std::sync::Arc;

use tracing::{info, warn};

use atende_config::model::AtendeConfig;
use atende_core::{Adapter, ChannelAdapter, StorageAdapter};
use atende_files::AttachmentStore;
use atende_gateway::{AuthState, GatewayState, ServerConfig};
use atende_hub::Hub;
use atende_routing::RoutingEngine;
use atende_storage::SqliteStore;
use atende_whatsapp::WhatsappChannel;

use crate::shutdown;

/// Runs the `atende serve` command.
pub async fn run_serve(config: AtendeConfig) -> Result<(), atende_core::AtendeError> {
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting atende serve");

    // Storage first; everything else hangs off it.
    let storage = Arc::new(SqliteStore::new(config.storage.clone()));
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = storage;

    let hub = Arc::new(Hub::new());

    // Channel adapter: connect spawns the session supervisor, which probes
    // the bridge and starts publishing connection_status events.
    let mut channel = WhatsappChannel::new(&config.whatsapp, Arc::clone(&hub))?;
    channel.connect().await?;
    let channel = Arc::new(channel);

    let engine = Arc::new(RoutingEngine::new(
        Arc::clone(&storage),
        Arc::clone(&hub),
        Arc::clone(&channel) as Arc<dyn ChannelAdapter>,
        config.routing.clone(),
    ));
    let default_department = engine.ensure_default_department().await?;
    info!(
        department_id = default_department.as_str(),
        name = config.routing.default_department.as_str(),
        "default department ready"
    );

    let files = Arc::new(AttachmentStore::new(&config.uploads));

    if config.auth.tokens.is_empty() {
        warn!("no operator tokens configured -- every operator request will be rejected");
    }

    let state = GatewayState {
        engine,
        hub,
        channel: Arc::clone(&channel),
        files,
        storage: Arc::clone(&storage),
        auth: AuthState {
            tokens: config.auth.tokens.clone(),
            bridge_token: config.auth.bridge_token.clone(),
        },
    };

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        // Multipart batches carry several files plus framing overhead.
        upload_body_limit: config.uploads.max_file_size_bytes as usize * 4,
    };

    let cancel = shutdown::install_signal_handler();

    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = atende_gateway::start_server(&server_config, state).await {
            tracing::error!(error = %e, "gateway server exited");
        }
    });

    tokio::select! {
        _ = cancel.cancelled() => {
            info!("shutdown requested");
            server_handle.abort();
        }
        _ = &mut server_handle => {
            warn!("gateway server stopped unexpectedly");
        }
    }

    // Drain the channel supervisor, then checkpoint storage.
    channel.shutdown().await?;
    storage.shutdown().await?;

    info!("atende serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("atende={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
