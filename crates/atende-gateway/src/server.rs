// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Three route groups:
//! public (health), internal (bridge webhooks, shared-secret guarded), and
//! the authed operator API plus the WebSocket endpoint (token via query
//! during the handshake, not via middleware).

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use atende_core::{AtendeError, StorageAdapter};
use atende_files::AttachmentStore;
use atende_hub::Hub;
use atende_routing::RoutingEngine;
use atende_whatsapp::WhatsappChannel;

use crate::auth::{auth_middleware, bridge_auth_middleware, AuthState};
use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<RoutingEngine>,
    pub hub: Arc<Hub>,
    pub channel: Arc<WhatsappChannel>,
    pub files: Arc<AttachmentStore>,
    pub storage: Arc<dyn StorageAdapter>,
    pub auth: AuthState,
}

/// Gateway server configuration (mirrors ServerConfig from atende-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Body limit for the multipart upload endpoint, in bytes.
    pub upload_body_limit: usize,
}

/// Build the gateway router over the given state.
pub fn build_router(config: &ServerConfig, state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    // Unauthenticated public routes.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    // Internal bridge webhooks, guarded by the shared secret.
    let internal_routes = Router::new()
        .route(
            "/api/whatsapp/webhook_internal",
            post(handlers::post_webhook_internal),
        )
        .route(
            "/api/whatsapp/status_internal",
            post(handlers::post_status_internal),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state.clone(),
            bridge_auth_middleware,
        ))
        .with_state(state.clone());

    // Operator API, bearer-token guarded.
    let api_routes = Router::new()
        .route("/api/conversations", get(handlers::get_conversations))
        .route("/api/conversations/{id}", get(handlers::get_conversation))
        .route(
            "/api/conversations/{id}/messages",
            post(handlers::post_message),
        )
        .route(
            "/api/conversations/{id}/transfer",
            post(handlers::post_transfer),
        )
        .route("/api/conversations/{id}/claim", post(handlers::post_claim))
        .route("/api/conversations/{id}/close", post(handlers::post_close))
        .route(
            "/api/conversations/{id}/transfers",
            get(handlers::get_transfers),
        )
        .route("/api/departments", get(handlers::get_departments))
        .route(
            "/api/upload_multiple",
            post(handlers::post_upload_multiple)
                .layer(DefaultBodyLimit::max(config.upload_body_limit)),
        )
        .route("/api/files/{*path}", get(handlers::get_file))
        .route("/api/whatsapp/status", get(handlers::get_whatsapp_status))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    // WebSocket route (auth happens during handshake, not via middleware).
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(internal_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP/WebSocket server and serve until the task is
/// dropped or the listener fails.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), AtendeError> {
    let app = build_router(config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AtendeError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| AtendeError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
