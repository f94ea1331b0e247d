// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the operator gateway.
//!
//! Token issuance lives outside this system; the gateway only matches
//! `Authorization: Bearer <token>` against the configured token table and
//! resolves the owning agent id. With an empty table every operator request
//! is rejected (fail-closed). Internal bridge webhooks use a separate shared
//! secret header.

use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

/// Authentication state for the gateway.
#[derive(Clone)]
pub struct AuthState {
    /// Bearer token -> agent id.
    pub tokens: HashMap<String, String>,
    /// Shared secret for internal bridge webhooks. `None` disables the check.
    pub bridge_token: Option<String>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("tokens", &format!("[{} redacted]", self.tokens.len()))
            .field("bridge_token", &self.bridge_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// The authenticated operator, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    pub agent_id: String,
}

impl AuthState {
    /// Resolve a bearer token to an agent id.
    pub fn resolve_token(&self, token: &str) -> Option<AgentIdentity> {
        self.tokens.get(token).map(|agent_id| AgentIdentity {
            agent_id: agent_id.clone(),
        })
    }
}

/// Middleware validating operator bearer tokens.
///
/// On success the resolved [`AgentIdentity`] is attached to the request for
/// handlers to consume.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth.tokens.is_empty() {
        tracing::error!("gateway has no operator tokens configured -- rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.and_then(|t| auth.resolve_token(t)) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Middleware guarding the internal bridge webhooks with a shared secret.
///
/// When no secret is configured the check is skipped -- the bridge is then
/// expected to be reachable only from localhost.
pub async fn bridge_auth_middleware(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ref expected) = auth.bridge_token {
        let provided = request
            .headers()
            .get("x-bridge-token")
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }
    Ok(next.run(request).await)
}
