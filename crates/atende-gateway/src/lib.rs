// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket operator gateway for the Atende support desk.
//!
//! Exposes the operator REST API, the internal bridge webhooks, and the
//! real-time WebSocket endpoint over shared [`server::GatewayState`].

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::AuthState;
pub use server::{build_router, start_server, GatewayState, ServerConfig};
