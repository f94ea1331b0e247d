// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint speaking the hub protocol.
//!
//! Client -> Server (JSON):
//! ```json
//! {"event": "join_conversation", "data": {"conversation_id": "…"}}
//! {"event": "typing", "data": {"conversation_id": "…", "user_name": "Maria"}}
//! {"event": "stop_typing", "data": {"conversation_id": "…", "user_name": "Maria"}}
//! ```
//!
//! Server -> Client frames are serialized [`HubEvent`]s. An authenticated
//! connection is implicitly subscribed to its agent's department room;
//! conversation rooms are joined explicitly and idempotently.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use atende_core::Agent;
use atende_hub::{HubEvent, Room, OUTBOX_CAPACITY};

use crate::server::GatewayState;

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// Frames a client may send.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ClientFrame {
    JoinConversation {
        conversation_id: String,
    },
    LeaveConversation {
        conversation_id: String,
    },
    Typing {
        conversation_id: String,
        user_name: String,
    },
    StopTyping {
        conversation_id: String,
        user_name: String,
    },
}

/// WebSocket upgrade handler. Auth happens here, during the handshake.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<GatewayState>,
) -> Response {
    let Some(identity) = state.auth.resolve_token(&query.token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let agent = match state.storage.get_agent(&identity.agent_id).await {
        Ok(Some(agent)) if agent.active => agent,
        Ok(_) => return StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => {
            warn!(error = %e, "agent lookup failed during ws handshake");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, agent))
}

/// Handle an individual operator connection.
///
/// Spawns a sender task draining the hub outbox into the socket while this
/// task reads and dispatches client frames.
async fn handle_socket(socket: WebSocket, state: GatewayState, agent: Agent) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let client_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    state
        .hub
        .register(&client_id, tx, agent.department_id.as_deref());
    debug!(
        client_id = client_id.as_str(),
        agent = agent.id.as_str(),
        "operator socket connected"
    );

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let text_str: &str = &text;
                let frame: ClientFrame = match serde_json::from_str(text_str) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "invalid ws frame, skipping");
                        continue;
                    }
                };
                dispatch(&state, &client_id, frame);
            }
            Message::Close(_) => break,
            _ => {} // Binary and ping/pong are handled by the ws layer.
        }
    }

    state.hub.unregister(&client_id);
    sender_task.abort();
    debug!(client_id = client_id.as_str(), "operator socket disconnected");
}

fn dispatch(state: &GatewayState, client_id: &str, frame: ClientFrame) {
    match frame {
        ClientFrame::JoinConversation { conversation_id } => {
            state
                .hub
                .join(client_id, &Room::conversation(&conversation_id));
        }
        ClientFrame::LeaveConversation { conversation_id } => {
            state
                .hub
                .leave(client_id, &Room::conversation(&conversation_id));
        }
        // Presence is relayed verbatim and scoped to the conversation room;
        // expiry is the emitting client's responsibility.
        ClientFrame::Typing {
            conversation_id,
            user_name,
        } => {
            state.hub.broadcast(
                &[Room::conversation(&conversation_id)],
                &HubEvent::UserTyping {
                    conversation_id,
                    user_name,
                },
            );
        }
        ClientFrame::StopTyping {
            conversation_id,
            user_name,
        } => {
            state.hub.broadcast(
                &[Room::conversation(&conversation_id)],
                &HubEvent::UserStopTyping {
                    conversation_id,
                    user_name,
                },
            );
        }
    }
}
