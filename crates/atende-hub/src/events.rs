// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed event schema for the real-time hub.
//!
//! Every server -> client frame is one [`HubEvent`] serialized as
//! `{"event": "<name>", "data": {...}}`. Event names are part of the wire
//! contract with operator clients and never change meaning silently.

use serde::{Deserialize, Serialize};

use atende_core::{ConnectionState, Message};

/// A broadcastable hub event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum HubEvent {
    /// A message was appended to a conversation.
    NewMessage {
        conversation_id: String,
        message: Message,
    },

    /// A conversation changed department (and possibly agent).
    ConversationTransferred {
        conversation_id: String,
        from_department_id: String,
        to_department_id: String,
    },

    /// A conversation was explicitly closed by an agent.
    ConversationClosed { conversation_id: String },

    /// Ephemeral presence: someone is typing in a conversation. Not
    /// persisted; relayed verbatim.
    UserTyping {
        conversation_id: String,
        user_name: String,
    },

    /// Ephemeral presence: typing stopped.
    UserStopTyping {
        conversation_id: String,
        user_name: String,
    },

    /// The external channel session changed state.
    ConnectionStatus { state: ConnectionState },

    /// Opaque scan-code payload emitted while the session is QR-pending.
    QrCode { data: String },
}

/// A logical broadcast group.
///
/// Rooms are addressed by string key so the registry can store memberships
/// flatly: `conversation:{id}`, `department:{id}`, or the implicit `global`
/// room every connected client belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room(String);

impl Room {
    /// The room for one conversation's thread view.
    pub fn conversation(id: &str) -> Self {
        Room(format!("conversation:{id}"))
    }

    /// The room every agent of one department sits in.
    pub fn department(id: &str) -> Self {
        Room(format!("department:{id}"))
    }

    /// The room all connected clients belong to.
    pub fn global() -> Self {
        Room("global".to_string())
    }

    /// The registry key.
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::{MessageBody, SenderType};

    #[test]
    fn event_names_match_wire_contract() {
        let event = HubEvent::UserTyping {
            conversation_id: "cv-1".to_string(),
            user_name: "Maria".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "user_typing");
        assert_eq!(json["data"]["conversation_id"], "cv-1");

        let event = HubEvent::ConnectionStatus {
            state: ConnectionState::QrPending,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "connection_status");
        assert_eq!(json["data"]["state"], "qr_pending");
    }

    #[test]
    fn new_message_embeds_full_message() {
        let event = HubEvent::NewMessage {
            conversation_id: "cv-1".to_string(),
            message: Message {
                id: "m-1".to_string(),
                conversation_id: "cv-1".to_string(),
                sender_type: SenderType::Customer,
                sender_id: None,
                body: MessageBody::Text {
                    content: "oi".to_string(),
                },
                timestamp: "2026-01-01T00:00:00.000Z".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "new_message");
        assert_eq!(json["data"]["message"]["content"], "oi");
        assert_eq!(json["data"]["message"]["message_type"], "text");
    }

    #[test]
    fn room_keys_are_scoped() {
        assert_eq!(Room::conversation("c1").key(), "conversation:c1");
        assert_eq!(Room::department("d1").key(), "department:d1");
        assert_eq!(Room::global().key(), "global");
        assert_ne!(Room::conversation("x"), Room::department("x"));
    }
}
