// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain entities shared across the Atende crates.
//!
//! These are the canonical shapes for everything that crosses a crate
//! boundary: persisted rows, API payloads, and hub events all reuse them.
//! Timestamps are ISO-8601 UTC strings, matching what SQLite stores.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Current UTC timestamp in the ISO-8601 millisecond format used everywhere
/// a timestamp is persisted or compared (`2026-01-01T00:00:00.000Z`).
///
/// Matches SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`, so ordering is
/// lexicographic across both sources.
pub fn now_iso8601() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Role of a human operator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Admin,
    Manager,
    Agent,
}

impl AgentRole {
    /// Admins and managers see every department's conversations.
    pub fn sees_all_departments(self) -> bool {
        matches!(self, AgentRole::Admin | AgentRole::Manager)
    }
}

/// Lifecycle status of a conversation.
///
/// `Pending` means the conversation sits unassigned in its department after
/// an agent-less transfer, waiting for the first agent to claim it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Pending,
    Closed,
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Agent,
    System,
}

/// Connection lifecycle of the single external channel session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Initializing,
    QrPending,
    Ready,
    Disconnected,
    DisconnectedRetrying,
    DisconnectedFailed,
}

/// Message payload, tagged by kind.
///
/// Non-text kinds reference bytes persisted by the attachment pipeline via
/// `file_path`; the path uniquely identifies the stored content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum MessageBody {
    Text {
        content: String,
    },
    Image {
        file_path: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Document {
        file_path: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        file_path: String,
        #[serde(default)]
        caption: Option<String>,
    },
}

impl MessageBody {
    /// The discriminant as stored in the `message_type` column.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Text { .. } => "text",
            MessageBody::Image { .. } => "image",
            MessageBody::Document { .. } => "document",
            MessageBody::Audio { .. } => "audio",
        }
    }

    /// Text content or caption, whichever this kind carries.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageBody::Text { content } => Some(content),
            MessageBody::Image { caption, .. }
            | MessageBody::Document { caption, .. }
            | MessageBody::Audio { caption, .. } => caption.as_deref(),
        }
    }

    /// Attachment path for non-text kinds.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            MessageBody::Text { .. } => None,
            MessageBody::Image { file_path, .. }
            | MessageBody::Document { file_path, .. }
            | MessageBody::Audio { file_path, .. } => Some(file_path),
        }
    }
}

/// An external party, unique by channel address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    /// Channel address, e.g. `5511999999999@c.us`.
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub created_at: String,
}

/// A routing bucket grouping agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: String,
}

/// A human operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    pub department_id: Option<String>,
    pub active: bool,
    pub created_at: String,
}

/// An ordered thread between one contact and the organization, owned by one
/// department at a time. `version` backs compare-and-swap mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub contact_id: String,
    pub department_id: String,
    pub assigned_agent_id: Option<String>,
    pub status: ConversationStatus,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A single append-only message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: SenderType,
    pub sender_id: Option<String>,
    #[serde(flatten)]
    pub body: MessageBody,
    pub timestamp: String,
}

/// Audit record of one conversation reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: String,
    pub conversation_id: String,
    pub from_department_id: String,
    pub to_department_id: String,
    pub to_agent_id: Option<String>,
    pub reason: String,
    pub actor_id: String,
    pub timestamp: String,
}

/// Partial update applied to a conversation's ownership tuple under CAS.
///
/// `assigned_agent_id` uses a double Option: `None` leaves the column alone,
/// `Some(None)` clears the assignment.
#[derive(Debug, Clone, Default)]
pub struct ConversationUpdate {
    pub department_id: Option<String>,
    pub assigned_agent_id: Option<Option<String>>,
    pub status: Option<ConversationStatus>,
}

/// Descriptor for one successfully stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub original_name: String,
    /// Relative path under the uploads root, e.g. `image/3f2a….png`.
    pub file_path: String,
    /// Kind bucket: `image`, `document`, or `audio`.
    pub file_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_body_text_roundtrips_with_tag() {
        let body = MessageBody::Text {
            content: "hello".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""message_type":"text""#));
        let back: MessageBody = serde_json::from_str(&json).unwrap();
        assert_eq!(back, body);
    }

    #[test]
    fn message_body_image_exposes_file_path() {
        let body = MessageBody::Image {
            file_path: "image/abc.png".to_string(),
            caption: None,
        };
        assert_eq!(body.kind(), "image");
        assert_eq!(body.file_path(), Some("image/abc.png"));
        assert_eq!(body.text(), None);
    }

    #[test]
    fn message_serializes_flat() {
        let msg = Message {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_type: SenderType::Customer,
            sender_id: None,
            body: MessageBody::Text {
                content: "oi".to_string(),
            },
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["message_type"], "text");
        assert_eq!(json["content"], "oi");
        assert_eq!(json["sender_type"], "customer");
    }

    #[test]
    fn roles_parse_from_snake_case() {
        use std::str::FromStr;
        assert_eq!(AgentRole::from_str("manager").unwrap(), AgentRole::Manager);
        assert!(AgentRole::from_str("manager").unwrap().sees_all_departments());
        assert!(!AgentRole::Agent.sees_all_departments());
    }

    #[test]
    fn connection_state_display_is_snake_case() {
        assert_eq!(
            ConnectionState::DisconnectedRetrying.to_string(),
            "disconnected_retrying"
        );
        assert_eq!(ConnectionState::QrPending.to_string(), "qr_pending");
    }
}
