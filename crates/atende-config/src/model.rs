// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Atende support desk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level Atende configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtendeConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Operator and bridge authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// WhatsApp bridge session settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Attachment upload policy.
    #[serde(default)]
    pub uploads: UploadConfig,

    /// Conversation routing settings.
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "atende".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    10000
}

/// Authentication configuration.
///
/// Token issuance lives outside this system; the gateway only verifies
/// bearer tokens against this table. An empty table means every operator
/// request is rejected (fail-closed).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Map of bearer token -> agent id for operator API access.
    #[serde(default)]
    pub tokens: HashMap<String, String>,

    /// Shared secret required on internal bridge webhooks. `None` disables
    /// the check (bridge reachable only on localhost).
    #[serde(default)]
    pub bridge_token: Option<String>,
}

/// WhatsApp bridge session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Base URL of the Node bridge process.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Bounded timeout for one outbound send, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Initial reconnect backoff delay, in seconds.
    #[serde(default = "default_reconnect_base_secs")]
    pub reconnect_base_secs: u64,

    /// Backoff cap, in seconds.
    #[serde(default = "default_reconnect_max_secs")]
    pub reconnect_max_secs: u64,

    /// Consecutive failed reattempts before the circuit opens.
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            send_timeout_secs: default_send_timeout_secs(),
            reconnect_base_secs: default_reconnect_base_secs(),
            reconnect_max_secs: default_reconnect_max_secs(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
        }
    }
}

fn default_bridge_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_send_timeout_secs() -> u64 {
    15
}

fn default_reconnect_base_secs() -> u64 {
    2
}

fn default_reconnect_max_secs() -> u64 {
    300
}

fn default_reconnect_max_attempts() -> u32 {
    8
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("atende").join("atende.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("atende.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Attachment upload policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UploadConfig {
    /// Directory where uploaded files are stored.
    #[serde(default = "default_uploads_dir")]
    pub dir: String,

    /// Maximum size of one uploaded file, in bytes.
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,

    /// Allowed extensions treated as images.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Allowed extensions treated as documents.
    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,

    /// Allowed extensions treated as audio.
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_uploads_dir(),
            max_file_size_bytes: default_max_file_size_bytes(),
            image_extensions: default_image_extensions(),
            document_extensions: default_document_extensions(),
            audio_extensions: default_audio_extensions(),
        }
    }
}

fn default_uploads_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("atende").join("uploads"))
        .unwrap_or_else(|| std::path::PathBuf::from("uploads"))
        .to_string_lossy()
        .into_owned()
}

fn default_max_file_size_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_document_extensions() -> Vec<String> {
    ["pdf", "doc", "docx", "txt", "xls", "xlsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_audio_extensions() -> Vec<String> {
    ["mp3", "wav", "ogg", "m4a"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Conversation routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Name of the department that receives first-contact conversations.
    #[serde(default = "default_department_name")]
    pub default_department: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_department: default_department_name(),
        }
    }
}

fn default_department_name() -> String {
    "Atendimento".to_string()
}
