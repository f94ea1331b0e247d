// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atende support desk backend.

use thiserror::Error;

/// The primary error type used across all Atende crates.
#[derive(Debug, Error)]
pub enum AtendeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The channel session is not ready to accept sends.
    #[error("channel unavailable: session is {state}")]
    ChannelUnavailable { state: String },

    /// The channel rejected or timed out an outbound send. Retryable.
    #[error("channel send failed: {message}")]
    SendFailure {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A transfer or claim named an invalid target department/agent.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A request was malformed or violated a domain rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// Optimistic-version mismatch on a concurrent conversation mutation.
    #[error("conflict: conversation {conversation_id} was modified concurrently")]
    Conflict { conversation_id: String },

    /// The operation is not valid for the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A batch-level upload failure (per-file failures are reported in the
    /// batch result instead).
    #[error("upload error: {0}")]
    Upload(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AtendeError {
    /// Shorthand for a [`AtendeError::NotFound`] with an owned id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
