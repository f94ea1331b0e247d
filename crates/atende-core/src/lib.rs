// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core trait definitions, error types, and domain entities for Atende.
//!
//! Atende routes customer messages arriving from a single external chat
//! channel to a pool of human agents organized into departments. This crate
//! holds the shapes everything else agrees on: the error taxonomy, the
//! persisted entities, and the adapter traits implemented by the channel
//! bridge and the SQLite store.

pub mod error;
pub mod traits;
pub mod types;

pub use error::AtendeError;
pub use traits::{Adapter, ChannelAdapter, StorageAdapter};
pub use types::{
    now_iso8601, Agent, AgentRole, ConnectionState, Contact, Conversation, ConversationStatus,
    ConversationUpdate, Department, FileDescriptor, HealthStatus, Message, MessageBody,
    SenderType, TransferRecord,
};
