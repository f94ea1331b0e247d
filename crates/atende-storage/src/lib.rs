// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Atende support desk.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for contacts,
//! departments, agents, conversations, messages, and transfer records.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use adapter::SqliteStore;
pub use database::Database;
pub use models::*;
