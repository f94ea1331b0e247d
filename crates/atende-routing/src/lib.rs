// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation routing for the Atende support desk.
//!
//! The engine sits between the channel adapter, the store, and the hub:
//! inbound channel messages become conversations and customer messages,
//! operator actions become agent/system messages, transfers, claims, and
//! closes. Every successful mutation is broadcast to the affected rooms.

pub mod engine;

pub use engine::RoutingEngine;
