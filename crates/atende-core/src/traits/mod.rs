// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits that define the seams between Atende components.

pub mod adapter;
pub mod channel;
pub mod storage;

pub use adapter::Adapter;
pub use channel::ChannelAdapter;
pub use storage::StorageAdapter;
