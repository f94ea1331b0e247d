// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.
//!
//! Every function takes `&Database` and runs its statements on the single
//! writer thread via `connection().call()`.

pub mod agents;
pub mod contacts;
pub mod conversations;
pub mod departments;
pub mod messages;
pub mod transfers;
