// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by channel and storage implementations.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::types::HealthStatus;

/// The base trait for Atende adapters.
///
/// Every adapter (channel, storage) implements this trait, which provides
/// identity, lifecycle, and health check capabilities.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, AtendeError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), AtendeError>;
}
