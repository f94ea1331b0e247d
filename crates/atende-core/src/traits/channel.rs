// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for the external chat network bridge.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::Adapter;
use crate::types::ConnectionState;

/// Adapter owning the single external channel session.
///
/// There is exactly one channel identity per deployment. The adapter drives
/// the session state machine and exposes outbound sends; inbound events
/// arrive through the gateway's internal webhook and are not part of this
/// trait.
#[async_trait]
pub trait ChannelAdapter: Adapter {
    /// Current session state.
    fn state(&self) -> ConnectionState;

    /// Starts the session supervisor (reconnect loop, status publication).
    async fn connect(&mut self) -> Result<(), AtendeError>;

    /// Sends a text message to a channel address.
    ///
    /// Fails with [`AtendeError::ChannelUnavailable`] unless the session is
    /// [`ConnectionState::Ready`], and with [`AtendeError::SendFailure`] when
    /// the channel rejects or times out the send. Persistence of the message
    /// is the caller's responsibility either way.
    async fn send_text(&self, to: &str, text: &str) -> Result<(), AtendeError>;
}
