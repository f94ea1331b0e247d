// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state machine and reconnect supervisor.
//!
//! The bridge pushes status changes through the internal webhook; the
//! supervisor serializes them into state transitions and publishes every
//! transition to the hub. On session loss it probes the bridge with
//! exponential backoff instead of the source's tight reconnect loop, and
//! opens the circuit (`DisconnectedFailed`) after the configured number of
//! consecutive failed reattempts. A later bridge push closes the circuit
//! again.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use atende_core::ConnectionState;
use atende_hub::{Hub, HubEvent};

use crate::bridge::{BridgeClient, BridgeStatus};

/// Bounded exponential backoff policy for session reattempts.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay before reattempt number `attempt` (0-based): `base * 2^attempt`,
    /// capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(20);
        let millis = (self.base.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(millis).min(self.cap)
    }
}

/// Map a raw bridge state string onto the session state machine.
pub fn state_for_bridge(raw: &str) -> ConnectionState {
    match raw.to_ascii_lowercase().as_str() {
        "ready" | "connected" => ConnectionState::Ready,
        "qr" | "qr_pending" | "qr_code_generated" => ConnectionState::QrPending,
        "initializing" | "loading" | "opening" => ConnectionState::Initializing,
        _ => ConnectionState::Disconnected,
    }
}

pub(crate) struct Supervisor {
    pub bridge: BridgeClient,
    pub hub: Arc<Hub>,
    pub state_tx: watch::Sender<ConnectionState>,
    pub status_rx: mpsc::Receiver<BridgeStatus>,
    pub policy: ReconnectPolicy,
    pub last_qr: Arc<RwLock<Option<String>>>,
}

impl Supervisor {
    /// Run until cancelled or the status channel closes.
    pub async fn run(mut self, cancel: CancellationToken) {
        // Initial probe so a restart of this process picks up an already
        // paired bridge without waiting for a push.
        match self.bridge.fetch_status().await {
            Ok(status) => self.transition(&status),
            Err(e) => {
                warn!(error = %e, "initial bridge probe failed");
                self.set_state(ConnectionState::Disconnected, None);
            }
        }

        let mut attempt: u32 = 0;
        loop {
            let retrying = matches!(
                *self.state_tx.borrow(),
                ConnectionState::Disconnected | ConnectionState::DisconnectedRetrying
            );

            if retrying && attempt < self.policy.max_attempts {
                let delay = self.policy.backoff(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    status = self.status_rx.recv() => {
                        match status {
                            Some(status) => { attempt = 0; self.transition(&status); }
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(delay) => {
                        attempt += 1;
                        match self.bridge.fetch_status().await {
                            Ok(status) => {
                                attempt = 0;
                                self.transition(&status);
                            }
                            Err(e) => {
                                if attempt >= self.policy.max_attempts {
                                    warn!(
                                        attempts = attempt,
                                        error = %e,
                                        "reconnect attempts exhausted, opening circuit"
                                    );
                                    self.set_state(ConnectionState::DisconnectedFailed, None);
                                } else {
                                    warn!(
                                        attempt,
                                        delay_secs = delay.as_secs(),
                                        error = %e,
                                        "bridge reattempt failed"
                                    );
                                    self.set_state(ConnectionState::DisconnectedRetrying, None);
                                }
                            }
                        }
                    }
                }
            } else {
                // Ready, pairing, or circuit open: only bridge pushes move us.
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    status = self.status_rx.recv() => {
                        match status {
                            Some(status) => { attempt = 0; self.transition(&status); }
                            None => break,
                        }
                    }
                }
            }
        }
        info!("session supervisor stopped");
    }

    fn transition(&self, status: &BridgeStatus) {
        let next = state_for_bridge(&status.state);
        self.set_state(next, status.qr.as_deref());
    }

    fn set_state(&self, next: ConnectionState, qr: Option<&str>) {
        let previous = *self.state_tx.borrow();
        if previous != next {
            info!(%previous, state = %next, "channel session state changed");
            let _ = self.state_tx.send(next);
            self.hub
                .broadcast_global(&HubEvent::ConnectionStatus { state: next });
        }
        if next == ConnectionState::QrPending {
            if let Some(data) = qr {
                *self.last_qr.write().expect("qr lock poisoned") = Some(data.to_string());
                self.hub.broadcast_global(&HubEvent::QrCode {
                    data: data.to_string(),
                });
            }
        } else if next == ConnectionState::Ready {
            // Pairing finished; the code is no longer scannable.
            self.last_qr.write().expect("qr lock poisoned").take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReconnectPolicy {
            base: Duration::from_secs(2),
            cap: Duration::from_secs(30),
            max_attempts: 8,
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(16));
        assert_eq!(policy.backoff(4), Duration::from_secs(30));
        assert_eq!(policy.backoff(20), Duration::from_secs(30));
    }

    #[test]
    fn bridge_states_map_onto_the_machine() {
        assert_eq!(state_for_bridge("ready"), ConnectionState::Ready);
        assert_eq!(state_for_bridge("CONNECTED"), ConnectionState::Ready);
        assert_eq!(
            state_for_bridge("qr_code_generated"),
            ConnectionState::QrPending
        );
        assert_eq!(state_for_bridge("initializing"), ConnectionState::Initializing);
        assert_eq!(state_for_bridge("whatever"), ConnectionState::Disconnected);
    }
}
