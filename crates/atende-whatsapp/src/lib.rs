// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp channel adapter for the Atende support desk.
//!
//! Implements [`ChannelAdapter`] over the Node bridge that owns the actual
//! WhatsApp Web session. The adapter is an explicit service instance (one per
//! deployment, injected where needed): it tracks the session state machine,
//! publishes `connection_status`/`qr_code` events to the hub, and exposes
//! outbound text sends. Inbound messages reach the routing engine through the
//! gateway's internal webhook, not through this crate.

pub mod bridge;
pub mod session;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use atende_config::model::WhatsappConfig;
use atende_core::{Adapter, AtendeError, ChannelAdapter, ConnectionState, HealthStatus};
use atende_hub::Hub;

pub use bridge::{BridgeClient, BridgeStatus};
pub use session::{state_for_bridge, ReconnectPolicy};

use session::Supervisor;

/// The single WhatsApp channel session service.
pub struct WhatsappChannel {
    bridge: BridgeClient,
    hub: Arc<Hub>,
    policy: ReconnectPolicy,
    state_rx: watch::Receiver<ConnectionState>,
    state_tx: watch::Sender<ConnectionState>,
    status_tx: mpsc::Sender<BridgeStatus>,
    status_rx: Mutex<Option<mpsc::Receiver<BridgeStatus>>>,
    last_qr: Arc<RwLock<Option<String>>>,
    supervisor_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl WhatsappChannel {
    /// Create the adapter. The session supervisor does not start until
    /// [`ChannelAdapter::connect`] is called.
    pub fn new(config: &WhatsappConfig, hub: Arc<Hub>) -> Result<Self, AtendeError> {
        let bridge = BridgeClient::new(config)?;
        let (state_tx, state_rx) = watch::channel(ConnectionState::Initializing);
        let (status_tx, status_rx) = mpsc::channel(16);
        Ok(Self {
            bridge,
            hub,
            policy: ReconnectPolicy {
                base: Duration::from_secs(config.reconnect_base_secs),
                cap: Duration::from_secs(config.reconnect_max_secs),
                max_attempts: config.reconnect_max_attempts,
            },
            state_rx,
            state_tx,
            status_tx,
            status_rx: Mutex::new(Some(status_rx)),
            last_qr: Arc::new(RwLock::new(None)),
            supervisor_handle: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Feed a status pushed by the bridge into the state machine.
    ///
    /// Called from the gateway's `status_internal` webhook handler. Pushes
    /// reset the reconnect attempt counter, so a bridge that recovers on its
    /// own also closes an open circuit.
    pub async fn publish_status(&self, status: BridgeStatus) {
        debug!(state = status.state.as_str(), "bridge status pushed");
        if self.status_tx.send(status).await.is_err() {
            debug!("supervisor not running, status push dropped");
        }
    }

    /// The last QR payload seen while pairing, for operator resync.
    pub fn last_qr(&self) -> Option<String> {
        self.last_qr.read().expect("qr lock poisoned").clone()
    }
}

#[async_trait]
impl Adapter for WhatsappChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        Ok(match self.state() {
            ConnectionState::Ready => HealthStatus::Healthy,
            state @ (ConnectionState::Initializing
            | ConnectionState::QrPending
            | ConnectionState::DisconnectedRetrying) => {
                HealthStatus::Degraded(format!("session is {state}"))
            }
            state @ (ConnectionState::Disconnected | ConnectionState::DisconnectedFailed) => {
                HealthStatus::Unhealthy(format!("session is {state}"))
            }
        })
    }

    async fn shutdown(&self) -> Result<(), AtendeError> {
        self.cancel.cancel();
        let mut handle = self.supervisor_handle.lock().await;
        if let Some(h) = handle.take() {
            let _ = h.await;
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for WhatsappChannel {
    fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    async fn connect(&mut self) -> Result<(), AtendeError> {
        let mut status_rx = self.status_rx.lock().await;
        let Some(status_rx) = status_rx.take() else {
            return Ok(()); // Already connected
        };

        let supervisor = Supervisor {
            bridge: self.bridge.clone(),
            hub: Arc::clone(&self.hub),
            state_tx: self.state_tx.clone(),
            status_rx,
            policy: self.policy,
            last_qr: Arc::clone(&self.last_qr),
        };
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move { supervisor.run(cancel).await });

        let mut supervisor_handle = self.supervisor_handle.lock().await;
        *supervisor_handle = Some(handle);

        info!("whatsapp channel supervisor started");
        Ok(())
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<(), AtendeError> {
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(AtendeError::ChannelUnavailable {
                state: state.to_string(),
            });
        }
        self.bridge.send_message(to, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str) -> WhatsappConfig {
        WhatsappConfig {
            bridge_url: url.to_string(),
            send_timeout_secs: 2,
            reconnect_base_secs: 1,
            reconnect_max_secs: 2,
            reconnect_max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn starts_initializing_and_rejects_sends() {
        let hub = Arc::new(Hub::new());
        let channel = WhatsappChannel::new(&test_config("http://127.0.0.1:1"), hub).unwrap();

        assert_eq!(channel.state(), ConnectionState::Initializing);
        let err = channel.send_text("x@c.us", "hi").await.unwrap_err();
        assert!(matches!(err, AtendeError::ChannelUnavailable { .. }));
    }

    #[tokio::test]
    async fn pushed_ready_status_enables_sends_and_broadcasts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"state": "ready"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send-message"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": "ok"})),
            )
            .mount(&server)
            .await;

        let hub = Arc::new(Hub::new());
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        hub.register("operator", tx, None);

        let mut channel =
            WhatsappChannel::new(&test_config(&server.uri()), Arc::clone(&hub)).unwrap();
        channel.connect().await.unwrap();

        // Initial probe lands on ready.
        let mut state_rx = channel.state_rx.clone();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *state_rx.borrow() != ConnectionState::Ready {
                state_rx.changed().await.unwrap();
            }
        })
        .await
        .expect("session should become ready");

        channel.send_text("5511999999999@c.us", "Olá").await.unwrap();

        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("connection_status"));
        assert!(frame.contains("ready"));

        channel.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn qr_push_records_last_qr() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"state": "initializing"})),
            )
            .mount(&server)
            .await;

        let hub = Arc::new(Hub::new());
        let mut channel =
            WhatsappChannel::new(&test_config(&server.uri()), Arc::clone(&hub)).unwrap();
        channel.connect().await.unwrap();

        channel
            .publish_status(BridgeStatus {
                state: "qr_code_generated".to_string(),
                qr: Some("scan-me".to_string()),
            })
            .await;

        let mut state_rx = channel.state_rx.clone();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *state_rx.borrow() != ConnectionState::QrPending {
                state_rx.changed().await.unwrap();
            }
        })
        .await
        .expect("session should reach qr_pending");

        assert_eq!(channel.last_qr().as_deref(), Some("scan-me"));
        channel.shutdown().await.unwrap();
    }
}
