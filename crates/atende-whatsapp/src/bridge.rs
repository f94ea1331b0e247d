// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Node bridge process that owns the actual WhatsApp
//! Web session.
//!
//! Contract:
//! - `POST {base}/send-message {to, text}` -> `{success}` | `{error}`
//! - `GET  {base}/status` -> `{state, qr?}` (the bridge answers with its
//!   current `client.getState()` plus the last QR payload while pairing)

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use atende_config::model::WhatsappConfig;
use atende_core::AtendeError;

/// Status payload as the bridge reports it, both on `GET /status` and on the
/// pushed `POST /api/whatsapp/status_internal` webhook.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BridgeStatus {
    /// Raw bridge state string, e.g. `ready`, `qr_code_generated`,
    /// `disconnected`.
    pub state: String,
    /// Opaque scan-code payload, present while pairing.
    #[serde(default)]
    pub qr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    success: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Thin reqwest wrapper around the bridge endpoints.
#[derive(Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(config: &WhatsappConfig) -> Result<Self, AtendeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(|e| AtendeError::Internal(format!("bridge client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.bridge_url.trim_end_matches('/').to_string(),
        })
    }

    /// Deliver one text message to a channel address.
    ///
    /// Timeouts and transport failures are retryable [`AtendeError::SendFailure`]s;
    /// the caller decides what to do with the already persisted message.
    pub async fn send_message(&self, to: &str, text: &str) -> Result<(), AtendeError> {
        let url = format!("{}/send-message", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "to": to, "text": text }))
            .send()
            .await
            .map_err(|e| AtendeError::SendFailure {
                message: if e.is_timeout() {
                    "bridge send timed out".to_string()
                } else {
                    format!("bridge unreachable: {e}")
                },
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body: SendResponse = response.json().await.unwrap_or(SendResponse {
            success: None,
            error: None,
        });

        if !status.is_success() || body.error.is_some() {
            return Err(AtendeError::SendFailure {
                message: body
                    .error
                    .unwrap_or_else(|| format!("bridge returned HTTP {status}")),
                source: None,
            });
        }

        debug!(to, response = body.success.as_deref().unwrap_or(""), "bridge send ok");
        Ok(())
    }

    /// Ask the bridge for its current session state.
    pub async fn fetch_status(&self) -> Result<BridgeStatus, AtendeError> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AtendeError::SendFailure {
                message: format!("bridge status probe failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(AtendeError::SendFailure {
                message: format!("bridge status probe returned HTTP {}", response.status()),
                source: None,
            });
        }

        response
            .json::<BridgeStatus>()
            .await
            .map_err(|e| AtendeError::SendFailure {
                message: format!("bridge status payload invalid: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> WhatsappConfig {
        WhatsappConfig {
            bridge_url: server.uri(),
            send_timeout_secs: 2,
            ..WhatsappConfig::default()
        }
    }

    #[tokio::test]
    async fn send_message_posts_expected_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-message"))
            .and(body_json(serde_json::json!({
                "to": "5511999999999@c.us",
                "text": "Olá!"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"success": "Mensagem enviada!"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = BridgeClient::new(&config_for(&server)).unwrap();
        client
            .send_message("5511999999999@c.us", "Olá!")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_message_maps_bridge_error_to_send_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send-message"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "Falha ao enviar mensagem"})),
            )
            .mount(&server)
            .await;

        let client = BridgeClient::new(&config_for(&server)).unwrap();
        let err = client.send_message("x@c.us", "hi").await.unwrap_err();
        assert!(matches!(err, AtendeError::SendFailure { .. }));
        assert!(err.to_string().contains("Falha ao enviar mensagem"));
    }

    #[tokio::test]
    async fn send_message_to_unreachable_bridge_is_send_failure() {
        let config = WhatsappConfig {
            bridge_url: "http://127.0.0.1:1".to_string(),
            send_timeout_secs: 1,
            ..WhatsappConfig::default()
        };
        let client = BridgeClient::new(&config).unwrap();
        let err = client.send_message("x@c.us", "hi").await.unwrap_err();
        assert!(matches!(err, AtendeError::SendFailure { .. }));
    }

    #[tokio::test]
    async fn fetch_status_parses_state_and_qr() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"state": "qr_code_generated", "qr": "opaque-payload"}),
            ))
            .mount(&server)
            .await;

        let client = BridgeClient::new(&config_for(&server)).unwrap();
        let status = client.fetch_status().await.unwrap();
        assert_eq!(status.state, "qr_code_generated");
        assert_eq!(status.qr.as_deref(), Some("opaque-payload"));
    }
}
