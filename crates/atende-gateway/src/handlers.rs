// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the operator REST API and the internal bridge
//! webhooks.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use atende_core::{
    AtendeError, Conversation, Department, Message, MessageBody, TransferRecord,
};
use atende_files::{UploadFailure, UploadedFile};
use atende_whatsapp::BridgeStatus;

use crate::auth::AgentIdentity;
use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Wrapper mapping [`AtendeError`] onto HTTP responses.
pub struct ApiError(pub AtendeError);

impl From<AtendeError> for ApiError {
    fn from(err: AtendeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AtendeError::NotFound { .. } => StatusCode::NOT_FOUND,
            AtendeError::InvalidTarget(_) | AtendeError::Validation(_) | AtendeError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            AtendeError::Conflict { .. } | AtendeError::InvalidState(_) => StatusCode::CONFLICT,
            AtendeError::ChannelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AtendeError::SendFailure { .. } => StatusCode::BAD_GATEWAY,
            _ => {
                error!(error = %self.0, "internal error serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// --- Public ---

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn get_public_health(State(_state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// --- Internal bridge webhooks ---

/// Request body pushed by the bridge for every inbound channel message.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    /// Channel address of the sender, e.g. `5511999999999@c.us`.
    pub from: String,
    /// Message text.
    pub body: String,
    /// Author display hint for group-style addresses.
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub conversation_id: String,
}

/// POST /api/whatsapp/webhook_internal
///
/// Entry point for inbound channel messages. Delivery is at-least-once from
/// the channel's perspective and nothing here deduplicates.
pub async fn post_webhook_internal(
    State(state): State<GatewayState>,
    Json(body): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, ApiError> {
    info!(from = body.from.as_str(), "inbound channel message");
    let message = state
        .engine
        .ingest(
            &body.from,
            MessageBody::Text { content: body.body },
            body.author.as_deref(),
        )
        .await?;
    Ok(Json(WebhookResponse {
        status: "recebido".to_string(),
        conversation_id: message.conversation_id,
    }))
}

/// POST /api/whatsapp/status_internal
///
/// Bridge session status push; drives the adapter's state machine.
pub async fn post_status_internal(
    State(state): State<GatewayState>,
    Json(status): Json<BridgeStatus>,
) -> StatusCode {
    state.channel.publish_status(status).await;
    StatusCode::OK
}

// --- Conversations ---

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// GET /api/conversations
///
/// Scoped by the caller's role: admins and managers see every department,
/// agents their own.
pub async fn get_conversations(
    State(state): State<GatewayState>,
    Extension(identity): Extension<AgentIdentity>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let conversations = state.engine.list_for_agent(&identity.agent_id).await?;
    Ok(Json(ConversationListResponse { conversations }))
}

#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// GET /api/conversations/{id}
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDetailResponse>, ApiError> {
    let (conversation, messages) = state.engine.detail(&id).await?;
    Ok(Json(ConversationDetailResponse {
        conversation,
        messages,
    }))
}

/// Request body for POST /api/conversations/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    /// Text content, or caption for attachment kinds.
    #[serde(default)]
    pub content: Option<String>,
    /// `text` (default), `image`, `document`, or `audio`.
    #[serde(default)]
    pub message_type: Option<String>,
    /// Attachment path from the upload endpoint; required for non-text kinds.
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

fn body_from_request(request: PostMessageRequest) -> Result<MessageBody, AtendeError> {
    let kind = request.message_type.as_deref().unwrap_or("text");
    if kind == "text" {
        return Ok(MessageBody::Text {
            content: request.content.unwrap_or_default(),
        });
    }

    let file_path = request
        .file_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| {
            AtendeError::Validation(format!("message_type `{kind}` requires file_path"))
        })?;
    let caption = request.content.filter(|c| !c.trim().is_empty());
    match kind {
        "image" => Ok(MessageBody::Image { file_path, caption }),
        "document" => Ok(MessageBody::Document { file_path, caption }),
        "audio" => Ok(MessageBody::Audio { file_path, caption }),
        other => Err(AtendeError::Validation(format!(
            "unknown message_type `{other}`"
        ))),
    }
}

/// POST /api/conversations/{id}/messages
pub async fn post_message(
    State(state): State<GatewayState>,
    Extension(identity): Extension<AgentIdentity>,
    Path(id): Path<String>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let body = body_from_request(body)?;
    let message = state
        .engine
        .append_agent_message(&id, &identity.agent_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// Request body for POST /api/conversations/{id}/transfer.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_department_id: String,
    #[serde(default)]
    pub to_agent_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /api/conversations/{id}/transfer
pub async fn post_transfer(
    State(state): State<GatewayState>,
    Extension(identity): Extension<AgentIdentity>,
    Path(id): Path<String>,
    Json(body): Json<TransferRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .transfer(
            &id,
            &body.to_department_id,
            body.to_agent_id.as_deref(),
            body.reason.as_deref().unwrap_or(""),
            &identity.agent_id,
        )
        .await?;
    Ok(StatusCode::OK)
}

/// POST /api/conversations/{id}/claim
pub async fn post_claim(
    State(state): State<GatewayState>,
    Extension(identity): Extension<AgentIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.claim(&id, &identity.agent_id).await?;
    Ok(StatusCode::OK)
}

/// POST /api/conversations/{id}/close
pub async fn post_close(
    State(state): State<GatewayState>,
    Extension(identity): Extension<AgentIdentity>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.close(&id, &identity.agent_id).await?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
pub struct TransfersResponse {
    pub transfers: Vec<TransferRecord>,
}

/// GET /api/conversations/{id}/transfers
pub async fn get_transfers(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<TransfersResponse>, ApiError> {
    let transfers = state.engine.transfer_history(&id).await?;
    Ok(Json(TransfersResponse { transfers }))
}

#[derive(Debug, Serialize)]
pub struct DepartmentsResponse {
    pub departments: Vec<Department>,
}

/// GET /api/departments
///
/// Read-only listing so operators can pick transfer targets. Department
/// management itself happens elsewhere.
pub async fn get_departments(
    State(state): State<GatewayState>,
) -> Result<Json<DepartmentsResponse>, ApiError> {
    let departments = state.storage.list_departments().await?;
    Ok(Json(DepartmentsResponse { departments }))
}

// --- Uploads and files ---

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded_files: Vec<atende_core::FileDescriptor>,
    pub errors: Vec<UploadFailure>,
}

/// POST /api/upload_multiple (multipart, field `files[]`)
///
/// Per-file failures are collected and returned alongside the successes;
/// the batch never aborts halfway.
pub async fn post_upload_multiple(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AtendeError::Upload(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default();
        if name != "files" && name != "files[]" {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AtendeError::Upload(format!("failed reading upload: {e}")))?;
        files.push(UploadedFile {
            original_name,
            bytes: bytes.to_vec(),
        });
    }

    let batch = state.files.store_batch(files).await?;
    Ok(Json(UploadResponse {
        uploaded_files: batch.uploaded,
        errors: batch.errors,
    }))
}

/// GET /api/files/{*path}
pub async fn get_file(
    State(state): State<GatewayState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let (bytes, content_type) = state.files.open(&path).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

// --- Channel status ---

#[derive(Debug, Serialize)]
pub struct WhatsappStatusResponse {
    pub state: atende_core::ConnectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
}

/// GET /api/whatsapp/status
///
/// Snapshot for clients resynchronizing after a reconnect; live updates go
/// through the hub.
pub async fn get_whatsapp_status(
    State(state): State<GatewayState>,
) -> Json<WhatsappStatusResponse> {
    use atende_core::ChannelAdapter;
    Json(WhatsappStatusResponse {
        state: state.channel.state(),
        qr: state.channel.last_qr(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_request_deserializes_without_author() {
        let json = r#"{"from": "5511999999999@c.us", "body": "Hi"}"#;
        let req: WebhookRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.from, "5511999999999@c.us");
        assert_eq!(req.body, "Hi");
        assert!(req.author.is_none());
    }

    #[test]
    fn message_request_defaults_to_text() {
        let req: PostMessageRequest = serde_json::from_str(r#"{"content": "oi"}"#).unwrap();
        let body = body_from_request(req).unwrap();
        assert_eq!(
            body,
            MessageBody::Text {
                content: "oi".to_string()
            }
        );
    }

    #[test]
    fn attachment_request_requires_file_path() {
        let req: PostMessageRequest =
            serde_json::from_str(r#"{"message_type": "image"}"#).unwrap();
        let err = body_from_request(req).unwrap_err();
        assert!(matches!(err, AtendeError::Validation(_)));
    }

    #[test]
    fn attachment_request_maps_content_to_caption() {
        let req: PostMessageRequest = serde_json::from_str(
            r#"{"message_type": "document", "file_path": "document/x.pdf", "content": "contrato"}"#,
        )
        .unwrap();
        let body = body_from_request(req).unwrap();
        assert_eq!(
            body,
            MessageBody::Document {
                file_path: "document/x.pdf".to_string(),
                caption: Some("contrato".to_string()),
            }
        );
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        let req: PostMessageRequest =
            serde_json::from_str(r#"{"message_type": "video", "file_path": "v.mp4"}"#).unwrap();
        assert!(body_from_request(req).is_err());
    }

    #[test]
    fn error_mapping_matches_the_api_contract() {
        let cases = [
            (AtendeError::not_found("conversation", "x"), StatusCode::NOT_FOUND),
            (
                AtendeError::InvalidTarget("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AtendeError::Conflict {
                    conversation_id: "x".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                AtendeError::ChannelUnavailable {
                    state: "disconnected".to_string(),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AtendeError::SendFailure {
                    message: "x".to_string(),
                    source: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
