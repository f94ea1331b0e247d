// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The routing engine: conversation creation on first contact, message
//! appends, transfers between departments, claiming, and closing.
//!
//! All ownership mutations go through the store's compare-and-swap path.
//! Transfers and claims surface [`AtendeError::Conflict`] to the caller when
//! they lose a race -- re-reading and retrying on their behalf would let two
//! simultaneous transfers both "win", so the caller decides with fresh state.
//! Closing retries internally, since closing is idempotent in intent.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use atende_config::model::RoutingConfig;
use atende_core::{
    now_iso8601, AtendeError, ChannelAdapter, Contact, Conversation, ConversationStatus,
    ConversationUpdate, Department, Message, MessageBody, SenderType, StorageAdapter,
    TransferRecord,
};
use atende_hub::{Hub, HubEvent, Room};

/// Attempts for internally retried CAS updates (close).
const CAS_MAX_ATTEMPTS: u32 = 3;

/// The routing engine. Cheap to share behind an `Arc`.
pub struct RoutingEngine {
    storage: Arc<dyn StorageAdapter>,
    hub: Arc<Hub>,
    channel: Arc<dyn ChannelAdapter>,
    config: RoutingConfig,
    default_department_id: OnceCell<String>,
}

impl RoutingEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        hub: Arc<Hub>,
        channel: Arc<dyn ChannelAdapter>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            storage,
            hub,
            channel,
            config,
            default_department_id: OnceCell::new(),
        }
    }

    /// Find or create the configured default department and return its id.
    ///
    /// Called on startup and lazily by ingestion; creating is idempotent
    /// because the department name is unique.
    pub async fn ensure_default_department(&self) -> Result<String, AtendeError> {
        self.default_department_id
            .get_or_try_init(|| async {
                let name = self.config.default_department.as_str();
                if let Some(existing) = self.storage.find_department_by_name(name).await? {
                    return Ok(existing.id);
                }
                let department = Department {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    description: Some("Departamento padrão".to_string()),
                    active: true,
                    created_at: now_iso8601(),
                };
                self.storage.create_department(&department).await?;
                info!(name, id = department.id.as_str(), "default department created");
                Ok(department.id)
            })
            .await
            .map(|id| id.clone())
    }

    /// Ingest one inbound channel message.
    ///
    /// Finds or creates the contact by channel address, reuses the contact's
    /// open conversation or creates one in the default department, appends
    /// the customer message, and broadcasts it. Delivery from the channel is
    /// at-least-once and nothing here deduplicates: a redelivered event
    /// creates a second message.
    pub async fn ingest(
        &self,
        contact_phone: &str,
        body: MessageBody,
        author: Option<&str>,
    ) -> Result<Message, AtendeError> {
        validate_body(&body)?;

        let contact = self.find_or_create_contact(contact_phone, author).await?;
        let conversation = match self.storage.find_active_conversation(&contact.id).await? {
            Some(existing) => existing,
            None => {
                let department_id = self.ensure_default_department().await?;
                let now = now_iso8601();
                let conversation = Conversation {
                    id: Uuid::new_v4().to_string(),
                    contact_id: contact.id.clone(),
                    department_id,
                    assigned_agent_id: None,
                    status: ConversationStatus::Open,
                    version: 1,
                    created_at: now.clone(),
                    updated_at: now,
                };
                self.storage.create_conversation(&conversation).await?;
                info!(
                    conversation_id = conversation.id.as_str(),
                    contact = contact_phone,
                    "conversation created on first contact"
                );
                conversation
            }
        };

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_type: SenderType::Customer,
            sender_id: None,
            body,
            timestamp: now_iso8601(),
        };
        self.storage.insert_message(&message).await?;
        self.storage.touch_conversation(&conversation.id).await?;

        self.broadcast_message(&conversation, &message);
        Ok(message)
    }

    /// Append an agent-authored message and relay text content to the channel.
    ///
    /// The message is persisted and broadcast before the channel send; a
    /// channel failure surfaces to the caller but leaves the message in
    /// place (the store and the channel are only weakly consistent).
    pub async fn append_agent_message(
        &self,
        conversation_id: &str,
        agent_id: &str,
        body: MessageBody,
    ) -> Result<Message, AtendeError> {
        validate_body(&body)?;

        let conversation = self.get_existing(conversation_id).await?;
        if conversation.status == ConversationStatus::Closed {
            return Err(AtendeError::InvalidState(format!(
                "conversation {conversation_id} is closed"
            )));
        }
        let agent = self
            .storage
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| AtendeError::not_found("agent", agent_id))?;

        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_type: SenderType::Agent,
            sender_id: Some(agent.id.clone()),
            body,
            timestamp: now_iso8601(),
        };
        self.storage.insert_message(&message).await?;
        self.storage.touch_conversation(&conversation.id).await?;
        self.broadcast_message(&conversation, &message);

        // Only plain text goes out through the bridge; attachments stay
        // reachable via the files API.
        if let MessageBody::Text { content } = &message.body {
            let contact = self
                .storage
                .get_contact(&conversation.contact_id)
                .await?
                .ok_or_else(|| AtendeError::not_found("contact", &*conversation.contact_id))?;
            if let Err(e) = self.channel.send_text(&contact.phone, content).await {
                warn!(
                    conversation_id,
                    error = %e,
                    "channel send failed, message kept persisted"
                );
                return Err(e);
            }
        }

        Ok(message)
    }

    /// Transfer a conversation to another department and optionally a
    /// specific agent.
    ///
    /// Writes the conversation update, the transfer record, and the system
    /// message atomically. A CAS loss surfaces as [`AtendeError::Conflict`].
    pub async fn transfer(
        &self,
        conversation_id: &str,
        to_department_id: &str,
        to_agent_id: Option<&str>,
        reason: &str,
        actor_id: &str,
    ) -> Result<(), AtendeError> {
        let conversation = self.get_existing(conversation_id).await?;
        if conversation.status == ConversationStatus::Closed {
            return Err(AtendeError::InvalidState(format!(
                "conversation {conversation_id} is closed"
            )));
        }

        let target = self
            .storage
            .get_department(to_department_id)
            .await?
            .filter(|d| d.active)
            .ok_or_else(|| {
                AtendeError::InvalidTarget(format!(
                    "department {to_department_id} does not exist or is inactive"
                ))
            })?;

        let target_agent = match to_agent_id {
            Some(agent_id) => {
                let agent = self
                    .storage
                    .get_agent(agent_id)
                    .await?
                    .filter(|a| a.active)
                    .ok_or_else(|| {
                        AtendeError::InvalidTarget(format!(
                            "agent {agent_id} does not exist or is inactive"
                        ))
                    })?;
                if agent.department_id.as_deref() != Some(to_department_id) {
                    return Err(AtendeError::InvalidTarget(format!(
                        "agent {agent_id} does not belong to department {to_department_id}"
                    )));
                }
                Some(agent)
            }
            None => None,
        };

        let now = now_iso8601();
        let record = TransferRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            from_department_id: conversation.department_id.clone(),
            to_department_id: target.id.clone(),
            to_agent_id: target_agent.as_ref().map(|a| a.id.clone()),
            reason: reason.to_string(),
            actor_id: actor_id.to_string(),
            timestamp: now.clone(),
        };

        let mut description = format!("Conversa transferida para {}", target.name);
        if let Some(agent) = &target_agent {
            description.push_str(&format!(" e atribuída a {}", agent.name));
        }
        if !reason.trim().is_empty() {
            description.push_str(&format!(". Motivo: {reason}"));
        }
        let system_message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_type: SenderType::System,
            sender_id: None,
            body: MessageBody::Text {
                content: description,
            },
            timestamp: now,
        };

        // Without a target agent the conversation parks as pending, claimable
        // by the first agent of the target department.
        let new_status = if target_agent.is_some() {
            ConversationStatus::Open
        } else {
            ConversationStatus::Pending
        };

        let applied = self
            .storage
            .apply_transfer(&record, conversation.version, new_status, &system_message)
            .await?;
        if !applied {
            return Err(AtendeError::Conflict {
                conversation_id: conversation.id.clone(),
            });
        }

        info!(
            conversation_id,
            from = conversation.department_id.as_str(),
            to = target.id.as_str(),
            agent = to_agent_id.unwrap_or("-"),
            "conversation transferred"
        );

        self.hub.broadcast(
            &[
                Room::conversation(&conversation.id),
                Room::department(&conversation.department_id),
                Room::department(&target.id),
            ],
            &HubEvent::ConversationTransferred {
                conversation_id: conversation.id.clone(),
                from_department_id: conversation.department_id.clone(),
                to_department_id: target.id.clone(),
            },
        );
        // The system message is a message like any other for live views.
        self.hub.broadcast(
            &[
                Room::conversation(&conversation.id),
                Room::department(&target.id),
            ],
            &HubEvent::NewMessage {
                conversation_id: conversation.id.clone(),
                message: system_message,
            },
        );

        Ok(())
    }

    /// First-to-claim assignment of an unassigned conversation.
    ///
    /// The claiming agent must be active in the conversation's current
    /// department. The loser of a claim race gets [`AtendeError::Conflict`].
    pub async fn claim(&self, conversation_id: &str, agent_id: &str) -> Result<(), AtendeError> {
        let conversation = self.get_existing(conversation_id).await?;
        if conversation.status == ConversationStatus::Closed {
            return Err(AtendeError::InvalidState(format!(
                "conversation {conversation_id} is closed"
            )));
        }
        if conversation.assigned_agent_id.is_some() {
            return Err(AtendeError::InvalidState(format!(
                "conversation {conversation_id} is already assigned"
            )));
        }

        let agent = self
            .storage
            .get_agent(agent_id)
            .await?
            .filter(|a| a.active)
            .ok_or_else(|| AtendeError::not_found("agent", agent_id))?;
        if agent.department_id.as_deref() != Some(conversation.department_id.as_str()) {
            return Err(AtendeError::InvalidTarget(format!(
                "agent {agent_id} does not belong to department {}",
                conversation.department_id
            )));
        }

        let applied = self
            .storage
            .update_conversation_cas(
                &conversation.id,
                conversation.version,
                ConversationUpdate {
                    assigned_agent_id: Some(Some(agent.id.clone())),
                    status: Some(ConversationStatus::Open),
                    ..Default::default()
                },
            )
            .await?;
        if !applied {
            return Err(AtendeError::Conflict {
                conversation_id: conversation.id,
            });
        }
        debug!(conversation_id, agent_id, "conversation claimed");
        Ok(())
    }

    /// Explicitly close a conversation.
    ///
    /// Closing retries a bounded number of times on version races, since a
    /// concurrent transfer does not change the intent to close.
    pub async fn close(&self, conversation_id: &str, actor_id: &str) -> Result<(), AtendeError> {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let conversation = self.get_existing(conversation_id).await?;
            if conversation.status == ConversationStatus::Closed {
                return Err(AtendeError::InvalidState(format!(
                    "conversation {conversation_id} is already closed"
                )));
            }

            let applied = self
                .storage
                .update_conversation_cas(
                    &conversation.id,
                    conversation.version,
                    ConversationUpdate {
                        status: Some(ConversationStatus::Closed),
                        ..Default::default()
                    },
                )
                .await?;
            if !applied {
                continue;
            }

            let system_message = Message {
                id: Uuid::new_v4().to_string(),
                conversation_id: conversation.id.clone(),
                sender_type: SenderType::System,
                sender_id: None,
                body: MessageBody::Text {
                    content: "Conversa encerrada pelo atendente".to_string(),
                },
                timestamp: now_iso8601(),
            };
            self.storage.insert_message(&system_message).await?;

            info!(conversation_id, actor_id, "conversation closed");
            self.hub.broadcast(
                &[
                    Room::conversation(&conversation.id),
                    Room::department(&conversation.department_id),
                ],
                &HubEvent::ConversationClosed {
                    conversation_id: conversation.id.clone(),
                },
            );
            self.broadcast_message(&conversation, &system_message);
            return Ok(());
        }

        Err(AtendeError::Conflict {
            conversation_id: conversation_id.to_string(),
        })
    }

    /// Conversations visible to one agent: everything for admins/managers,
    /// the own department for agents.
    pub async fn list_for_agent(&self, agent_id: &str) -> Result<Vec<Conversation>, AtendeError> {
        let agent = self
            .storage
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| AtendeError::not_found("agent", agent_id))?;

        if agent.role.sees_all_departments() {
            return self.storage.list_conversations(None, None).await;
        }
        match agent.department_id.as_deref() {
            Some(department_id) => {
                self.storage
                    .list_conversations(Some(department_id), None)
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// One conversation plus its full ordered message log.
    pub async fn detail(
        &self,
        conversation_id: &str,
    ) -> Result<(Conversation, Vec<Message>), AtendeError> {
        let conversation = self.get_existing(conversation_id).await?;
        let messages = self.storage.get_messages(conversation_id, None).await?;
        Ok((conversation, messages))
    }

    /// Transfer history of one conversation.
    pub async fn transfer_history(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<TransferRecord>, AtendeError> {
        self.get_existing(conversation_id).await?;
        self.storage.list_transfers(conversation_id).await
    }

    async fn get_existing(&self, conversation_id: &str) -> Result<Conversation, AtendeError> {
        self.storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| AtendeError::not_found("conversation", conversation_id))
    }

    async fn find_or_create_contact(
        &self,
        phone: &str,
        author: Option<&str>,
    ) -> Result<Contact, AtendeError> {
        if let Some(existing) = self.storage.find_contact_by_phone(phone).await? {
            return Ok(existing);
        }
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            // Until an agent edits the contact, the display name is whatever
            // the channel gives us.
            name: author.unwrap_or(phone).to_string(),
            email: None,
            created_at: now_iso8601(),
        };
        self.storage.create_contact(&contact).await?;
        debug!(phone, "contact created on first inbound message");
        Ok(contact)
    }

    fn broadcast_message(&self, conversation: &Conversation, message: &Message) {
        self.hub.broadcast(
            &[
                Room::conversation(&conversation.id),
                Room::department(&conversation.department_id),
            ],
            &HubEvent::NewMessage {
                conversation_id: conversation.id.clone(),
                message: message.clone(),
            },
        );
    }
}

/// Reject messages with neither text content nor an attachment.
fn validate_body(body: &MessageBody) -> Result<(), AtendeError> {
    let has_text = body.text().is_some_and(|t| !t.trim().is_empty());
    let has_file = body.file_path().is_some_and(|p| !p.trim().is_empty());
    if !has_text && !has_file {
        return Err(AtendeError::Validation(
            "message needs text content or a file".to_string(),
        ));
    }
    Ok(())
}
