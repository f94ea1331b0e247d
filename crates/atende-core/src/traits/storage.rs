// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the conversation store.

use async_trait::async_trait;

use crate::error::AtendeError;
use crate::traits::adapter::Adapter;
use crate::types::{
    Agent, Contact, Conversation, ConversationStatus, ConversationUpdate, Department, Message,
    TransferRecord,
};

/// Adapter for the persistent conversation store.
///
/// Implementations manage the database lifecycle and provide typed access to
/// the support-desk entities. All mutations of a conversation's ownership
/// tuple (`department_id`/`assigned_agent_id`/`status`) go through
/// compare-and-swap on `version`.
#[async_trait]
pub trait StorageAdapter: Adapter {
    /// Initializes the storage backend (migrations, connection).
    async fn initialize(&self) -> Result<(), AtendeError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), AtendeError>;

    // --- Contact operations ---

    async fn create_contact(&self, contact: &Contact) -> Result<(), AtendeError>;

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, AtendeError>;

    async fn find_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, AtendeError>;

    // --- Department operations ---

    async fn create_department(&self, department: &Department) -> Result<(), AtendeError>;

    async fn get_department(&self, id: &str) -> Result<Option<Department>, AtendeError>;

    async fn find_department_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Department>, AtendeError>;

    async fn list_departments(&self) -> Result<Vec<Department>, AtendeError>;

    // --- Agent operations ---

    async fn create_agent(&self, agent: &Agent) -> Result<(), AtendeError>;

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, AtendeError>;

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), AtendeError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AtendeError>;

    /// Finds the contact's current non-closed conversation, if any.
    async fn find_active_conversation(
        &self,
        contact_id: &str,
    ) -> Result<Option<Conversation>, AtendeError>;

    /// Lists conversations, optionally scoped to one department and/or status,
    /// most recently updated first.
    async fn list_conversations(
        &self,
        department_id: Option<&str>,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, AtendeError>;

    /// Applies `update` iff the stored version equals `expected_version`.
    ///
    /// On success the version is bumped and `updated_at` refreshed; returns
    /// `false` when the version no longer matches (concurrent mutation).
    async fn update_conversation_cas(
        &self,
        id: &str,
        expected_version: i64,
        update: ConversationUpdate,
    ) -> Result<bool, AtendeError>;

    /// Refreshes `updated_at` without touching the ownership tuple.
    async fn touch_conversation(&self, id: &str) -> Result<(), AtendeError>;

    // --- Message operations ---

    async fn insert_message(&self, message: &Message) -> Result<(), AtendeError>;

    /// Messages of one conversation in chronological order.
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, AtendeError>;

    // --- Transfer operations ---

    /// Atomically applies a transfer: CAS-updates the conversation's
    /// ownership tuple, inserts the transfer record, and appends the system
    /// message, all in one transaction. Returns `false` (with nothing
    /// written) when the CAS fails.
    async fn apply_transfer(
        &self,
        record: &TransferRecord,
        expected_version: i64,
        new_status: ConversationStatus,
        system_message: &Message,
    ) -> Result<bool, AtendeError>;

    /// Transfer history of one conversation, oldest first.
    async fn list_transfers(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<TransferRecord>, AtendeError>;
}
