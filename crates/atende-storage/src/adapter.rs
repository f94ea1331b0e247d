// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use atende_config::model::StorageConfig;
use atende_core::types::{
    Agent, Contact, Conversation, ConversationStatus, ConversationUpdate, Department,
    HealthStatus, Message, TransferRecord,
};
use atende_core::{Adapter, AtendeError, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed conversation store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not
    /// initialized.
    fn db(&self) -> Result<&Database, AtendeError> {
        self.db.get().ok_or_else(|| AtendeError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl Adapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, AtendeError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AtendeError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), AtendeError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path).await?;
        self.db.set(db).map_err(|_| AtendeError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AtendeError> {
        self.db()?.close().await
    }

    // --- Contact operations ---

    async fn create_contact(&self, contact: &Contact) -> Result<(), AtendeError> {
        queries::contacts::create_contact(self.db()?, contact).await
    }

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, AtendeError> {
        queries::contacts::get_contact(self.db()?, id).await
    }

    async fn find_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, AtendeError> {
        queries::contacts::find_contact_by_phone(self.db()?, phone).await
    }

    // --- Department operations ---

    async fn create_department(&self, department: &Department) -> Result<(), AtendeError> {
        queries::departments::create_department(self.db()?, department).await
    }

    async fn get_department(&self, id: &str) -> Result<Option<Department>, AtendeError> {
        queries::departments::get_department(self.db()?, id).await
    }

    async fn find_department_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Department>, AtendeError> {
        queries::departments::find_department_by_name(self.db()?, name).await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, AtendeError> {
        queries::departments::list_departments(self.db()?).await
    }

    // --- Agent operations ---

    async fn create_agent(&self, agent: &Agent) -> Result<(), AtendeError> {
        queries::agents::create_agent(self.db()?, agent).await
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, AtendeError> {
        queries::agents::get_agent(self.db()?, id).await
    }

    // --- Conversation operations ---

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), AtendeError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AtendeError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn find_active_conversation(
        &self,
        contact_id: &str,
    ) -> Result<Option<Conversation>, AtendeError> {
        queries::conversations::find_active_conversation(self.db()?, contact_id).await
    }

    async fn list_conversations(
        &self,
        department_id: Option<&str>,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, AtendeError> {
        queries::conversations::list_conversations(self.db()?, department_id, status).await
    }

    async fn update_conversation_cas(
        &self,
        id: &str,
        expected_version: i64,
        update: ConversationUpdate,
    ) -> Result<bool, AtendeError> {
        queries::conversations::update_conversation_cas(self.db()?, id, expected_version, update)
            .await
    }

    async fn touch_conversation(&self, id: &str) -> Result<(), AtendeError> {
        queries::conversations::touch_conversation(self.db()?, id).await
    }

    // --- Message operations ---

    async fn insert_message(&self, message: &Message) -> Result<(), AtendeError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, AtendeError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id, limit).await
    }

    // --- Transfer operations ---

    async fn apply_transfer(
        &self,
        record: &TransferRecord,
        expected_version: i64,
        new_status: ConversationStatus,
        system_message: &Message,
    ) -> Result<bool, AtendeError> {
        queries::transfers::apply_transfer(
            self.db()?,
            record,
            expected_version,
            new_status,
            system_message,
        )
        .await
    }

    async fn list_transfers(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<TransferRecord>, AtendeError> {
        queries::transfers::list_transfers(self.db()?, conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::{MessageBody, SenderType};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    async fn initialized_store(dir: &tempfile::TempDir) -> SqliteStore {
        let db_path = dir.path().join("adapter.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let store = initialized_store(&dir).await;
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        assert!(store.health_check().await.is_err());
    }

    #[tokio::test]
    async fn health_check_returns_healthy_when_initialized() {
        let dir = tempdir().unwrap();
        let store = initialized_store(&dir).await;
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn full_inbound_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let store = initialized_store(&dir).await;

        let contact = Contact {
            id: "ct-1".to_string(),
            phone: "5511999999999@c.us".to_string(),
            name: "Cliente".to_string(),
            email: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        store.create_contact(&contact).await.unwrap();

        let department = Department {
            id: "dp-1".to_string(),
            name: "Atendimento".to_string(),
            description: None,
            active: true,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        store.create_department(&department).await.unwrap();

        let conversation = Conversation {
            id: "cv-1".to_string(),
            contact_id: "ct-1".to_string(),
            department_id: "dp-1".to_string(),
            assigned_agent_id: None,
            status: ConversationStatus::Open,
            version: 1,
            created_at: "2026-01-01T00:00:01.000Z".to_string(),
            updated_at: "2026-01-01T00:00:01.000Z".to_string(),
        };
        store.create_conversation(&conversation).await.unwrap();

        let message = Message {
            id: "m-1".to_string(),
            conversation_id: "cv-1".to_string(),
            sender_type: SenderType::Customer,
            sender_id: None,
            body: MessageBody::Text {
                content: "Oi".to_string(),
            },
            timestamp: "2026-01-01T00:00:01.500Z".to_string(),
        };
        store.insert_message(&message).await.unwrap();

        let found = store
            .find_contact_by_phone("5511999999999@c.us")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "ct-1");

        let active = store.find_active_conversation("ct-1").await.unwrap();
        assert_eq!(active.unwrap().id, "cv-1");

        let messages = store.get_messages("cv-1", None).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body.text(), Some("Oi"));

        store.shutdown().await.unwrap();
    }
}
