// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations, including the compare-and-swap mutation path.

use atende_core::AtendeError;
use rusqlite::{params, params_from_iter, types::Value};

use crate::database::Database;
use crate::models::{parse_enum, Conversation, ConversationStatus, ConversationUpdate};

pub(crate) fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        department_id: row.get(2)?,
        assigned_agent_id: row.get(3)?,
        status: parse_enum(4, row.get::<_, String>(4)?)?,
        version: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const SELECT_COLS: &str =
    "id, contact_id, department_id, assigned_agent_id, status, version, created_at, updated_at";

/// Insert a new conversation.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), AtendeError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                 (id, contact_id, department_id, assigned_agent_id, status, version,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.id,
                    c.contact_id,
                    c.department_id,
                    c.assigned_agent_id,
                    c.status.to_string(),
                    c.version,
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLS} FROM conversations WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the contact's current non-closed conversation, if any.
///
/// At most one open/pending conversation per contact is expected; the most
/// recently updated wins if history says otherwise.
pub async fn find_active_conversation(
    db: &Database,
    contact_id: &str,
) -> Result<Option<Conversation>, AtendeError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLS} FROM conversations
                 WHERE contact_id = ?1 AND status != 'closed'
                 ORDER BY updated_at DESC LIMIT 1"
            ))?;
            let result = stmt.query_row(params![contact_id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List conversations, optionally scoped by department and/or status, most
/// recently updated first.
pub async fn list_conversations(
    db: &Database,
    department_id: Option<&str>,
    status: Option<ConversationStatus>,
) -> Result<Vec<Conversation>, AtendeError> {
    let department_id = department_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut clauses: Vec<&str> = Vec::new();
            let mut bind: Vec<Value> = Vec::new();
            if let Some(dept) = department_id {
                clauses.push("department_id = ?");
                bind.push(dept.into());
            }
            if let Some(status) = status {
                clauses.push("status = ?");
                bind.push(status.to_string().into());
            }
            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLS} FROM conversations {where_clause}
                 ORDER BY updated_at DESC"
            ))?;
            let rows = stmt.query_map(params_from_iter(bind), row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply `update` iff the stored version equals `expected_version`.
///
/// Bumps `version` and refreshes `updated_at` on success. Returns `false`
/// when zero rows matched, i.e. the conversation was mutated concurrently
/// (or does not exist -- callers check existence first).
pub async fn update_conversation_cas(
    db: &Database,
    id: &str,
    expected_version: i64,
    update: ConversationUpdate,
) -> Result<bool, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut bind: Vec<Value> = Vec::new();
            if let Some(dept) = update.department_id {
                sets.push("department_id = ?");
                bind.push(dept.into());
            }
            if let Some(agent) = update.assigned_agent_id {
                sets.push("assigned_agent_id = ?");
                bind.push(match agent {
                    Some(a) => a.into(),
                    None => Value::Null,
                });
            }
            if let Some(status) = update.status {
                sets.push("status = ?");
                bind.push(status.to_string().into());
            }
            sets.push("version = version + 1");
            sets.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");

            let sql = format!(
                "UPDATE conversations SET {} WHERE id = ? AND version = ?",
                sets.join(", ")
            );
            bind.push(id.into());
            bind.push(expected_version.into());

            let affected = conn.execute(&sql, params_from_iter(bind))?;
            Ok(affected == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Refresh `updated_at` without touching the ownership tuple or version.
pub async fn touch_conversation(db: &Database, id: &str) -> Result<(), AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::queries::contacts::create_contact;
    use crate::queries::departments::create_department;
    use atende_core::{Contact, Department};
    use tempfile::tempdir;

    pub(crate) async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        create_contact(
            &db,
            &Contact {
                id: "ct-1".to_string(),
                phone: "5511999999999@c.us".to_string(),
                name: "Cliente".to_string(),
                email: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
        for (id, name) in [("dp-1", "Atendimento"), ("dp-2", "Vendas")] {
            create_department(
                &db,
                &Department {
                    id: id.to_string(),
                    name: name.to_string(),
                    description: None,
                    active: true,
                    created_at: "2026-01-01T00:00:00.000Z".to_string(),
                },
            )
            .await
            .unwrap();
        }
        (db, dir)
    }

    pub(crate) fn make_conversation(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            contact_id: "ct-1".to_string(),
            department_id: "dp-1".to_string(),
            assigned_agent_id: None,
            status: ConversationStatus::Open,
            version: 1,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let conversation = make_conversation("cv-1");
        create_conversation(&db, &conversation).await.unwrap();

        let retrieved = get_conversation(&db, "cv-1").await.unwrap().unwrap();
        assert_eq!(retrieved, conversation);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_active_skips_closed() {
        let (db, _dir) = setup_db().await;
        let mut closed = make_conversation("cv-closed");
        closed.status = ConversationStatus::Closed;
        create_conversation(&db, &closed).await.unwrap();

        assert!(find_active_conversation(&db, "ct-1").await.unwrap().is_none());

        create_conversation(&db, &make_conversation("cv-open"))
            .await
            .unwrap();
        let active = find_active_conversation(&db, "ct-1").await.unwrap().unwrap();
        assert_eq!(active.id, "cv-open");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cas_applies_update_and_bumps_version() {
        let (db, _dir) = setup_db().await;
        create_conversation(&db, &make_conversation("cv-1"))
            .await
            .unwrap();

        let ok = update_conversation_cas(
            &db,
            "cv-1",
            1,
            ConversationUpdate {
                department_id: Some("dp-2".to_string()),
                assigned_agent_id: Some(None),
                status: Some(ConversationStatus::Pending),
            },
        )
        .await
        .unwrap();
        assert!(ok);

        let updated = get_conversation(&db, "cv-1").await.unwrap().unwrap();
        assert_eq!(updated.department_id, "dp-2");
        assert_eq!(updated.assigned_agent_id, None);
        assert_eq!(updated.status, ConversationStatus::Pending);
        assert_eq!(updated.version, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cas_with_stale_version_changes_nothing() {
        let (db, _dir) = setup_db().await;
        create_conversation(&db, &make_conversation("cv-1"))
            .await
            .unwrap();

        // First CAS moves version 1 -> 2.
        assert!(update_conversation_cas(
            &db,
            "cv-1",
            1,
            ConversationUpdate {
                department_id: Some("dp-2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap());

        // Second CAS still claims version 1 and must lose.
        let ok = update_conversation_cas(
            &db,
            "cv-1",
            1,
            ConversationUpdate {
                department_id: Some("dp-1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!ok);

        let current = get_conversation(&db, "cv-1").await.unwrap().unwrap();
        assert_eq!(current.department_id, "dp-2");
        assert_eq!(current.version, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_scopes_by_department_and_status() {
        let (db, _dir) = setup_db().await;
        create_conversation(&db, &make_conversation("cv-1"))
            .await
            .unwrap();
        let mut other = make_conversation("cv-2");
        other.department_id = "dp-2".to_string();
        other.status = ConversationStatus::Pending;
        create_conversation(&db, &other).await.unwrap();

        let all = list_conversations(&db, None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let dp1 = list_conversations(&db, Some("dp-1"), None).await.unwrap();
        assert_eq!(dp1.len(), 1);
        assert_eq!(dp1[0].id, "cv-1");

        let pending = list_conversations(&db, Some("dp-2"), Some(ConversationStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "cv-2");

        db.close().await.unwrap();
    }
}
