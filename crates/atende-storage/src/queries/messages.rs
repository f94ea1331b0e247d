// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations. Messages are append-only: there is deliberately no
//! update or delete here.

use atende_core::AtendeError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{body_from_columns, parse_enum, Message};

pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_type: parse_enum(2, row.get::<_, String>(2)?)?,
        sender_id: row.get(3)?,
        body: body_from_columns(4, row.get(4)?, row.get(5)?, row.get(6)?)?,
        timestamp: row.get(7)?,
    })
}

/// Column mapping for message inserts, shared with the transfer transaction.
pub(crate) fn execute_insert(
    conn: &rusqlite::Connection,
    msg: &Message,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO messages
         (id, conversation_id, sender_type, sender_id, message_type, content, file_path, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            msg.id,
            msg.conversation_id,
            msg.sender_type.to_string(),
            msg.sender_id,
            msg.body.kind(),
            msg.body.text().unwrap_or_default(),
            msg.body.file_path(),
            msg.timestamp,
        ],
    )?;
    Ok(())
}

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), AtendeError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            execute_insert(conn, &msg)?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get messages for a conversation in chronological order.
///
/// Ties on `timestamp` break by insertion order (rowid), so ordering is
/// stable even for messages written within the same millisecond.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, AtendeError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender_type, sender_id,
                                message_type, content, file_path, timestamp
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY timestamp ASC, rowid ASC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, sender_type, sender_id,
                                message_type, content, file_path, timestamp
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY timestamp ASC, rowid ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
