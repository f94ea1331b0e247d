// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transfer operations.
//!
//! `apply_transfer` is the one place where the ownership CAS, the transfer
//! record, and the system message are written together, inside a single
//! transaction, so a transfer can never leave a record without its message
//! or vice versa.

use atende_core::AtendeError;
use rusqlite::{params, params_from_iter, types::Value};

use crate::database::Database;
use crate::models::{ConversationStatus, Message, TransferRecord};
use crate::queries::messages::execute_insert;

fn row_to_transfer(row: &rusqlite::Row<'_>) -> Result<TransferRecord, rusqlite::Error> {
    Ok(TransferRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        from_department_id: row.get(2)?,
        to_department_id: row.get(3)?,
        to_agent_id: row.get(4)?,
        reason: row.get(5)?,
        actor_id: row.get(6)?,
        timestamp: row.get(7)?,
    })
}

/// Atomically apply a transfer.
///
/// In one transaction: CAS-update the conversation's ownership tuple to the
/// record's target, insert the transfer record, and append the system
/// message. Returns `false` with nothing written when the stored version no
/// longer equals `expected_version`.
pub async fn apply_transfer(
    db: &Database,
    record: &TransferRecord,
    expected_version: i64,
    new_status: ConversationStatus,
    system_message: &Message,
) -> Result<bool, AtendeError> {
    let record = record.clone();
    let system_message = system_message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let mut bind: Vec<Value> = vec![record.to_department_id.clone().into()];
            bind.push(match &record.to_agent_id {
                Some(a) => a.clone().into(),
                None => Value::Null,
            });
            bind.push(new_status.to_string().into());
            bind.push(record.conversation_id.clone().into());
            bind.push(expected_version.into());

            let affected = tx.execute(
                "UPDATE conversations
                 SET department_id = ?, assigned_agent_id = ?, status = ?,
                     version = version + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ? AND version = ?",
                params_from_iter(bind),
            )?;

            if affected != 1 {
                // Version moved under us; nothing may be written.
                tx.rollback()?;
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO transfers
                 (id, conversation_id, from_department_id, to_department_id,
                  to_agent_id, reason, actor_id, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.conversation_id,
                    record.from_department_id,
                    record.to_department_id,
                    record.to_agent_id,
                    record.reason,
                    record.actor_id,
                    record.timestamp,
                ],
            )?;

            execute_insert(&tx, &system_message)?;

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transfer history of one conversation, oldest first.
pub async fn list_transfers(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<TransferRecord>, AtendeError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, from_department_id, to_department_id,
                        to_agent_id, reason, actor_id, timestamp
                 FROM transfers WHERE conversation_id = ?1
                 ORDER BY timestamp ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], row_to_transfer)?;
            let mut transfers = Vec::new();
            for row in rows {
                transfers.push(row?);
            }
            Ok(transfers)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
