// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent CRUD operations.

use atende_core::AtendeError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{parse_enum, Agent};

fn row_to_agent(row: &rusqlite::Row<'_>) -> Result<Agent, rusqlite::Error> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        role: parse_enum(2, row.get::<_, String>(2)?)?,
        department_id: row.get(3)?,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a new agent.
pub async fn create_agent(db: &Database, agent: &Agent) -> Result<(), AtendeError> {
    let agent = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, name, role, department_id, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    agent.id,
                    agent.name,
                    agent.role.to_string(),
                    agent.department_id,
                    agent.active,
                    agent.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an agent by ID.
pub async fn get_agent(db: &Database, id: &str) -> Result<Option<Agent>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, role, department_id, active, created_at
                 FROM agents WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_agent);
            match result {
                Ok(agent) => Ok(Some(agent)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
