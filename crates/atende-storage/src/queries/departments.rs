// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Department CRUD operations.

use atende_core::AtendeError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Department;

fn row_to_department(row: &rusqlite::Row<'_>) -> Result<Department, rusqlite::Error> {
    Ok(Department {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const SELECT_COLS: &str = "id, name, description, active, created_at";

/// Insert a new department.
pub async fn create_department(db: &Database, department: &Department) -> Result<(), AtendeError> {
    let department = department.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO departments (id, name, description, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    department.id,
                    department.name,
                    department.description,
                    department.active,
                    department.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a department by ID.
pub async fn get_department(db: &Database, id: &str) -> Result<Option<Department>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLS} FROM departments WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_department);
            match result {
                Ok(dept) => Ok(Some(dept)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a department by its unique name.
pub async fn find_department_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<Department>, AtendeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLS} FROM departments WHERE name = ?1"))?;
            let result = stmt.query_row(params![name], row_to_department);
            match result {
                Ok(dept) => Ok(Some(dept)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all departments ordered by name.
pub async fn list_departments(db: &Database) -> Result<Vec<Department>, AtendeError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLS} FROM departments ORDER BY name ASC"))?;
            let rows = stmt.query_map([], row_to_department)?;
            let mut departments = Vec::new();
            for row in rows {
                departments.push(row?);
            }
            Ok(departments)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_department(id: &str, name: &str) -> Department {
        Department {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            active: true,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_find_by_name() {
        let (db, _dir) = setup_db().await;
        let dept = make_department("dp-1", "Suporte");
        create_department(&db, &dept).await.unwrap();

        let found = find_department_by_name(&db, "Suporte").await.unwrap();
        assert_eq!(found, Some(dept));
        assert!(find_department_by_name(&db, "Vendas").await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_department(&db, &make_department("dp-1", "Suporte"))
            .await
            .unwrap();
        let result = create_department(&db, &make_department("dp-2", "Suporte")).await;
        assert!(result.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_orders_by_name() {
        let (db, _dir) = setup_db().await;
        create_department(&db, &make_department("dp-1", "Vendas"))
            .await
            .unwrap();
        create_department(&db, &make_department("dp-2", "Atendimento"))
            .await
            .unwrap();

        let all = list_departments(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Atendimento");
        assert_eq!(all[1].name, "Vendas");

        db.close().await.unwrap();
    }
}
