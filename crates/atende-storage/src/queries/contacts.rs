// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact CRUD operations.

use atende_core::AtendeError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Contact;

fn row_to_contact(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insert a new contact.
pub async fn create_contact(db: &Database, contact: &Contact) -> Result<(), AtendeError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, phone, name, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    contact.id,
                    contact.phone,
                    contact.name,
                    contact.email,
                    contact.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a contact by ID.
pub async fn get_contact(db: &Database, id: &str) -> Result<Option<Contact>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, phone, name, email, created_at FROM contacts WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_contact);
            match result {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a contact by its channel address.
pub async fn find_contact_by_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<Contact>, AtendeError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, phone, name, email, created_at FROM contacts WHERE phone = ?1",
            )?;
            let result = stmt.query_row(params![phone], row_to_contact);
            match result {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
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

    fn make_contact(id: &str, phone: &str) -> Contact {
        Contact {
            id: id.to_string(),
            phone: phone.to_string(),
            name: phone.to_string(),
            email: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_find_by_phone() {
        let (db, _dir) = setup_db().await;
        let contact = make_contact("ct-1", "5511999999999@c.us");

        create_contact(&db, &contact).await.unwrap();

        let found = find_contact_by_phone(&db, "5511999999999@c.us")
            .await
            .unwrap();
        assert_eq!(found, Some(contact));

        let missing = find_contact_by_phone(&db, "nobody@c.us").await.unwrap();
        assert!(missing.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_contact(&db, &make_contact("ct-1", "5511@c.us"))
            .await
            .unwrap();
        let result = create_contact(&db, &make_contact("ct-2", "5511@c.us")).await;
        assert!(result.is_err(), "phone has a unique index");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_contact_by_id() {
        let (db, _dir) = setup_db().await;
        let contact = make_contact("ct-9", "5511888887777@c.us");
        create_contact(&db, &contact).await.unwrap();

        assert_eq!(get_contact(&db, "ct-9").await.unwrap(), Some(contact));
        assert!(get_contact(&db, "ct-none").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
