// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single consumer-info record and its cookies.
//!
//! Saving replaces whatever was stored before, cookies included, inside one
//! transaction. There is never more than one consumer-info row.

use burrow_core::BurrowError;
use burrow_core::types::{ConsumerInfo, Cookie};
use rusqlite::{OptionalExtension, Transaction, params};

use crate::database::{Database, map_tr_err};

fn read_cookie(row: &rusqlite::Row<'_>) -> rusqlite::Result<Cookie> {
    Ok(Cookie {
        id: Some(row.get(0)?),
        consumer_info_id: Some(row.get(1)?),
        name: row.get(2)?,
        content: row.get(3)?,
        domain: row.get(4)?,
        expiration: row.get(5)?,
    })
}

fn replace(tx: &Transaction<'_>, info: &ConsumerInfo) -> rusqlite::Result<ConsumerInfo> {
    tx.execute("DELETE FROM cookies", [])?;
    tx.execute("DELETE FROM consumer_info", [])?;
    tx.execute(
        "INSERT INTO consumer_info (id, mpid, unique_identifier) VALUES (?1, ?2, ?3)",
        params![info.id, info.mpid, info.unique_identifier],
    )?;
    let info_id = info.id.unwrap_or_else(|| tx.last_insert_rowid());

    let mut saved = ConsumerInfo {
        id: Some(info_id),
        mpid: info.mpid,
        unique_identifier: info.unique_identifier.clone(),
        cookies: Vec::with_capacity(info.cookies.len()),
    };
    let mut stmt = tx.prepare(
        "INSERT INTO cookies (consumer_info_id, name, content, domain, expiration)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for cookie in &info.cookies {
        stmt.execute(params![
            info_id,
            cookie.name,
            cookie.content,
            cookie.domain,
            cookie.expiration
        ])?;
        saved.cookies.push(Cookie {
            id: Some(tx.last_insert_rowid()),
            consumer_info_id: Some(info_id),
            ..cookie.clone()
        });
    }
    Ok(saved)
}

/// Replace the stored consumer info. Returns the record with store ids filled in.
pub async fn save_consumer_info(
    db: &Database,
    info: &ConsumerInfo,
) -> Result<ConsumerInfo, BurrowError> {
    let info = info.clone();
    db.connection()
        .call(move |conn| -> Result<ConsumerInfo, rusqlite::Error> {
            let tx = conn.transaction()?;
            let saved = replace(&tx, &info)?;
            tx.commit()?;
            Ok(saved)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn fetch_consumer_info(db: &Database) -> Result<Option<ConsumerInfo>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Option<ConsumerInfo>, rusqlite::Error> {
            let head = conn
                .query_row(
                    "SELECT id, mpid, unique_identifier FROM consumer_info
                     ORDER BY id DESC LIMIT 1",
                    [],
                    |row| {
                        Ok(ConsumerInfo {
                            id: Some(row.get(0)?),
                            mpid: row.get(1)?,
                            unique_identifier: row.get(2)?,
                            cookies: Vec::new(),
                        })
                    },
                )
                .optional()?;
            let Some(mut info) = head else {
                return Ok(None);
            };
            let mut stmt = conn.prepare(
                "SELECT id, consumer_info_id, name, content, domain, expiration
                 FROM cookies WHERE consumer_info_id = ?1 ORDER BY id ASC",
            )?;
            let cookies: Result<Vec<Cookie>, _> =
                stmt.query_map(params![info.id], read_cookie)?.collect();
            info.cookies = cookies?;
            Ok(Some(info))
        })
        .await
        .map_err(map_tr_err)
}

/// Remove the consumer info and every cookie.
pub async fn delete_consumer_info(db: &Database) -> Result<(), BurrowError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM cookies", [])?;
            tx.execute("DELETE FROM consumer_info", [])?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn fetch_cookies(db: &Database) -> Result<Vec<Cookie>, BurrowError> {
    db.connection()
        .call(|conn| -> Result<Vec<Cookie>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, consumer_info_id, name, content, domain, expiration
                 FROM cookies ORDER BY id ASC",
            )?;
            let cookies: Result<Vec<Cookie>, _> = stmt.query_map([], read_cookie)?.collect();
            cookies
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_cookie(db: &Database, id: i64) -> Result<(), BurrowError> {
    super::delete_by_id(db, "cookies", id).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_replaces_previous_record_and_cookies() {
        let db = Database::open_in_memory().await.unwrap();
        let first = ConsumerInfo::new(1)
            .with_cookie(Cookie::new("uid", "a"))
            .with_cookie(Cookie::new("rid", "b"));
        save_consumer_info(&db, &first).await.unwrap();

        let second = ConsumerInfo::new(2).with_cookie(Cookie::new("uid", "c"));
        let saved = save_consumer_info(&db, &second).await.unwrap();
        assert!(saved.id.is_some());
        assert_eq!(saved.cookies[0].consumer_info_id, saved.id);

        let stored = fetch_consumer_info(&db).await.unwrap().unwrap();
        assert_eq!(stored.mpid, 2);
        assert_eq!(stored.cookies.len(), 1);
        assert_eq!(stored.cookie("uid").and_then(|c| c.content.as_deref()), Some("c"));
        assert_eq!(fetch_cookies(&db).await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn resaving_the_fetched_record_keeps_one_row() {
        let db = Database::open_in_memory().await.unwrap();
        let saved = save_consumer_info(&db, &ConsumerInfo::new(5).with_cookie(Cookie::new("k", "v")))
            .await
            .unwrap();
        let mut updated = saved.clone();
        updated.unique_identifier = Some("device-1".into());
        save_consumer_info(&db, &updated).await.unwrap();

        let stored = fetch_consumer_info(&db).await.unwrap().unwrap();
        assert_eq!(stored.id, saved.id);
        assert_eq!(stored.unique_identifier.as_deref(), Some("device-1"));
        assert_eq!(stored.cookies.len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_clears_cookies() {
        let db = Database::open_in_memory().await.unwrap();
        let saved = save_consumer_info(
            &db,
            &ConsumerInfo::new(3)
                .with_cookie(Cookie::new("a", "1"))
                .with_cookie(Cookie::new("b", "2")),
        )
        .await
        .unwrap();

        delete_cookie(&db, saved.cookies[0].id.unwrap()).await.unwrap();
        assert_eq!(fetch_cookies(&db).await.unwrap().len(), 1);

        delete_consumer_info(&db).await.unwrap();
        assert!(fetch_consumer_info(&db).await.unwrap().is_none());
        assert!(fetch_cookies(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
