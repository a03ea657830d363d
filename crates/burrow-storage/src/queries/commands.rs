// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred command queues, session-scoped and standalone.
//!
//! Both queues are FIFO by insertion id. URLs and methods are re-validated on
//! read; rows that no longer parse are skipped.

use std::str::FromStr;

use burrow_core::BurrowError;
use burrow_core::types::{Command, HttpMethod, StandaloneCommand, parse_request_url};
use rusqlite::params;
use url::Url;

use super::decode_all;
use super::decode_error;
use crate::database::{Database, map_tr_err};

struct CommandRow {
    id: i64,
    session_id: Option<i64>,
    uuid: String,
    url: String,
    http_method: String,
    header_data: Vec<u8>,
    post_data: Vec<u8>,
    timestamp: f64,
}

fn read_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandRow> {
    Ok(CommandRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        uuid: row.get(2)?,
        url: row.get(3)?,
        http_method: row.get(4)?,
        header_data: row.get(5)?,
        post_data: row.get(6)?,
        timestamp: row.get(7)?,
    })
}

fn read_standalone_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandRow> {
    Ok(CommandRow {
        id: row.get(0)?,
        session_id: None,
        uuid: row.get(1)?,
        url: row.get(2)?,
        http_method: row.get(3)?,
        header_data: row.get(4)?,
        post_data: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

fn parse_request(
    table: &'static str,
    raw: &CommandRow,
) -> Result<(Url, HttpMethod), BurrowError> {
    let url = parse_request_url(&raw.url).map_err(|e| decode_error(table, raw.id, e))?;
    let method = HttpMethod::from_str(&raw.http_method).map_err(|_| {
        decode_error(
            table,
            raw.id,
            format!("unsupported http method `{}`", raw.http_method),
        )
    })?;
    Ok((url, method))
}

fn decode_command(raw: CommandRow) -> Result<Command, BurrowError> {
    let (url, http_method) = parse_request("commands", &raw)?;
    let session_id = raw
        .session_id
        .ok_or_else(|| decode_error("commands", raw.id, "missing session id"))?;
    Ok(Command {
        id: Some(raw.id),
        session_id,
        uuid: raw.uuid,
        url,
        http_method,
        header_data: raw.header_data,
        post_data: raw.post_data,
        timestamp: raw.timestamp,
    })
}

fn decode_standalone(raw: CommandRow) -> Result<StandaloneCommand, BurrowError> {
    let (url, http_method) = parse_request("standalone_commands", &raw)?;
    Ok(StandaloneCommand {
        id: Some(raw.id),
        uuid: raw.uuid,
        url,
        http_method,
        header_data: raw.header_data,
        post_data: raw.post_data,
        timestamp: raw.timestamp,
    })
}

/// Queue a session-scoped command; returns its id.
pub async fn save_command(db: &Database, command: &Command) -> Result<i64, BurrowError> {
    let command = command.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO commands (id, session_id, uuid, url, http_method, header_data,
                                       post_data, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    command.id,
                    command.session_id,
                    command.uuid,
                    command.url.as_str(),
                    command.http_method.to_string(),
                    command.header_data,
                    command.post_data,
                    command.timestamp,
                ],
            )?;
            Ok(command.id.unwrap_or_else(|| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Commands of one session in insertion order.
pub async fn commands_in_session(
    db: &Database,
    session_id: i64,
) -> Result<Vec<Command>, BurrowError> {
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<CommandRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, uuid, url, http_method, header_data, post_data, timestamp
                 FROM commands WHERE session_id = ?1 ORDER BY id ASC",
            )?;
            let rows: Result<Vec<CommandRow>, _> =
                stmt.query_map(params![session_id], read_session_row)?.collect();
            rows
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode_command))
}

pub async fn delete_command(db: &Database, id: i64) -> Result<(), BurrowError> {
    super::delete_by_id(db, "commands", id).await.map(|_| ())
}

pub async fn save_standalone_command(
    db: &Database,
    command: &StandaloneCommand,
) -> Result<i64, BurrowError> {
    let command = command.clone();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO standalone_commands (id, uuid, url, http_method, header_data,
                                                  post_data, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    command.id,
                    command.uuid,
                    command.url.as_str(),
                    command.http_method.to_string(),
                    command.header_data,
                    command.post_data,
                    command.timestamp,
                ],
            )?;
            Ok(command.id.unwrap_or_else(|| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

pub async fn standalone_commands(db: &Database) -> Result<Vec<StandaloneCommand>, BurrowError> {
    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<CommandRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, uuid, url, http_method, header_data, post_data, timestamp
                 FROM standalone_commands ORDER BY id ASC",
            )?;
            let rows: Result<Vec<CommandRow>, _> =
                stmt.query_map([], read_standalone_row)?.collect();
            rows
        })
        .await
        .map_err(map_tr_err)?;
    Ok(decode_all(rows, decode_standalone))
}

pub async fn delete_standalone_command(db: &Database, id: i64) -> Result<(), BurrowError> {
    super::delete_by_id(db, "standalone_commands", id)
        .await
        .map(|_| ())
}

/// Delete all listed standalone command ids or none of them.
pub async fn delete_standalone_command_ids(
    db: &Database,
    ids: &[i64],
) -> Result<usize, BurrowError> {
    super::delete_ids_atomically(db, "standalone_commands", ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::types::Session;

    use crate::queries::sessions;

    fn command(path: &str) -> burrow_core::types::CommandBuilder {
        Command::builder()
            .url(format!("https://example.com/{path}"))
            .http_method("GET")
            .timestamp(100.0)
    }

    #[tokio::test]
    async fn session_commands_are_fifo() {
        let db = Database::open_in_memory().await.unwrap();
        let session_id = sessions::save_session(&db, &Session::new(1)).await.unwrap();
        for path in ["a", "b", "c"] {
            save_command(&db, &command(path).build(session_id).unwrap())
                .await
                .unwrap();
        }

        let queued = commands_in_session(&db, session_id).await.unwrap();
        let paths: Vec<&str> = queued.iter().map(|c| c.url.path()).collect();
        assert_eq!(paths, ["/a", "/b", "/c"]);

        let first = queued[0].id.unwrap();
        delete_command(&db, first).await.unwrap();
        delete_command(&db, first).await.unwrap();
        assert_eq!(commands_in_session(&db, session_id).await.unwrap().len(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn row_with_corrupted_url_is_skipped() {
        let db = Database::open_in_memory().await.unwrap();
        save_standalone_command(&db, &command("ok").build_standalone().unwrap())
            .await
            .unwrap();
        db.connection()
            .call(|conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "INSERT INTO standalone_commands (uuid, url, http_method, header_data,
                                                      post_data, timestamp)
                     VALUES ('x', 'not a url', 'GET', x'', x'', 1.0)",
                    [],
                )
            })
            .await
            .unwrap();

        let queued = standalone_commands(&db).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].url.path(), "/ok");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn standalone_bulk_delete() {
        let db = Database::open_in_memory().await.unwrap();
        let a = save_standalone_command(&db, &command("a").build_standalone().unwrap())
            .await
            .unwrap();
        let b = save_standalone_command(&db, &command("b").build_standalone().unwrap())
            .await
            .unwrap();
        assert_eq!(delete_standalone_command_ids(&db, &[a, b]).await.unwrap(), 2);
        assert!(standalone_commands(&db).await.unwrap().is_empty());
        delete_standalone_command(&db, a).await.unwrap();
        db.close().await.unwrap();
    }
}
