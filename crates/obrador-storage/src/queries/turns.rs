// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat transcript operations.

use obrador_core::FolioError;
use rusqlite::{params, Row};

use crate::database::{map_tr_err, parse_enum, Database};
use crate::models::ChatTurn;

fn turn_from_row(row: &Row<'_>) -> Result<ChatTurn, rusqlite::Error> {
    Ok(ChatTurn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: parse_enum(2, row.get(2)?)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Append a turn to a session's transcript.
pub async fn append_turn(db: &Database, turn: &ChatTurn) -> Result<(), FolioError> {
    let turn = turn.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_turns (id, session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    turn.id,
                    turn.session_id,
                    turn.role.to_string(),
                    turn.content,
                    turn.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

/// A session's turns in arrival order.
///
/// With a `limit`, only the most recent `limit` turns are returned (still in
/// arrival order).
pub async fn get_turns(
    db: &Database,
    session_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ChatTurn>, FolioError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let turns = match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, session_id, role, content, created_at FROM (
                             SELECT rowid AS seq, id, session_id, role, content, created_at
                             FROM chat_turns WHERE session_id = ?1
                             ORDER BY seq DESC LIMIT ?2
                         ) ORDER BY seq ASC",
                    )?;
                    stmt.query_map(params![session_id, lim], turn_from_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, session_id, role, content, created_at
                         FROM chat_turns WHERE session_id = ?1
                         ORDER BY rowid ASC",
                    )?;
                    stmt.query_map(params![session_id], turn_from_row)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(turns)
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}
