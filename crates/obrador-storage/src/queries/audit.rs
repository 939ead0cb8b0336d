// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit log writes and lookups.

use obrador_core::FolioError;
use rusqlite::{params, Row};

use crate::database::{json_column_error, map_tr_err, parse_enum, Database};
use crate::models::AuditEvent;

fn event_from_row(row: &Row<'_>) -> Result<AuditEvent, rusqlite::Error> {
    let metadata: String = row.get(4)?;
    Ok(AuditEvent {
        actor_id: row.get(0)?,
        action: parse_enum(1, row.get(1)?)?,
        entity_type: row.get(2)?,
        entity_id: row.get(3)?,
        metadata: serde_json::from_str(&metadata).map_err(|e| json_column_error(4, e))?,
        created_at: row.get(5)?,
    })
}

/// Append an audit event.
pub async fn insert_event(db: &Database, event: &AuditEvent) -> Result<(), FolioError> {
    let metadata = serde_json::to_string(&event.metadata).map_err(FolioError::persistence)?;
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO audit_log (actor_id, action, entity_type, entity_id, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.actor_id,
                    event.action.to_string(),
                    event.entity_type,
                    event.entity_id,
                    metadata,
                    event.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

/// Events recorded for one entity, oldest first.
pub async fn events_for_entity(
    db: &Database,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<AuditEvent>, FolioError> {
    let entity_type = entity_type.to_string();
    let entity_id = entity_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT actor_id, action, entity_type, entity_id, metadata, created_at
                 FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
                 ORDER BY id ASC",
            )?;
            let events = stmt
                .query_map(params![entity_type, entity_id], event_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(events)
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}
