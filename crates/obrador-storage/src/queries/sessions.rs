// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session CRUD operations.

use obrador_core::types::SessionStatus;
use obrador_core::{FolioError, OrderDraft};
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{json_column_error, map_tr_err, parse_enum, Database};
use crate::models::ConversationSession;

const SESSION_COLUMNS: &str = "id, tenant_id, session_key, customer_phone, customer_name, status, \
     priority, needs_human, draft, discard_reason, folio_number, created_at, updated_at";

fn session_from_row(row: &Row<'_>) -> Result<ConversationSession, rusqlite::Error> {
    let draft_json: String = row.get(8)?;
    let draft: OrderDraft =
        serde_json::from_str(&draft_json).map_err(|e| json_column_error(8, e))?;
    Ok(ConversationSession {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        session_key: row.get(2)?,
        customer_phone: row.get(3)?,
        customer_name: row.get(4)?,
        status: parse_enum(5, row.get(5)?)?,
        priority: parse_enum(6, row.get(6)?)?,
        needs_human: row.get(7)?,
        draft,
        discard_reason: row.get(9)?,
        folio_number: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn draft_json(session: &ConversationSession) -> Result<String, FolioError> {
    serde_json::to_string(&session.draft).map_err(FolioError::persistence)
}

/// Create a new session.
pub async fn create_session(
    db: &Database,
    session: &ConversationSession,
) -> Result<(), FolioError> {
    let draft = draft_json(session)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, tenant_id, session_key, customer_phone, customer_name,
                     status, priority, needs_human, draft, discard_reason, folio_number,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    session.id,
                    session.tenant_id,
                    session.session_key,
                    session.customer_phone,
                    session.customer_name,
                    session.status.to_string(),
                    session.priority.to_string(),
                    session.needs_human,
                    draft,
                    session.discard_reason,
                    session.folio_number,
                    session.created_at,
                    session.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

/// Get a session by ID.
pub async fn get_session(
    db: &Database,
    id: &str,
) -> Result<Option<ConversationSession>, FolioError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The active session for a transport key, if any.
pub async fn find_active_session(
    db: &Database,
    tenant_id: &str,
    session_key: &str,
) -> Result<Option<ConversationSession>, FolioError> {
    let tenant_id = tenant_id.to_string();
    let session_key = session_key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE tenant_id = ?1 AND session_key = ?2 AND status = 'active'"
                ),
                params![tenant_id, session_key],
                session_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List a tenant's sessions, most recently updated first, optionally filtered by status.
pub async fn list_sessions(
    db: &Database,
    tenant_id: &str,
    status: Option<SessionStatus>,
) -> Result<Vec<ConversationSession>, FolioError> {
    let tenant_id = tenant_id.to_string();
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY updated_at DESC"
            ))?;
            let sessions = stmt
                .query_map(params![tenant_id, status], session_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

/// Write back every mutable column of a session that is still active in storage.
///
/// Returns `false` when no active row matched (missing, or already terminal).
pub async fn save_session(
    db: &Database,
    session: &ConversationSession,
) -> Result<bool, FolioError> {
    let draft = draft_json(session)?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET customer_name = ?1, status = ?2, priority = ?3,
                     needs_human = ?4, draft = ?5, discard_reason = ?6, folio_number = ?7,
                     updated_at = ?8
                 WHERE id = ?9 AND status = 'active'",
                params![
                    session.customer_name,
                    session.status.to_string(),
                    session.priority.to_string(),
                    session.needs_human,
                    draft,
                    session.discard_reason,
                    session.folio_number,
                    session.updated_at,
                    session.id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obrador_core::types::Priority;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_session(id: &str, key: &str) -> ConversationSession {
        ConversationSession::open(
            id.to_string(),
            "tenant-a".to_string(),
            key.to_string(),
            "5215550001".to_string(),
            Some("Ana".to_string()),
        )
    }

    #[tokio::test]
    async fn create_and_get_session_roundtrips() {
        let (db, _dir) = setup_db().await;
        let mut session = make_session("sess-1", "wa:1");
        session.draft.cake_flavors = vec!["chocolate".into()];

        create_session(&db, &session).await.unwrap();
        let retrieved = get_session(&db, "sess-1").await.unwrap().unwrap();
        assert_eq!(retrieved, session);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_session_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = get_session(&db, "no-such-session").await.unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_active_session_ignores_terminal_ones() {
        let (db, _dir) = setup_db().await;
        let mut old = make_session("old", "wa:1");
        create_session(&db, &old).await.unwrap();
        old.discard("stale").unwrap();
        assert!(save_session(&db, &old).await.unwrap());

        assert!(find_active_session(&db, "tenant-a", "wa:1")
            .await
            .unwrap()
            .is_none());

        let fresh = make_session("fresh", "wa:1");
        create_session(&db, &fresh).await.unwrap();
        let found = find_active_session(&db, "tenant-a", "wa:1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "fresh");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_active_session_for_same_key_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "wa:dup")).await.unwrap();
        let err = create_session(&db, &make_session("s2", "wa:dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Persistence { .. }));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_sessions_with_filter() {
        let (db, _dir) = setup_db().await;
        let s1 = make_session("s1", "wa:1");
        let mut s2 = make_session("s2", "wa:2");
        create_session(&db, &s1).await.unwrap();
        create_session(&db, &s2).await.unwrap();
        s2.complete(7).unwrap();
        save_session(&db, &s2).await.unwrap();

        let all = list_sessions(&db, "tenant-a", None).await.unwrap();
        assert_eq!(all.len(), 2);

        let active = list_sessions(&db, "tenant-a", Some(SessionStatus::Active))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "s1");

        let completed = list_sessions(&db, "tenant-a", Some(SessionStatus::Completed))
            .await
            .unwrap();
        assert_eq!(completed[0].folio_number, Some(7));

        let other_tenant = list_sessions(&db, "tenant-b", None).await.unwrap();
        assert!(other_tenant.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_session_persists_triage_fields() {
        let (db, _dir) = setup_db().await;
        let mut session = make_session("s-upd", "wa:1");
        create_session(&db, &session).await.unwrap();

        session.set_priority(Priority::Urgente).unwrap();
        session.set_needs_human(true).unwrap();
        assert!(save_session(&db, &session).await.unwrap());

        let retrieved = get_session(&db, "s-upd").await.unwrap().unwrap();
        assert_eq!(retrieved.priority, Priority::Urgente);
        assert!(retrieved.needs_human);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_session_refuses_to_overwrite_terminal_row() {
        let (db, _dir) = setup_db().await;
        let session = make_session("s-closed", "wa:1");
        create_session(&db, &session).await.unwrap();

        let mut discarded = session.clone();
        discarded.discard("wrong number").unwrap();
        assert!(save_session(&db, &discarded).await.unwrap());

        // A stale copy that still thinks it is active cannot resurrect the row.
        let mut stale = session;
        stale.set_priority(Priority::Alta).unwrap();
        assert!(!save_session(&db, &stale).await.unwrap());

        let stored = get_session(&db, "s-closed").await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Discarded);
        db.close().await.unwrap();
    }
}
