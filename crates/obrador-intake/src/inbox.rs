// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator inbox over active sessions.

use std::cmp::Reverse;
use std::sync::Arc;

use obrador_core::types::InboxEntry;
use obrador_core::{FolioError, SessionStatus, StorageAdapter};

/// Read model listing the sessions operators may need to act on.
///
/// Every active session is listed (a flagged one in particular stays listed
/// until it is resolved or closed). Entries needing a human come first, then
/// by priority, then the longest waiting.
pub struct InboxTriage {
    storage: Arc<dyn StorageAdapter>,
}

impl InboxTriage {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Active sessions, optionally filtered by a case-insensitive substring
    /// of the customer name. A blank search lists everything.
    pub async fn list(
        &self,
        tenant_id: &str,
        search: Option<&str>,
    ) -> Result<Vec<InboxEntry>, FolioError> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut entries: Vec<InboxEntry> = self
            .storage
            .list_sessions(tenant_id, Some(SessionStatus::Active))
            .await?
            .iter()
            .filter(|session| match needle.as_deref() {
                Some(needle) => session
                    .customer_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(needle)),
                None => true,
            })
            .map(InboxEntry::from)
            .collect();

        entries.sort_by(|a, b| {
            (Reverse(a.needs_human), Reverse(a.priority), &a.updated_at).cmp(&(
                Reverse(b.needs_human),
                Reverse(b.priority),
                &b.updated_at,
            ))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditNotifier;
    use crate::session::SessionService;
    use obrador_config::model::StorageConfig;
    use obrador_core::types::InboundMessage;
    use obrador_core::Priority;
    use obrador_draft::PricingRules;
    use obrador_storage::SqliteStorage;
    use tempfile::TempDir;

    async fn setup() -> (SessionService, InboxTriage, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("inbox.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        let service = SessionService::new(
            storage.clone(),
            AuditNotifier::disabled(),
            PricingRules::default(),
        );
        (service, InboxTriage::new(storage), dir)
    }

    async fn open(service: &SessionService, key: &str, name: &str) -> String {
        service
            .open_or_resume(
                "t",
                &InboundMessage {
                    session_key: key.to_string(),
                    customer_phone: format!("52155500{key}"),
                    customer_name: Some(name.to_string()),
                    text: "hola".to_string(),
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn flagged_sessions_sort_first_then_priority() {
        let (service, inbox, _dir) = setup().await;
        let plain = open(&service, "01", "Ana").await;
        let urgent = open(&service, "02", "Beto").await;
        let flagged = open(&service, "03", "Carla").await;

        service
            .set_priority(&urgent, Priority::Urgente, None)
            .await
            .unwrap();
        service.set_needs_human(&flagged, true, None).await.unwrap();

        let ids: Vec<String> = inbox
            .list("t", None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, [flagged, urgent, plain]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_on_name() {
        let (service, inbox, _dir) = setup().await;
        open(&service, "01", "María José").await;
        open(&service, "02", "Pedro").await;

        let found = inbox.list("t", Some("  maría ")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].customer_name.as_deref(), Some("María José"));

        assert_eq!(inbox.list("t", Some("")).await.unwrap().len(), 2);
        assert!(inbox.list("t", Some("zzz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_sessions_leave_the_inbox() {
        let (service, inbox, _dir) = setup().await;
        let flagged = open(&service, "01", "Ana").await;
        service.set_needs_human(&flagged, true, None).await.unwrap();
        assert_eq!(inbox.list("t", None).await.unwrap().len(), 1);

        service.discard(&flagged, "duplicado", None).await.unwrap();
        assert!(inbox.list("t", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_tenants_are_not_listed() {
        let (service, inbox, _dir) = setup().await;
        open(&service, "01", "Ana").await;
        assert!(inbox.list("other", None).await.unwrap().is_empty());
    }
}
