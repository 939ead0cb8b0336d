// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session lifecycle.
//!
//! A session moves `active -> completed` (a folio was materialized) or
//! `active -> discarded`. Both are terminal. Every mutation is a locked
//! read-modify-write of the stored session, so two operations on the same
//! session never interleave and each one observes the result of the last.

use std::sync::Arc;

use obrador_core::draft::DraftImage;
use obrador_core::types::{
    timestamp_now, AuditAction, AuditEvent, ChatRole, ChatTurn, InboundMessage, SessionDetail,
};
use obrador_core::{ConversationSession, FolioError, Priority, StorageAdapter};
use obrador_draft::{merge, normalize_with, validate_for_materialization, DraftPatch, PricingRules};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audit::AuditNotifier;
use crate::locks::KeyedLocks;
use crate::materializer::{FolioMaterializer, Materialization};

/// Result of folding one assistant patch into a session.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub session: ConversationSession,
    /// Images beyond the per-draft cap, returned so the transport can tell
    /// the customer they were not kept.
    pub rejected_images: Vec<DraftImage>,
    /// Whether this patch flipped `needs_human` on.
    pub escalated: bool,
}

/// A completed session and the folio it produced.
#[derive(Debug, Clone)]
pub struct Finalized {
    pub session: ConversationSession,
    pub materialization: Materialization,
}

/// Owns every state transition of conversation sessions.
pub struct SessionService {
    storage: Arc<dyn StorageAdapter>,
    materializer: Arc<FolioMaterializer>,
    audit: AuditNotifier,
    rules: PricingRules,
    session_locks: KeyedLocks,
    key_locks: KeyedLocks,
}

impl SessionService {
    pub fn new(storage: Arc<dyn StorageAdapter>, audit: AuditNotifier, rules: PricingRules) -> Self {
        let materializer = Arc::new(FolioMaterializer::new(
            storage.clone(),
            audit.clone(),
            rules.clone(),
        ));
        Self {
            storage,
            materializer,
            audit,
            rules,
            session_locks: KeyedLocks::new(),
            key_locks: KeyedLocks::new(),
        }
    }

    pub fn materializer(&self) -> &Arc<FolioMaterializer> {
        &self.materializer
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn audit(&self) -> &AuditNotifier {
        &self.audit
    }

    /// The active session for an inbound message's transport key, opening a
    /// new one when the key maps to none.
    pub async fn open_or_resume(
        &self,
        tenant_id: &str,
        inbound: &InboundMessage,
    ) -> Result<ConversationSession, FolioError> {
        let lock_key = format!("{tenant_id}\u{1f}{}", inbound.session_key);
        let _guard = self.key_locks.acquire(&lock_key).await;
        self.resolve_session(tenant_id, inbound).await
    }

    async fn resolve_session(
        &self,
        tenant_id: &str,
        inbound: &InboundMessage,
    ) -> Result<ConversationSession, FolioError> {
        if let Some(existing) = self
            .storage
            .find_active_session(tenant_id, &inbound.session_key)
            .await?
        {
            return Ok(existing);
        }

        let session = ConversationSession::open(
            uuid::Uuid::new_v4().to_string(),
            tenant_id.to_string(),
            inbound.session_key.clone(),
            inbound.customer_phone.clone(),
            inbound
                .customer_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
        );
        if let Err(e) = self.storage.create_session(&session).await {
            // Another process may have opened the session first.
            if let Some(existing) = self
                .storage
                .find_active_session(tenant_id, &inbound.session_key)
                .await?
            {
                debug!(session_id = existing.id.as_str(), "joined concurrently opened session");
                return Ok(existing);
            }
            return Err(e);
        }

        info!(
            session_id = session.id.as_str(),
            tenant_id,
            session_key = session.session_key.as_str(),
            "session opened"
        );
        self.audit_session(
            None,
            AuditAction::Create,
            &session,
            serde_json::json!({ "sessionKey": session.session_key }),
        );
        Ok(session)
    }

    /// Appends a turn to an active session's transcript.
    ///
    /// Has no effect on the draft.
    pub async fn append_turn(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatTurn, FolioError> {
        let _guard = self.session_locks.acquire(session_id).await;
        self.load_active(session_id).await?;

        let turn = ChatTurn {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: timestamp_now(),
        };
        self.storage.append_turn(&turn).await?;
        debug!(session_id, role = %role, "turn appended");
        Ok(turn)
    }

    /// Merges an assistant patch into the session's draft and renormalizes it.
    ///
    /// A patch that reports ambiguities or asks for a human escalates the
    /// session to the operator.
    pub async fn apply_extraction(
        &self,
        session_id: &str,
        patch: &Value,
    ) -> Result<ExtractionOutcome, FolioError> {
        let _guard = self.session_locks.acquire(session_id).await;
        let mut session = self.load_active(session_id).await?;

        let patch = DraftPatch::from_value(patch);
        let merged = merge(&session.draft, &patch);
        session.replace_draft(normalize_with(merged.draft, &self.rules))?;

        let escalated = merged.needs_human && !session.needs_human;
        if escalated {
            session.set_needs_human(true)?;
            warn!(
                session_id,
                ambiguities = ?patch.ambiguities,
                "session escalated to an operator"
            );
        }
        if !merged.rejected_images.is_empty() {
            debug!(
                session_id,
                rejected = merged.rejected_images.len(),
                "image cap reached"
            );
        }

        self.store(&session).await?;
        debug!(session_id, "draft updated");
        self.audit_session(
            None,
            AuditAction::UpdateStatus,
            &session,
            serde_json::json!({ "change": "draft", "needsHuman": session.needs_human }),
        );

        Ok(ExtractionOutcome {
            session,
            rejected_images: merged.rejected_images,
            escalated,
        })
    }

    pub async fn set_priority(
        &self,
        session_id: &str,
        priority: Priority,
        actor_id: Option<&str>,
    ) -> Result<ConversationSession, FolioError> {
        let _guard = self.session_locks.acquire(session_id).await;
        let mut session = self.load_active(session_id).await?;
        session.set_priority(priority)?;
        self.store(&session).await?;
        debug!(session_id, priority = %priority, "priority changed");
        self.audit_session(
            actor_id,
            AuditAction::UpdateStatus,
            &session,
            serde_json::json!({ "priority": priority }),
        );
        Ok(session)
    }

    /// Flags or resolves a session for operator attention.
    pub async fn set_needs_human(
        &self,
        session_id: &str,
        needs_human: bool,
        actor_id: Option<&str>,
    ) -> Result<ConversationSession, FolioError> {
        let _guard = self.session_locks.acquire(session_id).await;
        let mut session = self.load_active(session_id).await?;
        session.set_needs_human(needs_human)?;
        self.store(&session).await?;
        debug!(session_id, needs_human, "triage flag changed");
        self.audit_session(
            actor_id,
            AuditAction::UpdateStatus,
            &session,
            serde_json::json!({ "needsHuman": needs_human }),
        );
        Ok(session)
    }

    /// Validates the draft, materializes its folio and completes the session.
    ///
    /// On [`FolioError::ValidationFailed`] the session stays active with its
    /// draft intact. A failure after the folio was stored leaves the session
    /// active too; calling again returns that same folio.
    pub async fn finalize(
        &self,
        session_id: &str,
        actor_id: Option<&str>,
    ) -> Result<Finalized, FolioError> {
        let _guard = self.session_locks.acquire(session_id).await;
        let mut session = self.load_active(session_id).await?;

        if let Err(e) = validate_for_materialization(&session.draft) {
            debug!(session_id, error = %e, "finalize refused");
            return Err(e);
        }

        let materialization = self.materializer.materialize(&session, actor_id).await?;
        session.complete(materialization.folio.folio_number)?;
        self.store(&session).await?;

        info!(
            session_id,
            folio_number = materialization.folio.folio_number,
            "session completed"
        );
        self.audit_session(
            actor_id,
            AuditAction::Finalize,
            &session,
            serde_json::json!({ "folioNumber": materialization.folio.folio_number }),
        );

        Ok(Finalized {
            session,
            materialization,
        })
    }

    /// Abandons a session. Nothing is ever materialized from it afterwards.
    pub async fn discard(
        &self,
        session_id: &str,
        reason: &str,
        actor_id: Option<&str>,
    ) -> Result<ConversationSession, FolioError> {
        let _guard = self.session_locks.acquire(session_id).await;
        let mut session = self.load_active(session_id).await?;
        session.discard(reason)?;
        self.store(&session).await?;

        info!(session_id, reason, "session discarded");
        self.audit_session(
            actor_id,
            AuditAction::Discard,
            &session,
            serde_json::json!({ "reason": reason }),
        );
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<ConversationSession, FolioError> {
        self.storage
            .get_session(session_id)
            .await?
            .ok_or_else(|| FolioError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// A session with its full transcript.
    pub async fn detail(&self, session_id: &str) -> Result<SessionDetail, FolioError> {
        let session = self.get(session_id).await?;
        let chat_history = self.storage.get_turns(session_id, None).await?;
        Ok(SessionDetail {
            session,
            chat_history,
        })
    }

    async fn load_active(&self, session_id: &str) -> Result<ConversationSession, FolioError> {
        let session = self.get(session_id).await?;
        session.ensure_active()?;
        Ok(session)
    }

    /// Writes a session back; storage refuses to overwrite a terminal row.
    async fn store(&self, session: &ConversationSession) -> Result<(), FolioError> {
        if self.storage.save_session(session).await? {
            return Ok(());
        }
        let current = self.get(&session.id).await?;
        Err(FolioError::SessionClosed {
            session_id: current.id,
            status: current.status,
        })
    }

    fn audit_session(
        &self,
        actor_id: Option<&str>,
        action: AuditAction,
        session: &ConversationSession,
        metadata: Value,
    ) {
        self.audit.notify(AuditEvent::new(
            actor_id.map(str::to_string),
            action,
            "session",
            session.id.clone(),
            metadata,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use obrador_config::model::StorageConfig;
    use obrador_core::types::{PaymentStatus, SessionStatus};
    use obrador_storage::SqliteStorage;
    use serde_json::json;
    use tempfile::TempDir;

    async fn service() -> (Arc<SessionService>, Arc<SqliteStorage>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("sessions.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        let service = Arc::new(SessionService::new(
            storage.clone(),
            AuditNotifier::new(storage.clone()),
            PricingRules::default(),
        ));
        (service, storage, dir)
    }

    fn inbound(key: &str) -> InboundMessage {
        InboundMessage {
            session_key: key.to_string(),
            customer_phone: "5215550003".to_string(),
            customer_name: Some("Ana".to_string()),
            text: "hola, quiero un pastel".to_string(),
        }
    }

    async fn open(service: &SessionService) -> ConversationSession {
        service.open_or_resume("t", &inbound("wa:1")).await.unwrap()
    }

    #[tokio::test]
    async fn resumes_the_active_session_for_a_key() {
        let (service, _storage, _dir) = service().await;
        let first = open(&service).await;
        let again = open(&service).await;
        assert_eq!(first.id, again.id);

        let other = service
            .open_or_resume("t", &inbound("wa:2"))
            .await
            .unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn concurrent_first_messages_open_one_session() {
        let (service, _storage, _dir) = service().await;
        let mut handles = Vec::new();
        for _ in 0..6 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.open_or_resume("t", &inbound("wa:9")).await.unwrap().id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn discarded_key_opens_a_fresh_session() {
        let (service, _storage, _dir) = service().await;
        let first = open(&service).await;
        service.discard(&first.id, "spam", None).await.unwrap();
        let next = open(&service).await;
        assert_ne!(first.id, next.id);
        assert_eq!(next.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn two_turns_accumulate_fields() {
        let (service, _storage, _dir) = service().await;
        let session = open(&service).await;

        service
            .apply_extraction(&session.id, &json!({"clientName": "Ana López"}))
            .await
            .unwrap();
        let outcome = service
            .apply_extraction(&session.id, &json!({"deliveryDate": "2026-12-24"}))
            .await
            .unwrap();

        let draft = &outcome.session.draft;
        assert_eq!(draft.client_name.as_deref(), Some("Ana López"));
        assert_eq!(draft.delivery_date, NaiveDate::from_ymd_opt(2026, 12, 24));
        assert_eq!(outcome.session.customer_name.as_deref(), Some("Ana López"));
    }

    #[tokio::test]
    async fn extraction_normalizes_totals() {
        let (service, _storage, _dir) = service().await;
        let session = open(&service).await;
        let outcome = service
            .apply_extraction(
                &session.id,
                &json!({
                    "persons": 45,
                    "cakeFlavors": ["chocolate"],
                    "fillings": [{"name": "cajeta", "hasCost": true}],
                    "baseCost": 600,
                    "deliveryTime": "5:30 PM",
                }),
            )
            .await
            .unwrap();

        let draft = &outcome.session.draft;
        assert_eq!(draft.totals.filling_surcharge, 90.0);
        assert_eq!(draft.totals.subtotal, 690.0);
        assert_eq!(draft.delivery_time.as_deref(), Some("17:30:00"));
    }

    #[tokio::test]
    async fn ambiguous_patch_escalates() {
        let (service, _storage, _dir) = service().await;
        let session = open(&service).await;
        let outcome = service
            .apply_extraction(
                &session.id,
                &json!({"ambiguities": ["dos fechas distintas en el mismo mensaje"]}),
            )
            .await
            .unwrap();
        assert!(outcome.escalated);
        assert!(outcome.session.needs_human);

        // Already flagged: a second ambiguous patch is not a new escalation.
        let again = service
            .apply_extraction(&session.id, &json!({"needsHuman": true}))
            .await
            .unwrap();
        assert!(!again.escalated);
        assert!(again.session.needs_human);
    }

    #[tokio::test]
    async fn finalize_without_flavors_keeps_session_active() {
        let (service, storage, _dir) = service().await;
        let session = open(&service).await;
        service
            .apply_extraction(&session.id, &json!({"deliveryDate": "2026-12-24"}))
            .await
            .unwrap();

        let err = service.finalize(&session.id, None).await.unwrap_err();
        assert_eq!(err.missing_fields().unwrap(), ["cakeFlavors".to_string()]);

        let stored = service.get(&session.id).await.unwrap();
        assert_eq!(stored.status, SessionStatus::Active);
        assert_eq!(stored.draft.delivery_date, NaiveDate::from_ymd_opt(2026, 12, 24));
        assert!(storage.get_folio("t", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn finalize_materializes_and_completes() {
        let (service, storage, _dir) = service().await;
        let session = open(&service).await;
        service
            .apply_extraction(
                &session.id,
                &json!({
                    "deliveryDate": "2026-12-24",
                    "cakeFlavors": ["chocolate"],
                    "baseCost": 1000,
                    "isPaidInFull": true,
                }),
            )
            .await
            .unwrap();

        let finalized = service.finalize(&session.id, Some("staff-1")).await.unwrap();
        let folio = &finalized.materialization.folio;
        assert_eq!(folio.folio_number, 1);
        assert_eq!(folio.session_id.as_deref(), Some(session.id.as_str()));
        assert_eq!(folio.payment_status, PaymentStatus::Paid);
        assert_eq!(finalized.session.status, SessionStatus::Completed);
        assert_eq!(finalized.session.folio_number, Some(1));
        assert_eq!(finalized.materialization.commission.rounded_amount, 50.0);
        assert!(!finalized.materialization.commission.applied_to_customer);

        let stored = storage.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SessionStatus::Completed);

        let again = service.finalize(&session.id, None).await.unwrap_err();
        assert!(matches!(
            again,
            FolioError::SessionClosed {
                status: SessionStatus::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn racing_finalizes_produce_one_folio() {
        let (service, storage, _dir) = service().await;
        let session = open(&service).await;
        service
            .apply_extraction(
                &session.id,
                &json!({"deliveryDate": "2026-12-24", "cakeFlavors": ["fresa"]}),
            )
            .await
            .unwrap();

        let a = {
            let service = service.clone();
            let id = session.id.clone();
            tokio::spawn(async move { service.finalize(&id, None).await })
        };
        let b = {
            let service = service.clone();
            let id = session.id.clone();
            tokio::spawn(async move { service.finalize(&id, None).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(FolioError::SessionClosed { .. }))));
        assert!(storage.get_folio("t", 2).await.unwrap().is_none());
        assert_eq!(storage.commission_count("t", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn discarded_session_rejects_mutations() {
        let (service, _storage, _dir) = service().await;
        let session = open(&service).await;
        let discarded = service
            .discard(&session.id, "cliente no respondió", Some("staff-2"))
            .await
            .unwrap();
        assert_eq!(discarded.status, SessionStatus::Discarded);

        let err = service
            .apply_extraction(&session.id, &json!({"clientName": "Otra"}))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::SessionClosed { .. }));
        assert!(matches!(
            service.append_turn(&session.id, ChatRole::User, "¿sigue ahí?").await,
            Err(FolioError::SessionClosed { .. })
        ));
        assert!(matches!(
            service.set_priority(&session.id, Priority::Alta, None).await,
            Err(FolioError::SessionClosed { .. })
        ));
        assert!(matches!(
            service.finalize(&session.id, None).await,
            Err(FolioError::SessionClosed { .. })
        ));
    }

    #[tokio::test]
    async fn lock_entries_do_not_outlive_mutations() {
        let (service, _storage, _dir) = service().await;
        let session = open(&service).await;
        assert!(service.key_locks.is_empty());

        service
            .append_turn(&session.id, ChatRole::User, "hola")
            .await
            .unwrap();
        service
            .apply_extraction(&session.id, &json!({ "persons": 20 }))
            .await
            .unwrap();
        service
            .set_priority(&session.id, Priority::Alta, None)
            .await
            .unwrap();
        service
            .set_needs_human(&session.id, true, None)
            .await
            .unwrap();
        let refused = service.finalize(&session.id, None).await;
        assert!(matches!(refused, Err(FolioError::ValidationFailed { .. })));

        assert!(service.session_locks.is_empty());
        assert_eq!(
            service.get(&session.id).await.unwrap().status,
            SessionStatus::Active
        );
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (service, _storage, _dir) = service().await;
        assert!(matches!(
            service.discard("nope", "x", None).await,
            Err(FolioError::SessionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn detail_carries_the_transcript() {
        let (service, _storage, _dir) = service().await;
        let session = open(&service).await;
        service
            .append_turn(&session.id, ChatRole::User, "quiero un pastel")
            .await
            .unwrap();
        service
            .append_turn(&session.id, ChatRole::Assistant, "¿para cuántas personas?")
            .await
            .unwrap();

        let detail = service.detail(&session.id).await.unwrap();
        assert_eq!(detail.chat_history.len(), 2);
        assert_eq!(detail.chat_history[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn operator_triage_changes_are_audited() {
        let (service, storage, _dir) = service().await;
        let session = open(&service).await;
        service
            .set_priority(&session.id, Priority::Urgente, Some("staff-3"))
            .await
            .unwrap();
        let updated = service
            .set_needs_human(&session.id, true, Some("staff-3"))
            .await
            .unwrap();
        assert_eq!(updated.priority, Priority::Urgente);
        assert!(updated.needs_human);

        let mut trail = Vec::new();
        for _ in 0..50 {
            trail = storage.audit_trail("session", &session.id).await.unwrap();
            if trail.len() >= 3 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
        assert!(actions.contains(&AuditAction::Create));
        assert_eq!(
            actions
                .iter()
                .filter(|a| **a == AuditAction::UpdateStatus)
                .count(),
            2
        );
    }
}
