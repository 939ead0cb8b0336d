// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversational order intake for the Obrador framework.
//!
//! The [`IntakeService`] is the entry point for transport adapters. It:
//! - Resolves the active session for each inbound message
//! - Keeps the transcript and asks the assistant for a reply and a draft patch
//! - Folds patches into the draft through [`SessionService`]
//! - Finalizes the session into a folio when the assistant says the order is complete
//!
//! Operator tools use [`SessionService`], [`InboxTriage`] and
//! [`FolioMaterializer`] directly.

pub mod audit;
pub mod inbox;
pub mod locks;
pub mod materializer;
pub mod session;
pub mod settlement;

use std::sync::Arc;
use std::time::Duration;

use obrador_config::model::{IntakeConfig, PricingConfig};
use obrador_core::draft::DraftImage;
use obrador_core::types::{
    timestamp_now, AssistantReply, AssistantRequest, ChatRole, ChatTurn, InboundMessage,
};
use obrador_core::{AssistantAdapter, ConversationSession, FolioError};
use obrador_draft::{describe_missing, PricingRules};
use tracing::{debug, warn};

pub use audit::AuditNotifier;
pub use inbox::InboxTriage;
pub use locks::{KeyedGuard, KeyedLocks};
pub use materializer::{FolioMaterializer, Materialization};
pub use session::{ExtractionOutcome, Finalized, SessionService};
pub use settlement::CommissionSettlement;

/// Pricing rules from the `[pricing]` config section.
pub fn pricing_rules(config: &PricingConfig) -> PricingRules {
    PricingRules {
        commission_rate_percent: config.commission_rate_percent,
        filling_surcharge: config.filling_surcharge,
        persons_per_surcharge_block: config.persons_per_surcharge_block,
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone)]
pub struct InboundOutcome {
    /// The session after the message was processed.
    pub session: ConversationSession,
    /// Text to send back to the customer.
    pub reply: String,
    pub rejected_images: Vec<DraftImage>,
    /// Set when the assistant asked to finalize and the folio was created.
    pub materialization: Option<Materialization>,
    /// Fields still missing when the assistant asked to finalize too early.
    pub missing_fields: Vec<String>,
}

/// Drives one customer conversation per transport key.
pub struct IntakeService {
    tenant_id: String,
    sessions: Arc<SessionService>,
    assistant: Arc<dyn AssistantAdapter>,
    assistant_timeout: Duration,
    auto_finalize: bool,
    inbound_locks: KeyedLocks,
}

impl IntakeService {
    pub fn new(
        tenant_id: impl Into<String>,
        sessions: Arc<SessionService>,
        assistant: Arc<dyn AssistantAdapter>,
        config: &IntakeConfig,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            sessions,
            assistant,
            assistant_timeout: Duration::from_secs(config.assistant_timeout_secs),
            auto_finalize: config.auto_finalize,
            inbound_locks: KeyedLocks::new(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionService> {
        &self.sessions
    }

    /// Processes one inbound transport message end to end.
    ///
    /// Messages for the same transport key are handled one at a time in
    /// arrival order. If the assistant fails or times out, the customer's
    /// turn stays in the transcript, the draft is untouched, and the error is
    /// reported as [`FolioError::CollaboratorUnavailable`] so the transport
    /// can ask the customer to retry.
    pub async fn handle_inbound(
        &self,
        inbound: InboundMessage,
    ) -> Result<InboundOutcome, FolioError> {
        let key = inbound.session_key.clone();
        let _guard = self.inbound_locks.acquire(&key).await;
        self.process(inbound).await
    }

    async fn process(&self, inbound: InboundMessage) -> Result<InboundOutcome, FolioError> {
        let session = self
            .sessions
            .open_or_resume(&self.tenant_id, &inbound)
            .await?;
        self.sessions
            .append_turn(&session.id, ChatRole::User, &inbound.text)
            .await?;

        let chat_history = self.sessions.storage().get_turns(&session.id, None).await?;
        let request = AssistantRequest {
            session_id: session.id.clone(),
            chat_history,
            draft: session.draft.clone(),
            latest_message: inbound.text.clone(),
        };
        let reply = self.ask_assistant(&session.id, request).await?;

        let mut session = session;
        let mut rejected_images = Vec::new();
        if let Some(patch) = reply.patch.as_ref() {
            let outcome = self.sessions.apply_extraction(&session.id, patch).await?;
            rejected_images = outcome.rejected_images;
            session = outcome.session;
        }

        let mut reply_text = reply.text;
        let mut materialization = None;
        let mut missing_fields = Vec::new();
        if reply.finalize && self.auto_finalize {
            match self.sessions.finalize(&session.id, None).await {
                Ok(finalized) => {
                    session = finalized.session;
                    materialization = Some(finalized.materialization);
                }
                Err(FolioError::ValidationFailed { fields }) => {
                    debug!(
                        session_id = session.id.as_str(),
                        missing = ?fields,
                        "assistant asked to finalize an incomplete draft"
                    );
                    reply_text = join_reply(&reply_text, &describe_missing(&fields));
                    missing_fields = fields;
                }
                Err(e) => return Err(e),
            }
        }

        if !reply_text.trim().is_empty() {
            self.sessions
                .storage()
                .append_turn(&ChatTurn {
                    id: uuid::Uuid::new_v4().to_string(),
                    session_id: session.id.clone(),
                    role: ChatRole::Assistant,
                    content: reply_text.clone(),
                    created_at: timestamp_now(),
                })
                .await?;
        }

        Ok(InboundOutcome {
            session,
            reply: reply_text,
            rejected_images,
            materialization,
            missing_fields,
        })
    }

    async fn ask_assistant(
        &self,
        session_id: &str,
        request: AssistantRequest,
    ) -> Result<AssistantReply, FolioError> {
        match tokio::time::timeout(self.assistant_timeout, self.assistant.respond(request)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                warn!(session_id, error = %e, "assistant failed");
                Err(match e {
                    FolioError::CollaboratorUnavailable { .. } => e,
                    other => FolioError::CollaboratorUnavailable {
                        message: other.to_string(),
                        source: Some(Box::new(other)),
                    },
                })
            }
            Err(_) => {
                let duration = self.assistant_timeout;
                warn!(session_id, ?duration, "assistant timed out");
                Err(FolioError::CollaboratorUnavailable {
                    message: format!("no reply within {duration:?}"),
                    source: Some(Box::new(FolioError::Timeout { duration })),
                })
            }
        }
    }
}

fn join_reply(reply: &str, note: &str) -> String {
    if reply.trim().is_empty() {
        note.to_string()
    } else {
        format!("{}\n\n{note}", reply.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use obrador_config::model::StorageConfig;
    use obrador_core::types::SessionStatus;
    use obrador_core::{AdapterType, HealthStatus, PluginAdapter, StorageAdapter};
    use obrador_storage::SqliteStorage;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    enum Step {
        Reply(AssistantReply),
        Fail,
        Hang,
    }

    struct ScriptedAssistant {
        steps: Mutex<VecDeque<Step>>,
    }

    impl ScriptedAssistant {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
            }
        }
    }

    #[async_trait]
    impl PluginAdapter for ScriptedAssistant {
        fn name(&self) -> &str {
            "scripted"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Assistant
        }
        async fn health_check(&self) -> Result<HealthStatus, FolioError> {
            Ok(HealthStatus::Healthy)
        }
        async fn shutdown(&self) -> Result<(), FolioError> {
            Ok(())
        }
    }

    #[async_trait]
    impl AssistantAdapter for ScriptedAssistant {
        async fn respond(&self, _request: AssistantRequest) -> Result<AssistantReply, FolioError> {
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(reply)) => Ok(reply),
                Some(Step::Fail) | None => Err(FolioError::Internal("model offline".into())),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(AssistantReply::default())
                }
            }
        }
    }

    async fn intake(
        steps: Vec<Step>,
        auto_finalize: bool,
    ) -> (IntakeService, Arc<SqliteStorage>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: dir.path().join("intake.db").to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        storage.initialize().await.unwrap();
        let sessions = Arc::new(SessionService::new(
            storage.clone(),
            AuditNotifier::disabled(),
            PricingRules::default(),
        ));
        let config = IntakeConfig {
            assistant_timeout_secs: 1,
            auto_finalize,
        };
        let service = IntakeService::new(
            "t",
            sessions,
            Arc::new(ScriptedAssistant::new(steps)),
            &config,
        );
        (service, storage, dir)
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            session_key: "wa:5215550004".to_string(),
            customer_phone: "5215550004".to_string(),
            customer_name: Some("Rosa".to_string()),
            text: text.to_string(),
        }
    }

    fn complete_patch() -> serde_json::Value {
        json!({
            "deliveryDate": "2026-12-24",
            "cakeFlavors": ["tres leches"],
            "baseCost": 800,
        })
    }

    #[test]
    fn pricing_rules_follow_config() {
        let rules = pricing_rules(&PricingConfig {
            commission_rate_percent: 10.0,
            filling_surcharge: 25.0,
            persons_per_surcharge_block: 15,
        });
        assert_eq!(rules.commission_rate_percent, 10.0);
        assert_eq!(rules.surcharge_for(16), 50.0);
    }

    #[tokio::test]
    async fn conversation_builds_draft_and_transcript() {
        let (service, storage, _dir) = intake(
            vec![
                Step::Reply(AssistantReply::with_patch(
                    "¿Para qué fecha?",
                    json!({"cakeFlavors": ["chocolate"]}),
                )),
                Step::Reply(AssistantReply::with_patch(
                    "Anotado.",
                    json!({"deliveryDate": "2026-12-24"}),
                )),
            ],
            true,
        )
        .await;

        let first = service.handle_inbound(message("pastel de chocolate")).await.unwrap();
        let second = service.handle_inbound(message("para nochebuena")).await.unwrap();
        assert_eq!(first.session.id, second.session.id);
        assert_eq!(second.reply, "Anotado.");
        assert_eq!(second.session.draft.cake_flavors, vec!["chocolate"]);
        assert!(second.session.draft.delivery_date.is_some());

        let turns = storage.get_turns(&second.session.id, None).await.unwrap();
        let roles: Vec<ChatRole> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            [ChatRole::User, ChatRole::Assistant, ChatRole::User, ChatRole::Assistant]
        );
    }

    #[tokio::test]
    async fn finalize_intent_materializes_the_folio() {
        let (service, storage, _dir) = intake(
            vec![Step::Reply(AssistantReply {
                text: "¡Listo!".into(),
                patch: Some(complete_patch()),
                finalize: true,
            })],
            true,
        )
        .await;

        let outcome = service.handle_inbound(message("eso es todo")).await.unwrap();
        let m = outcome.materialization.expect("folio created");
        assert_eq!(m.folio.folio_number, 1);
        assert_eq!(outcome.session.status, SessionStatus::Completed);
        assert!(storage.get_commission("t", 1).await.unwrap().is_some());

        // The closing reply is kept even though the session is completed.
        let turns = storage.get_turns(&outcome.session.id, None).await.unwrap();
        assert_eq!(turns.last().unwrap().content, "¡Listo!");
    }

    #[tokio::test]
    async fn premature_finalize_lists_missing_fields() {
        let (service, _storage, _dir) = intake(
            vec![Step::Reply(AssistantReply {
                text: "Perfecto.".into(),
                patch: Some(json!({"cakeFlavors": ["fresa"]})),
                finalize: true,
            })],
            true,
        )
        .await;

        let outcome = service.handle_inbound(message("ya")).await.unwrap();
        assert!(outcome.materialization.is_none());
        assert_eq!(outcome.missing_fields, ["deliveryDate".to_string()]);
        assert!(outcome.reply.ends_with("Falta un dato para crear el folio: fecha de entrega."));
        assert_eq!(outcome.session.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn finalize_intent_is_ignored_without_auto_finalize() {
        let (service, _storage, _dir) = intake(
            vec![Step::Reply(AssistantReply {
                text: "Un operador confirmará tu pedido.".into(),
                patch: Some(complete_patch()),
                finalize: true,
            })],
            false,
        )
        .await;

        let outcome = service.handle_inbound(message("listo")).await.unwrap();
        assert!(outcome.materialization.is_none());
        assert_eq!(outcome.session.status, SessionStatus::Active);
    }

    #[tokio::test]
    async fn assistant_failure_keeps_user_turn_and_draft() {
        let (service, storage, _dir) = intake(vec![Step::Fail], true).await;

        let err = service
            .handle_inbound(message("quiero un pastel de 3 pisos"))
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::CollaboratorUnavailable { .. }));
        assert!(err.is_retryable());

        let session = storage
            .find_active_session("t", "wa:5215550004")
            .await
            .unwrap()
            .unwrap();
        let turns = storage.get_turns(&session.id, None).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "quiero un pastel de 3 pisos");
        assert!(session.draft.cake_flavors.is_empty());
    }

    #[tokio::test]
    async fn assistant_timeout_is_reported_as_unavailable() {
        let (service, storage, _dir) = intake(vec![Step::Hang], true).await;
        let err = service.handle_inbound(message("hola")).await.unwrap_err();
        match err {
            FolioError::CollaboratorUnavailable { source, .. } => {
                assert!(source.unwrap().to_string().contains("timed out"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let session = storage
            .find_active_session("t", "wa:5215550004")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(storage.get_turns(&session.id, None).await.unwrap().len(), 1);
    }
}
