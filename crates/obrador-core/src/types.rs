// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Obrador framework.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::draft::{DraftSummary, OrderDraft};
use crate::error::FolioError;

/// Timestamp format used for every persisted `created_at` / `updated_at`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter plugged into the intake pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Assistant,
    Storage,
    Audit,
}

// --- Conversation sessions ---

/// Lifecycle status of a conversation session.
///
/// `Completed` and `Discarded` are terminal: no transition leaves them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Discarded,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

/// Operator-facing urgency of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Alta,
    Urgente,
}

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of a session's append-only chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: String,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
}

/// A conversation that is turning free-form messages into an order draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub id: String,
    pub tenant_id: String,
    /// Transport-level key (e.g. a WhatsApp chat id) mapping inbound messages here.
    pub session_key: String,
    pub customer_phone: String,
    /// Denormalized from the draft for listings.
    pub customer_name: Option<String>,
    pub status: SessionStatus,
    pub priority: Priority,
    pub needs_human: bool,
    pub draft: OrderDraft,
    pub discard_reason: Option<String>,
    /// Set once the session completed into a folio.
    pub folio_number: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ConversationSession {
    /// Opens a fresh active session with an empty draft.
    pub fn open(
        id: String,
        tenant_id: String,
        session_key: String,
        customer_phone: String,
        customer_name: Option<String>,
    ) -> Self {
        let now = timestamp_now();
        let draft = OrderDraft {
            client_name: customer_name.clone(),
            client_phone: Some(customer_phone.clone()),
            ..OrderDraft::default()
        };
        Self {
            id,
            tenant_id,
            session_key,
            customer_phone,
            customer_name,
            status: SessionStatus::Active,
            priority: Priority::Normal,
            needs_human: false,
            draft,
            discard_reason: None,
            folio_number: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Fails with [`FolioError::SessionClosed`] unless the session is active.
    pub fn ensure_active(&self) -> Result<(), FolioError> {
        if self.status.is_terminal() {
            return Err(FolioError::SessionClosed {
                session_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Replaces the draft and refreshes the denormalized customer name.
    pub fn replace_draft(&mut self, draft: OrderDraft) -> Result<(), FolioError> {
        self.ensure_active()?;
        if let Some(name) = draft.client_name.as_ref() {
            self.customer_name = Some(name.clone());
        }
        self.draft = draft;
        self.touch();
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) -> Result<(), FolioError> {
        self.ensure_active()?;
        self.priority = priority;
        self.touch();
        Ok(())
    }

    pub fn set_needs_human(&mut self, needs_human: bool) -> Result<(), FolioError> {
        self.ensure_active()?;
        self.needs_human = needs_human;
        self.touch();
        Ok(())
    }

    /// `active -> completed`. Irreversible.
    pub fn complete(&mut self, folio_number: i64) -> Result<(), FolioError> {
        self.ensure_active()?;
        self.status = SessionStatus::Completed;
        self.folio_number = Some(folio_number);
        self.needs_human = false;
        self.touch();
        Ok(())
    }

    /// `active -> discarded`. Irreversible.
    pub fn discard(&mut self, reason: impl Into<String>) -> Result<(), FolioError> {
        self.ensure_active()?;
        self.status = SessionStatus::Discarded;
        self.discard_reason = Some(reason.into());
        self.needs_human = false;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = timestamp_now();
    }
}

/// A session together with its full transcript (single-session fetch).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub session: ConversationSession,
    pub chat_history: Vec<ChatTurn>,
}

/// One row of the operator inbox. Never carries the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub id: String,
    pub customer_name: Option<String>,
    pub customer_phone: String,
    pub priority: Priority,
    pub needs_human: bool,
    pub draft_summary: DraftSummary,
    pub updated_at: String,
}

impl From<&ConversationSession> for InboxEntry {
    fn from(session: &ConversationSession) -> Self {
        Self {
            id: session.id.clone(),
            customer_name: session.customer_name.clone(),
            customer_phone: session.customer_phone.clone(),
            priority: session.priority,
            needs_human: session.needs_human,
            draft_summary: DraftSummary::from(&session.draft),
            updated_at: session.updated_at.clone(),
        }
    }
}

// --- Folios and commissions ---

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    #[default]
    New,
    InProduction,
    Ready,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    /// `Paid` once nothing is owed.
    pub fn from_balance(balance: f64) -> Self {
        if balance <= 0.0 {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        }
    }
}

/// Cancellation metadata on a folio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_at: String,
}

/// A folio about to be persisted; the storage layer assigns its number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFolio {
    pub tenant_id: String,
    /// Idempotency key of the request that produced the folio
    /// (`session:<id>` or `form:<request-id>`).
    pub source_key: String,
    pub session_id: Option<String>,
    pub order: OrderDraft,
    pub payment_status: PaymentStatus,
}

/// The permanent, staff-visible order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folio {
    pub folio_number: i64,
    pub tenant_id: String,
    pub source_key: String,
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub order: OrderDraft,
    pub production_status: ProductionStatus,
    pub payment_status: PaymentStatus,
    pub cancellation: Option<Cancellation>,
    pub created_at: String,
    pub updated_at: String,
}

/// The sales commission settled for one folio. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: String,
    pub tenant_id: String,
    pub folio_number: i64,
    pub sale_total: f64,
    pub applied_to_customer: bool,
    pub raw_amount: f64,
    pub rounded_amount: f64,
    pub created_at: String,
}

// --- Audit ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    UpdateStatus,
    Finalize,
    Discard,
}

/// A state change reported to the audit sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl AuditEvent {
    pub fn new(
        actor_id: Option<String>,
        action: AuditAction,
        entity_type: &str,
        entity_id: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            actor_id,
            action,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.into(),
            metadata,
            created_at: timestamp_now(),
        }
    }
}

// --- Collaborator payloads ---

/// A message handed over by a transport adapter (WhatsApp, dictation, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub session_key: String,
    pub customer_phone: String,
    pub customer_name: Option<String>,
    pub text: String,
}

/// Input to the AI assistant for one turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    pub session_id: String,
    pub chat_history: Vec<ChatTurn>,
    pub draft: OrderDraft,
    pub latest_message: String,
}

/// The assistant's answer: a reply, optionally with extracted fields and a
/// finalize intent.
///
/// `patch` is the raw model output. It is untrusted and parsed leniently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub text: String,
    #[serde(default)]
    pub patch: Option<serde_json::Value>,
    #[serde(default)]
    pub finalize: bool,
}

impl AssistantReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_patch(text: impl Into<String>, patch: serde_json::Value) -> Self {
        Self {
            text: text.into(),
            patch: Some(patch),
            finalize: false,
        }
    }
}
