// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a finished draft into a numbered folio and settles its commission.

use std::sync::Arc;

use obrador_core::types::{
    AuditAction, AuditEvent, Commission, ConversationSession, Folio, NewFolio, PaymentStatus,
};
use obrador_core::{FolioError, OrderDraft, StorageAdapter};
use obrador_draft::{normalize_with, validate_for_materialization, PricingRules};
use serde::Serialize;
use tracing::info;

use crate::audit::AuditNotifier;
use crate::settlement::CommissionSettlement;

/// A persisted folio together with its settled commission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Materialization {
    pub folio: Folio,
    pub commission: Commission,
}

/// Idempotency key for a folio materialized from a conversation.
pub fn session_source_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Idempotency key for a folio submitted through the order form.
pub fn form_source_key(request_id: &str) -> String {
    format!("form:{request_id}")
}

/// Persists folios and settles their commissions as one retryable unit.
///
/// Both steps are idempotent on their own key (the folio's source key and
/// the folio number), so a caller that fails halfway simply repeats the call.
pub struct FolioMaterializer {
    storage: Arc<dyn StorageAdapter>,
    settlement: CommissionSettlement,
    audit: AuditNotifier,
    rules: PricingRules,
}

impl FolioMaterializer {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        audit: AuditNotifier,
        rules: PricingRules,
    ) -> Self {
        let settlement = CommissionSettlement::new(storage.clone(), rules.clone());
        Self {
            storage,
            settlement,
            audit,
            rules,
        }
    }

    pub fn settlement(&self) -> &CommissionSettlement {
        &self.settlement
    }

    /// Materializes the draft of a conversation session.
    ///
    /// Repeating the call for the same session returns the same folio and
    /// commission.
    pub async fn materialize(
        &self,
        session: &ConversationSession,
        actor_id: Option<&str>,
    ) -> Result<Materialization, FolioError> {
        self.persist(
            &session.tenant_id,
            session_source_key(&session.id),
            Some(session.id.clone()),
            session.draft.clone(),
            actor_id,
        )
        .await
    }

    /// Materializes a draft built directly in the order form.
    ///
    /// The draft is normalized and validated first. With a `request_id`, a
    /// double submission yields the folio created by the first one.
    pub async fn create_direct(
        &self,
        tenant_id: &str,
        draft: OrderDraft,
        request_id: Option<&str>,
        actor_id: Option<&str>,
    ) -> Result<Materialization, FolioError> {
        let draft = normalize_with(draft, &self.rules);
        let source_key = match request_id {
            Some(id) if !id.trim().is_empty() => form_source_key(id.trim()),
            _ => form_source_key(&uuid::Uuid::new_v4().to_string()),
        };
        self.persist(tenant_id, source_key, None, draft, actor_id)
            .await
    }

    async fn persist(
        &self,
        tenant_id: &str,
        source_key: String,
        session_id: Option<String>,
        order: OrderDraft,
        actor_id: Option<&str>,
    ) -> Result<Materialization, FolioError> {
        validate_for_materialization(&order)?;

        let new_folio = NewFolio {
            tenant_id: tenant_id.to_string(),
            source_key,
            session_id,
            payment_status: PaymentStatus::from_balance(order.totals.balance),
            order,
        };
        let folio = self.storage.insert_folio(&new_folio).await?;
        info!(
            tenant_id,
            folio_number = folio.folio_number,
            source_key = folio.source_key.as_str(),
            grand_total = folio.order.totals.grand_total,
            "folio materialized"
        );

        self.audit.notify(AuditEvent::new(
            actor_id.map(str::to_string),
            AuditAction::Create,
            "folio",
            folio.folio_number.to_string(),
            serde_json::json!({
                "tenantId": tenant_id,
                "sourceKey": folio.source_key,
                "grandTotal": folio.order.totals.grand_total,
            }),
        ));

        let commission = self
            .settlement
            .settle(
                tenant_id,
                folio.folio_number,
                folio.order.totals.subtotal,
                folio.order.commission_requested,
            )
            .await?;

        Ok(Materialization { folio, commission })
    }
}
