// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent commission settlement.
//!
//! At most one commission row ever exists per folio. The first successful
//! settlement is authoritative: a later call for the same folio returns the
//! stored row unchanged, whatever subtotal it was given.

use std::sync::Arc;

use obrador_core::types::{timestamp_now, Commission};
use obrador_core::{FolioError, StorageAdapter};
use obrador_draft::{commission_amounts, PricingRules};
use tracing::{debug, info};

/// Settles the sales commission for materialized folios.
#[derive(Clone)]
pub struct CommissionSettlement {
    storage: Arc<dyn StorageAdapter>,
    rules: PricingRules,
}

impl CommissionSettlement {
    pub fn new(storage: Arc<dyn StorageAdapter>, rules: PricingRules) -> Self {
        Self { storage, rules }
    }

    /// Returns the folio's commission, creating it on first call.
    ///
    /// Concurrent callers for the same folio all receive the same row.
    pub async fn settle(
        &self,
        tenant_id: &str,
        folio_number: i64,
        subtotal: f64,
        applied_to_customer: bool,
    ) -> Result<Commission, FolioError> {
        let (raw_amount, rounded_amount) = commission_amounts(subtotal, &self.rules);
        let candidate = Commission {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            folio_number,
            sale_total: subtotal,
            applied_to_customer,
            raw_amount,
            rounded_amount,
            created_at: timestamp_now(),
        };

        let stored = self.storage.find_or_create_commission(&candidate).await?;
        if stored.id == candidate.id {
            info!(
                tenant_id,
                folio_number,
                rounded_amount = stored.rounded_amount,
                "commission settled"
            );
        } else {
            debug!(
                tenant_id,
                folio_number,
                stored_sale_total = stored.sale_total,
                requested_sale_total = subtotal,
                "commission already settled, keeping the first settlement"
            );
        }
        Ok(stored)
    }
}
