// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commission rows, at most one per folio.

use obrador_core::FolioError;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::database::{map_tr_err, Database};
use crate::models::Commission;

const COMMISSION_COLUMNS: &str = "id, tenant_id, folio_number, sale_total, applied_to_customer, \
     raw_amount, rounded_amount, created_at";

fn commission_from_row(row: &Row<'_>) -> Result<Commission, rusqlite::Error> {
    Ok(Commission {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        folio_number: row.get(2)?,
        sale_total: row.get(3)?,
        applied_to_customer: row.get(4)?,
        raw_amount: row.get(5)?,
        rounded_amount: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Insert `candidate` unless a commission already exists for its folio, then
/// return whichever row is stored.
///
/// `INSERT OR IGNORE` against `UNIQUE (tenant_id, folio_number)` makes the
/// creation atomic: of two racing callers exactly one row survives, and both
/// read it back.
pub async fn find_or_create_commission(
    db: &Database,
    candidate: &Commission,
) -> Result<Commission, FolioError> {
    let candidate = candidate.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT OR IGNORE INTO commissions (id, tenant_id, folio_number, sale_total,
                     applied_to_customer, raw_amount, rounded_amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    candidate.id,
                    candidate.tenant_id,
                    candidate.folio_number,
                    candidate.sale_total,
                    candidate.applied_to_customer,
                    candidate.raw_amount,
                    candidate.rounded_amount,
                    candidate.created_at,
                ],
            )?;
            let stored = tx.query_row(
                &format!(
                    "SELECT {COMMISSION_COLUMNS} FROM commissions
                     WHERE tenant_id = ?1 AND folio_number = ?2"
                ),
                params![candidate.tenant_id, candidate.folio_number],
                commission_from_row,
            )?;
            tx.commit()?;
            Ok(stored)
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

/// Get the commission settled for a folio, if any.
pub async fn get_commission(
    db: &Database,
    tenant_id: &str,
    folio_number: i64,
) -> Result<Option<Commission>, FolioError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COMMISSION_COLUMNS} FROM commissions
                     WHERE tenant_id = ?1 AND folio_number = ?2"
                ),
                params![tenant_id, folio_number],
                commission_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of commission rows for a folio. Used to check the one-row invariant.
pub async fn count_for_folio(
    db: &Database,
    tenant_id: &str,
    folio_number: i64,
) -> Result<i64, FolioError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM commissions WHERE tenant_id = ?1 AND folio_number = ?2",
                params![tenant_id, folio_number],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
