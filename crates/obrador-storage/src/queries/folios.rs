// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folio persistence and per-tenant numbering.

use obrador_core::types::{timestamp_now, Cancellation, ProductionStatus};
use obrador_core::{FolioError, OrderDraft};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use crate::database::{json_column_error, map_tr_err, parse_enum, Database};
use crate::models::{Folio, NewFolio};

const FOLIO_COLUMNS: &str = "folio_number, tenant_id, source_key, session_id, order_json, \
     production_status, payment_status, cancel_reason, cancelled_at, created_at, updated_at";

fn folio_from_row(row: &Row<'_>) -> Result<Folio, rusqlite::Error> {
    let order_json: String = row.get(4)?;
    let order: OrderDraft =
        serde_json::from_str(&order_json).map_err(|e| json_column_error(4, e))?;
    let cancel_reason: Option<String> = row.get(7)?;
    let cancelled_at: Option<String> = row.get(8)?;
    let cancellation = match (cancel_reason, cancelled_at) {
        (Some(reason), Some(cancelled_at)) => Some(Cancellation {
            reason,
            cancelled_at,
        }),
        _ => None,
    };
    Ok(Folio {
        folio_number: row.get(0)?,
        tenant_id: row.get(1)?,
        source_key: row.get(2)?,
        session_id: row.get(3)?,
        order,
        production_status: parse_enum(5, row.get(5)?)?,
        payment_status: parse_enum(6, row.get(6)?)?,
        cancellation,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Persist a folio, assigning the tenant's next number.
///
/// Runs in one IMMEDIATE transaction: the source-key lookup, the sequence bump
/// and the insert either all happen or none do. A `source_key` repeated
/// within the tenant returns the folio stored the first time and consumes no
/// number. Source keys of other tenants never match.
pub async fn insert_folio(db: &Database, folio: &NewFolio) -> Result<Folio, FolioError> {
    let order_json = serde_json::to_string(&folio.order).map_err(FolioError::persistence)?;
    let folio = folio.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing = tx
                .query_row(
                    &format!(
                        "SELECT {FOLIO_COLUMNS} FROM folios WHERE tenant_id = ?1 AND source_key = ?2"
                    ),
                    params![folio.tenant_id, folio.source_key],
                    folio_from_row,
                )
                .optional()?;
            if let Some(existing) = existing {
                tx.commit()?;
                debug!(
                    source_key = %existing.source_key,
                    folio_number = existing.folio_number,
                    "folio already materialized for source"
                );
                return Ok(existing);
            }

            let folio_number: i64 = tx.query_row(
                "INSERT INTO folio_sequences (tenant_id, last_number) VALUES (?1, 1)
                 ON CONFLICT (tenant_id) DO UPDATE SET last_number = last_number + 1
                 RETURNING last_number",
                params![folio.tenant_id],
                |row| row.get(0),
            )?;

            let now = timestamp_now();
            let production_status = ProductionStatus::New;
            tx.execute(
                "INSERT INTO folios (tenant_id, folio_number, source_key, session_id, order_json,
                     client_name, client_phone, delivery_date, delivery_time, grand_total,
                     balance, production_status, payment_status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    folio.tenant_id,
                    folio_number,
                    folio.source_key,
                    folio.session_id,
                    order_json,
                    folio.order.client_name,
                    folio.order.client_phone,
                    folio.order.delivery_date.map(|d| d.to_string()),
                    folio.order.delivery_time,
                    folio.order.totals.grand_total,
                    folio.order.totals.balance,
                    production_status.to_string(),
                    folio.payment_status.to_string(),
                    now,
                    now,
                ],
            )?;
            tx.commit()?;

            Ok(Folio {
                folio_number,
                tenant_id: folio.tenant_id,
                source_key: folio.source_key,
                session_id: folio.session_id,
                order: folio.order,
                production_status,
                payment_status: folio.payment_status,
                cancellation: None,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
        .map_err(map_tr_err::<rusqlite::Error>)
}

/// Get a folio by tenant and number.
pub async fn get_folio(
    db: &Database,
    tenant_id: &str,
    folio_number: i64,
) -> Result<Option<Folio>, FolioError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {FOLIO_COLUMNS} FROM folios WHERE tenant_id = ?1 AND folio_number = ?2"
                ),
                params![tenant_id, folio_number],
                folio_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use obrador_core::types::PaymentStatus;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn new_folio(tenant: &str, source_key: &str) -> NewFolio {
        NewFolio {
            tenant_id: tenant.to_string(),
            source_key: source_key.to_string(),
            session_id: None,
            order: OrderDraft {
                client_name: Some("Ana".into()),
                client_phone: Some("5215550001".into()),
                delivery_date: NaiveDate::from_ymd_opt(2026, 5, 10),
                cake_flavors: vec!["chocolate".into()],
                ..OrderDraft::default()
            },
            payment_status: PaymentStatus::Pending,
        }
    }

    #[tokio::test]
    async fn numbers_are_sequential_per_tenant() {
        let (db, _dir) = setup_db().await;
        let a1 = insert_folio(&db, &new_folio("a", "form:1")).await.unwrap();
        let a2 = insert_folio(&db, &new_folio("a", "form:2")).await.unwrap();
        let b1 = insert_folio(&db, &new_folio("b", "form:3")).await.unwrap();
        assert_eq!(a1.folio_number, 1);
        assert_eq!(a2.folio_number, 2);
        assert_eq!(b1.folio_number, 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeated_source_key_returns_first_folio() {
        let (db, _dir) = setup_db().await;
        let first = insert_folio(&db, &new_folio("a", "session:s1")).await.unwrap();
        let again = insert_folio(&db, &new_folio("a", "session:s1")).await.unwrap();
        assert_eq!(first, again);

        // The retry consumed no number.
        let next = insert_folio(&db, &new_folio("a", "session:s2")).await.unwrap();
        assert_eq!(next.folio_number, 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn source_key_is_scoped_to_its_tenant() {
        let (db, _dir) = setup_db().await;
        let a = insert_folio(&db, &new_folio("a", "form:req-1")).await.unwrap();

        let mut other = new_folio("b", "form:req-1");
        other.order.base_cost = 999.0;
        let b = insert_folio(&db, &other).await.unwrap();

        assert_eq!(b.tenant_id, "b");
        assert_eq!(b.order.base_cost, 999.0);
        assert_eq!(a.folio_number, 1);
        assert_eq!(b.folio_number, 1);

        let stored_a = get_folio(&db, "a", 1).await.unwrap().unwrap();
        assert_eq!(stored_a, a);
        let stored_b = get_folio(&db, "b", 1).await.unwrap().unwrap();
        assert_eq!(stored_b, b);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_inserts_never_share_a_number() {
        let (db, _dir) = setup_db().await;
        let db = std::sync::Arc::new(db);
        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                insert_folio(&db, &new_folio("a", &format!("form:{i}")))
                    .await
                    .unwrap()
                    .folio_number
            }));
        }
        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn stored_folio_roundtrips_with_flattened_order() {
        let (db, _dir) = setup_db().await;
        let created = insert_folio(&db, &new_folio("a", "form:x")).await.unwrap();
        let fetched = get_folio(&db, "a", created.folio_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.production_status, ProductionStatus::New);
        assert_eq!(fetched.order.cake_flavors, vec!["chocolate"]);
        assert!(get_folio(&db, "b", created.folio_number)
            .await
            .unwrap()
            .is_none());
        db.close().await.unwrap();
    }
}
