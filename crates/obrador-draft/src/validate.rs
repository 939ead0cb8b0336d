// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preconditions for turning a draft into a folio.

use obrador_core::draft::{FolioType, OrderDraft};
use obrador_core::FolioError;

/// Checks that `draft` can be materialized.
///
/// Every failing field is reported at once, by its camelCase name:
/// `clientName`, `clientPhone`, `deliveryDate`, plus `cakeFlavors` for normal
/// folios or `tiers` for tiered ones.
pub fn validate_for_materialization(draft: &OrderDraft) -> Result<(), FolioError> {
    let mut fields = Vec::new();

    if is_blank(draft.client_name.as_deref()) {
        fields.push("clientName");
    }
    if is_blank(draft.client_phone.as_deref()) {
        fields.push("clientPhone");
    }
    if draft.delivery_date.is_none() {
        fields.push("deliveryDate");
    }
    match draft.folio_type {
        FolioType::Normal => {
            if draft.cake_flavors.iter().all(|f| f.trim().is_empty()) {
                fields.push("cakeFlavors");
            }
        }
        FolioType::Tiered => {
            if !draft.tiers.iter().any(|t| t.persons > 0) {
                fields.push("tiers");
            }
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(FolioError::ValidationFailed {
            fields: fields.into_iter().map(String::from).collect(),
        })
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn field_label(field: &str) -> &str {
    match field {
        "clientName" => "nombre del cliente",
        "clientPhone" => "teléfono del cliente",
        "deliveryDate" => "fecha de entrega",
        "cakeFlavors" => "sabor del pan",
        "tiers" => "pisos del pastel con número de personas",
        other => other,
    }
}

/// Customer-facing sentence listing the missing fields, in Spanish.
pub fn describe_missing(fields: &[String]) -> String {
    let labels: Vec<&str> = fields.iter().map(|f| field_label(f)).collect();
    match labels.as_slice() {
        [] => String::new(),
        [only] => format!("Falta un dato para crear el folio: {only}."),
        [init @ .., last] => format!(
            "Faltan datos para crear el folio: {} y {last}.",
            init.join(", ")
        ),
    }
}
