// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonicalization of a draft: 24-hour delivery time, delivery address and
//! recomputed totals.
//!
//! `normalize(normalize(d)) == normalize(d)` for every draft. Totals are
//! derived from their inputs on every pass and never read back.

use chrono::NaiveTime;
use obrador_core::draft::{
    AddressParts, Clock12, DeliveryMode, DraftTotals, FolioType, Meridiem, OrderDraft,
    PICKUP_IN_STORE, SHARED_MAP_LOCATION,
};

use crate::pricing::{round_up_to_ten, PricingRules};

/// Normalizes with the default pricing rules.
pub fn normalize(draft: OrderDraft) -> OrderDraft {
    normalize_with(draft, &PricingRules::default())
}

/// Normalizes with tenant-specific pricing rules.
pub fn normalize_with(mut draft: OrderDraft, rules: &PricingRules) -> OrderDraft {
    normalize_time(&mut draft);
    enforce_shape(&mut draft);
    normalize_delivery(&mut draft);
    recompute_totals(&mut draft, rules);
    draft
}

/// `12 AM -> 00`, `12 PM -> 12`, other PM hours `+12`. `None` when out of range.
pub fn to_24_hour(clock: Clock12) -> Option<String> {
    if !(1..=12).contains(&clock.hour) || clock.minute >= 60 {
        return None;
    }
    let hour = match (clock.hour, clock.meridiem) {
        (12, Meridiem::Am) => 0,
        (12, Meridiem::Pm) => 12,
        (h, Meridiem::Am) => h,
        (h, Meridiem::Pm) => h + 12,
    };
    Some(format!("{hour:02}:{:02}:00", clock.minute))
}

/// Parses `H:MM` or `HH:MM:SS` and renders it as `HH:MM:SS`.
pub(crate) fn canonical_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
        .map(|t| t.format("%H:%M:%S").to_string())
}

fn normalize_time(draft: &mut OrderDraft) {
    if let Some(clock) = draft.delivery_clock.take() {
        if let Some(time) = to_24_hour(clock) {
            draft.delivery_time = Some(time);
        }
    }
    draft.delivery_time = draft.delivery_time.as_deref().and_then(canonical_time);
}

/// Only the collections of the current folio type survive.
fn enforce_shape(draft: &mut OrderDraft) {
    match draft.folio_type {
        FolioType::Normal => draft.tiers.clear(),
        FolioType::Tiered => {
            draft.cake_flavors.clear();
            draft.fillings.clear();
        }
    }
}

/// `street[, ext][, Int. int][, Col. neighborhood]`, skipping blank parts.
pub fn compose_address(parts: &AddressParts) -> Option<String> {
    let clean = |part: &Option<String>| {
        part.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let pieces: Vec<String> = [
        clean(&parts.street),
        clean(&parts.ext_number),
        clean(&parts.int_number).map(|n| format!("Int. {n}")),
        clean(&parts.neighborhood).map(|n| format!("Col. {n}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    (!pieces.is_empty()).then(|| pieces.join(", "))
}

fn normalize_delivery(draft: &mut OrderDraft) {
    draft.delivery_cost = draft.delivery_cost.max(0.0);

    match draft.delivery_mode {
        Some(DeliveryMode::PickupInStore) => {
            draft.delivery_location = Some(PICKUP_IN_STORE.to_string());
            draft.delivery_cost = 0.0;
            draft.address = AddressParts::default();
        }
        Some(DeliveryMode::SharedMapLocation) => {
            let location = match compose_address(&draft.address) {
                Some(composed) => format!("{SHARED_MAP_LOCATION} | {composed}"),
                None => match draft.delivery_location.as_deref() {
                    Some(text) if text.starts_with(SHARED_MAP_LOCATION) => text.to_string(),
                    Some(text) if text != PICKUP_IN_STORE => {
                        format!("{SHARED_MAP_LOCATION} | {text}")
                    }
                    _ => SHARED_MAP_LOCATION.to_string(),
                },
            };
            draft.delivery_location = Some(location);
        }
        Some(DeliveryMode::StreetAddress) | None => {
            if let Some(composed) = compose_address(&draft.address) {
                draft.delivery_location = Some(composed);
            } else if draft.delivery_mode.is_some() {
                draft.delivery_location = draft
                    .delivery_location
                    .take()
                    .and_then(|text| strip_mode_label(&text));
            }
        }
    }
}

/// Free text left after removing a pickup or shared-location label.
fn strip_mode_label(text: &str) -> Option<String> {
    let mut rest = text.trim();
    while let Some(after) = rest
        .strip_prefix(SHARED_MAP_LOCATION)
        .and_then(|after| after.trim_start().strip_prefix('|'))
    {
        rest = after.trim();
    }
    if rest.is_empty() || rest == PICKUP_IN_STORE || rest == SHARED_MAP_LOCATION {
        return None;
    }
    Some(rest.to_string())
}

fn recompute_totals(draft: &mut OrderDraft, rules: &PricingRules) {
    draft.base_cost = draft.base_cost.max(0.0);
    draft.advance_payment = draft.advance_payment.max(0.0);

    let filling_surcharge = match draft.folio_type {
        FolioType::Normal => {
            let persons = draft.persons.unwrap_or(0);
            draft
                .fillings
                .iter()
                .filter(|f| f.has_cost)
                .map(|_| rules.surcharge_for(persons))
                .sum()
        }
        FolioType::Tiered => 0.0,
    };

    let items_total: f64 = draft
        .additional_items
        .iter()
        .map(|item| f64::from(item.quantity) * item.unit_price)
        .sum();

    let subtotal = draft.base_cost + draft.delivery_cost + items_total + filling_surcharge;
    let commission = if draft.commission_requested {
        round_up_to_ten(rules.raw_commission(subtotal))
    } else {
        0.0
    };
    let grand_total = subtotal + commission;

    if draft.is_paid_in_full {
        draft.advance_payment = grand_total;
    }

    draft.totals = DraftTotals {
        filling_surcharge,
        items_total,
        subtotal,
        commission,
        grand_total,
        balance: grand_total - draft.advance_payment,
    };
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::NaiveDate;
    use obrador_core::draft::{AdditionalItem, Filling};
    use proptest::prelude::*;

    fn arb_meridiem() -> impl Strategy<Value = Meridiem> {
        prop_oneof![Just(Meridiem::Am), Just(Meridiem::Pm)]
    }

    fn arb_clock() -> impl Strategy<Value = Option<Clock12>> {
        proptest::option::of((0u32..15, 0u32..65, arb_meridiem()).prop_map(
            |(hour, minute, meridiem)| Clock12 {
                hour,
                minute,
                meridiem,
            },
        ))
    }

    fn arb_mode() -> impl Strategy<Value = Option<DeliveryMode>> {
        proptest::option::of(prop_oneof![
            Just(DeliveryMode::PickupInStore),
            Just(DeliveryMode::SharedMapLocation),
            Just(DeliveryMode::StreetAddress),
        ])
    }

    fn arb_part() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z0-9 ]{0,8}")
    }

    fn arb_draft() -> impl Strategy<Value = OrderDraft> {
        (
            (
                arb_clock(),
                proptest::option::of("[0-9]{1,2}:[0-9]{2}"),
                any::<bool>(),
                proptest::option::of(0u32..200),
                proptest::collection::vec(("[a-z]{1,6}", any::<bool>()), 0..3),
            ),
            (
                arb_mode(),
                (arb_part(), arb_part(), arb_part(), arb_part()),
                proptest::option::of("[a-z ]{0,12}"),
                0.0f64..500.0,
            ),
            (
                0.0f64..5000.0,
                0.0f64..5000.0,
                any::<bool>(),
                any::<bool>(),
                proptest::collection::vec((1u32..5, 0.0f64..100.0), 0..3),
            ),
        )
            .prop_map(
                |(
                    (clock, time, tiered, persons, fillings),
                    (mode, (street, ext, int, nb), location, delivery_cost),
                    (base, advance, paid, commission, items),
                )| OrderDraft {
                    delivery_date: NaiveDate::from_ymd_opt(2026, 6, 1),
                    delivery_clock: clock,
                    delivery_time: time,
                    folio_type: if tiered {
                        FolioType::Tiered
                    } else {
                        FolioType::Normal
                    },
                    persons,
                    fillings: fillings
                        .into_iter()
                        .map(|(name, has_cost)| Filling { name, has_cost })
                        .collect(),
                    delivery_mode: mode,
                    address: AddressParts {
                        street,
                        ext_number: ext,
                        int_number: int,
                        neighborhood: nb,
                    },
                    delivery_location: location,
                    delivery_cost,
                    base_cost: base,
                    advance_payment: advance,
                    is_paid_in_full: paid,
                    commission_requested: commission,
                    additional_items: items
                        .into_iter()
                        .map(|(quantity, unit_price)| AdditionalItem {
                            name: "extra".into(),
                            quantity,
                            unit_price,
                        })
                        .collect(),
                    ..OrderDraft::default()
                },
            )
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(draft in arb_draft()) {
            let once = normalize(draft);
            let twice = normalize(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn paid_in_full_always_leaves_zero_balance(draft in arb_draft()) {
            let mut draft = draft;
            draft.is_paid_in_full = true;
            let out = normalize(draft);
            prop_assert_eq!(out.advance_payment, out.totals.grand_total);
            prop_assert_eq!(out.totals.balance, 0.0);
        }

        #[test]
        fn commission_is_a_multiple_of_ten(draft in arb_draft()) {
            let out = normalize(draft);
            prop_assert_eq!(out.totals.commission % 10.0, 0.0);
        }
    }
}
