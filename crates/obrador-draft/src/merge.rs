// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding a [`DraftPatch`] into the current draft.
//!
//! Scalars keep the last known good value: a field the patch does not mention
//! is never erased. Collections the patch supplies replace the current ones
//! wholesale. Images accumulate up to [`MAX_IMAGES`].

use obrador_core::draft::{
    AdditionalItem, Complement, DeliveryMode, DraftImage, Filling, FolioType, OrderDraft, Tier,
};
use tracing::debug;

use crate::patch::DraftPatch;

/// Maximum number of reference images on one draft.
pub const MAX_IMAGES: usize = 5;

const MAX_FLAVORS: usize = 2;
const MAX_FILLINGS: usize = 2;
const MAX_PANES: usize = 3;

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub draft: OrderDraft,
    /// Images past [`MAX_IMAGES`], returned so the assistant can tell the customer.
    pub rejected_images: Vec<DraftImage>,
    /// The patch asked for an operator.
    pub needs_human: bool,
}

/// Merges `patch` into `current`. Total: never fails.
pub fn merge(current: &OrderDraft, patch: &DraftPatch) -> MergeOutcome {
    let mut draft = current.clone();

    replace(&mut draft.client_name, &patch.client_name);
    replace(&mut draft.client_phone, &patch.client_phone);
    replace(&mut draft.client_phone2, &patch.client_phone2);

    if patch.delivery_date.is_some() {
        draft.delivery_date = patch.delivery_date;
    }
    if patch.delivery_clock.is_some() {
        draft.delivery_clock = patch.delivery_clock;
    } else if patch.delivery_time.is_some() {
        draft.delivery_time = patch.delivery_time.clone();
        draft.delivery_clock = None;
    }

    apply_shape(&mut draft, patch);

    if patch.persons.is_some() {
        draft.persons = patch.persons;
    }
    replace(&mut draft.shape, &patch.shape);
    replace(&mut draft.design_description, &patch.design_description);
    replace(&mut draft.dedication, &patch.dedication);
    replace(&mut draft.accessories, &patch.accessories);

    if let Some(items) = &patch.additional_items {
        draft.additional_items = sanitize_items(items);
    }
    if let Some(complements) = &patch.complements {
        draft.complements = complements
            .iter()
            .filter(|c| **c != Complement::default())
            .cloned()
            .collect();
    }

    apply_delivery(&mut draft, patch);

    replace_copy(&mut draft.delivery_cost, patch.delivery_cost);
    replace_copy(&mut draft.base_cost, patch.base_cost);
    replace_copy(&mut draft.advance_payment, patch.advance_payment);
    replace_copy(&mut draft.is_paid_in_full, patch.is_paid_in_full);
    replace_copy(&mut draft.commission_requested, patch.commission_requested);
    replace_copy(&mut draft.has_extra_height, patch.has_extra_height);

    let rejected_images = append_images(&mut draft.images, &patch.images);
    if !rejected_images.is_empty() {
        debug!(
            rejected = rejected_images.len(),
            max = MAX_IMAGES,
            "draft image limit reached"
        );
    }

    MergeOutcome {
        draft,
        rejected_images,
        needs_human: patch.escalates(),
    }
}

fn replace(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(v.to_string());
    }
}

fn replace_copy<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Switches folio type and replaces the collections that belong to the
/// resulting type.
///
/// Only an explicit `folioType` may clear the opposite shape. A type implied
/// by the supplied collections is adopted only while the current shape is
/// still empty.
fn apply_shape(draft: &mut OrderDraft, patch: &DraftPatch) {
    let target = match patch.folio_type {
        Some(explicit) => Some(explicit),
        None => patch
            .implied_folio_type()
            .filter(|_| shape_is_empty(draft)),
    };
    if let Some(target) = target {
        if target != draft.folio_type {
            match target {
                FolioType::Normal => draft.tiers.clear(),
                FolioType::Tiered => {
                    draft.cake_flavors.clear();
                    draft.fillings.clear();
                }
            }
            draft.folio_type = target;
        }
    }

    match draft.folio_type {
        FolioType::Normal => {
            if let Some(flavors) = &patch.cake_flavors {
                draft.cake_flavors = unique_names(flavors, MAX_FLAVORS);
            }
            if let Some(fillings) = &patch.fillings {
                draft.fillings = unique_fillings(fillings, MAX_FILLINGS);
            }
            if patch.tiers.is_some() {
                debug!("ignoring tiers on a normal folio");
            }
        }
        FolioType::Tiered => {
            if let Some(tiers) = &patch.tiers {
                draft.tiers = tiers.iter().map(sanitize_tier).collect();
            }
            if patch.cake_flavors.is_some() || patch.fillings.is_some() {
                debug!("ignoring flat flavors or fillings on a tiered folio");
            }
        }
    }
}

fn shape_is_empty(draft: &OrderDraft) -> bool {
    match draft.folio_type {
        FolioType::Normal => draft.cake_flavors.is_empty() && draft.fillings.is_empty(),
        FolioType::Tiered => draft.tiers.is_empty(),
    }
}

fn apply_delivery(draft: &mut OrderDraft, patch: &DraftPatch) {
    if let Some(mode) = patch.delivery_mode {
        draft.delivery_mode = Some(mode);
    } else if draft.delivery_mode == Some(DeliveryMode::PickupInStore)
        && (patch.delivery_location.is_some() || !patch.address.is_empty())
    {
        // A destination mentioned after pickup was agreed means delivery after all.
        draft.delivery_mode = Some(DeliveryMode::StreetAddress);
    }

    replace(&mut draft.address.street, &patch.address.street);
    replace(&mut draft.address.ext_number, &patch.address.ext_number);
    replace(&mut draft.address.int_number, &patch.address.int_number);
    replace(&mut draft.address.neighborhood, &patch.address.neighborhood);
    replace(&mut draft.delivery_location, &patch.delivery_location);
}

/// Trimmed, non-empty, case-insensitively unique, first `cap` kept.
fn unique_names(names: &[String], cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cap);
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if out.len() == cap {
            break;
        }
        if !out.iter().any(|seen| seen.to_lowercase() == name.to_lowercase()) {
            out.push(name.to_string());
        }
    }
    out
}

fn unique_fillings(fillings: &[Filling], cap: usize) -> Vec<Filling> {
    let mut out: Vec<Filling> = Vec::with_capacity(cap);
    for filling in fillings {
        let name = filling.name.trim();
        if name.is_empty() || out.len() == cap {
            continue;
        }
        if !out.iter().any(|seen| seen.name.to_lowercase() == name.to_lowercase()) {
            out.push(Filling {
                name: name.to_string(),
                has_cost: filling.has_cost,
            });
        }
    }
    out
}

fn sanitize_tier(tier: &Tier) -> Tier {
    Tier {
        persons: tier.persons,
        panes: unique_names(&tier.panes, MAX_PANES),
        fillings: unique_fillings(&tier.fillings, MAX_FILLINGS),
        notes: tier
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    }
}

fn sanitize_items(items: &[AdditionalItem]) -> Vec<AdditionalItem> {
    items
        .iter()
        .filter(|item| {
            !item.name.trim().is_empty()
                && item.quantity > 0
                && item.unit_price.is_finite()
                && item.unit_price >= 0.0
        })
        .cloned()
        .collect()
}

/// Appends until the cap; returns what did not fit.
fn append_images(images: &mut Vec<DraftImage>, incoming: &[DraftImage]) -> Vec<DraftImage> {
    let mut rejected = Vec::new();
    for image in incoming {
        if image.url.is_none() && image.caption.is_none() {
            continue;
        }
        if images.len() < MAX_IMAGES {
            images.push(image.clone());
        } else {
            rejected.push(image.clone());
        }
    }
    rejected
}
