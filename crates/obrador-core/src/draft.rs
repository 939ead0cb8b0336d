// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-progress order draft a conversation builds up turn by turn.
//!
//! Field names serialize in camelCase, which is also the vocabulary used for
//! validation errors (`cakeFlavors`, `deliveryDate`, ...).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Label stored in `delivery_location` for in-store pickup.
pub const PICKUP_IN_STORE: &str = "pickup-in-store";

/// Label stored in `delivery_location` when the customer shares a map pin.
pub const SHARED_MAP_LOCATION: &str = "customer-shares-map-location";

/// Shape of the product: a single cake, or a stacked multi-tier cake.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum FolioType {
    #[default]
    Normal,
    Tiered,
}

/// AM/PM marker of a 12-hour clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
pub enum Meridiem {
    #[strum(to_string = "AM", serialize = "A.M.")]
    Am,
    #[strum(to_string = "PM", serialize = "P.M.")]
    Pm,
}

/// A delivery time as dictated ("5:30 PM"), awaiting conversion to 24-hour form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock12 {
    pub hour: u32,
    pub minute: u32,
    pub meridiem: Meridiem,
}

/// A filling, flagged when it carries a per-person surcharge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filling {
    pub name: String,
    #[serde(default)]
    pub has_cost: bool,
}

/// One layer of a tiered cake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tier {
    pub persons: u32,
    pub panes: Vec<String>,
    pub fillings: Vec<Filling>,
    pub notes: Option<String>,
}

/// An extra line item sold with the cake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A secondary mini-order attached to the main cake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Complement {
    pub persons: Option<u32>,
    pub shape: Option<String>,
    pub flavor: Option<String>,
    pub filling: Option<String>,
    pub description: Option<String>,
}

/// A reference image for the design; `url` is `None` while the upload is pending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftImage {
    pub url: Option<String>,
    pub caption: Option<String>,
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum DeliveryMode {
    PickupInStore,
    SharedMapLocation,
    StreetAddress,
}

/// Street address components, composed into `delivery_location` by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressParts {
    pub street: Option<String>,
    pub ext_number: Option<String>,
    pub int_number: Option<String>,
    pub neighborhood: Option<String>,
}

impl AddressParts {
    pub fn is_empty(&self) -> bool {
        [
            &self.street,
            &self.ext_number,
            &self.int_number,
            &self.neighborhood,
        ]
        .iter()
        .all(|part| part.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// Money figures derived from the draft. Always recomputed, never accepted as input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DraftTotals {
    pub filling_surcharge: f64,
    pub items_total: f64,
    pub subtotal: f64,
    pub commission: f64,
    pub grand_total: f64,
    pub balance: f64,
}

/// The structured order being assembled inside a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OrderDraft {
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub client_phone2: Option<String>,

    pub delivery_date: Option<NaiveDate>,
    /// Canonical 24-hour `HH:MM:SS`.
    pub delivery_time: Option<String>,
    /// Pending 12-hour reading; consumed by the normalizer.
    pub delivery_clock: Option<Clock12>,

    pub folio_type: FolioType,
    pub persons: Option<u32>,
    pub shape: Option<String>,
    pub cake_flavors: Vec<String>,
    pub fillings: Vec<Filling>,
    pub tiers: Vec<Tier>,

    pub design_description: Option<String>,
    pub dedication: Option<String>,
    pub accessories: Option<String>,

    pub additional_items: Vec<AdditionalItem>,
    pub complements: Vec<Complement>,

    pub delivery_mode: Option<DeliveryMode>,
    pub address: AddressParts,
    pub delivery_location: Option<String>,
    pub delivery_cost: f64,

    pub base_cost: f64,
    pub advance_payment: f64,
    pub is_paid_in_full: bool,
    pub commission_requested: bool,

    pub has_extra_height: bool,

    pub images: Vec<DraftImage>,

    pub totals: DraftTotals,
}

impl OrderDraft {
    /// Total persons served: the cake's own count, or the sum over tiers.
    pub fn total_persons(&self) -> Option<u32> {
        match self.folio_type {
            FolioType::Normal => self.persons,
            FolioType::Tiered => {
                let sum: u32 = self.tiers.iter().map(|t| t.persons).sum();
                (sum > 0).then_some(sum)
            }
        }
    }
}

/// Compact view of a draft for inbox listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub folio_type: FolioType,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_time: Option<String>,
    pub persons: Option<u32>,
    pub flavors: Vec<String>,
    pub grand_total: f64,
    pub balance: f64,
}

impl From<&OrderDraft> for DraftSummary {
    fn from(draft: &OrderDraft) -> Self {
        let flavors = match draft.folio_type {
            FolioType::Normal => draft.cake_flavors.clone(),
            FolioType::Tiered => draft
                .tiers
                .iter()
                .flat_map(|t| t.panes.iter().cloned())
                .collect(),
        };
        Self {
            folio_type: draft.folio_type,
            delivery_date: draft.delivery_date,
            delivery_time: draft.delivery_time.clone(),
            persons: draft.total_persons(),
            flavors,
            grand_total: draft.totals.grand_total,
            balance: draft.totals.balance,
        }
    }
}
