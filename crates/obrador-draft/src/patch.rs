// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lenient parsing of assistant extractions into a typed [`DraftPatch`].
//!
//! The assistant's JSON is untrusted. Every field is optional, keys are
//! accepted in camelCase or snake_case (plus a few Spanish aliases), numbers
//! may arrive as strings, and anything that does not parse is dropped.
//! Parsing never fails.

use std::str::FromStr;

use chrono::NaiveDate;
use obrador_core::draft::{
    AdditionalItem, AddressParts, Clock12, Complement, DeliveryMode, DraftImage, Filling,
    FolioType, Meridiem, Tier, PICKUP_IN_STORE, SHARED_MAP_LOCATION,
};
use serde_json::Value;
use tracing::debug;

use crate::normalize::canonical_time;

/// A partial update extracted from one conversational turn.
///
/// `None` (or an empty `images` list) means "not mentioned". Collection
/// fields that are `Some` replace the draft's collection wholesale, even
/// when empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftPatch {
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub client_phone2: Option<String>,

    pub delivery_date: Option<NaiveDate>,
    /// Canonical 24-hour `HH:MM:SS`, when the assistant gave one.
    pub delivery_time: Option<String>,
    /// 12-hour reading, when the assistant gave one.
    pub delivery_clock: Option<Clock12>,

    pub folio_type: Option<FolioType>,
    pub persons: Option<u32>,
    pub shape: Option<String>,
    pub cake_flavors: Option<Vec<String>>,
    pub fillings: Option<Vec<Filling>>,
    pub tiers: Option<Vec<Tier>>,

    pub design_description: Option<String>,
    pub dedication: Option<String>,
    pub accessories: Option<String>,

    pub additional_items: Option<Vec<AdditionalItem>>,
    pub complements: Option<Vec<Complement>>,

    pub delivery_mode: Option<DeliveryMode>,
    pub address: AddressParts,
    pub delivery_location: Option<String>,
    pub delivery_cost: Option<f64>,

    pub base_cost: Option<f64>,
    pub advance_payment: Option<f64>,
    pub is_paid_in_full: Option<bool>,
    pub commission_requested: Option<bool>,
    pub has_extra_height: Option<bool>,

    /// New images to append.
    pub images: Vec<DraftImage>,

    /// Points the assistant could not resolve on its own.
    pub ambiguities: Vec<String>,
    /// The assistant asked for an operator.
    pub needs_human: bool,
}

impl DraftPatch {
    /// Parses an assistant patch. Non-object input yields an empty patch.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            debug!(kind = json_kind(value), "ignoring non-object draft patch");
            return Self::default();
        }

        let (delivery_time, delivery_clock) = parse_delivery_time(value);
        let (mut delivery_mode, delivery_location) = parse_location(value);
        if let Some(mode) = value_str(value, &["deliveryMode", "delivery_mode", "deliveryType"])
            .and_then(|s| parse_delivery_mode(&s))
        {
            delivery_mode = Some(mode);
        }

        Self {
            client_name: value_str(value, &["clientName", "client_name", "customerName"]),
            client_phone: value_str(value, &["clientPhone", "client_phone", "phone"]),
            client_phone2: value_str(value, &["clientPhone2", "client_phone2", "phone2"]),

            delivery_date: value_str(value, &["deliveryDate", "delivery_date", "date"])
                .and_then(|s| parse_date(&s)),
            delivery_time,
            delivery_clock,

            folio_type: value_str(value, &["folioType", "folio_type", "type"])
                .and_then(|s| parse_folio_type(&s)),
            persons: value_u32(value, &["persons", "personas", "servings"]).filter(|p| *p > 0),
            shape: value_str(value, &["shape", "forma"]),
            cake_flavors: value_strings(value, &["cakeFlavors", "cake_flavors", "flavors"]),
            fillings: value_array(value, &["fillings", "rellenos"]).map(|a| parse_fillings(a)),
            tiers: value_array(value, &["tiers", "pisos"]).map(|a| parse_tiers(a)),

            design_description: value_str(
                value,
                &["designDescription", "design_description", "design"],
            ),
            dedication: value_str(value, &["dedication", "dedicatoria"]),
            accessories: value_str(value, &["accessories", "accesorios"]),

            additional_items: value_array(value, &["additionalItems", "additional_items"])
                .map(|a| parse_items(a)),
            complements: value_array(value, &["complements", "complementos"])
                .map(|a| parse_complements(a)),

            delivery_mode,
            address: parse_address(value),
            delivery_location,
            delivery_cost: value_money(value, &["deliveryCost", "delivery_cost"]),

            base_cost: value_money(value, &["baseCost", "base_cost", "price"]),
            advance_payment: value_money(value, &["advancePayment", "advance_payment", "anticipo"]),
            is_paid_in_full: value_bool(value, &["isPaidInFull", "is_paid_in_full", "paidInFull"]),
            commission_requested: value_bool(
                value,
                &["commissionRequested", "commission_requested", "applyCommission"],
            ),
            has_extra_height: value_bool(value, &["hasExtraHeight", "has_extra_height"]),

            images: value_array(value, &["images", "imagenes"])
                .map(|a| parse_images(a))
                .unwrap_or_default(),

            ambiguities: value_strings(value, &["ambiguities", "ambiguous"]).unwrap_or_default(),
            needs_human: value_bool(value, &["needsHuman", "needs_human"]).unwrap_or(false),
        }
    }

    /// Whether this turn should be escalated to an operator.
    pub fn escalates(&self) -> bool {
        self.needs_human || !self.ambiguities.is_empty()
    }

    /// The folio type implied by the collections the patch supplies, when it
    /// names none explicitly.
    pub fn implied_folio_type(&self) -> Option<FolioType> {
        if self.folio_type.is_some() {
            return self.folio_type;
        }
        let has_tiers = self.tiers.as_ref().is_some_and(|t| !t.is_empty());
        let has_flat = self.cake_flavors.as_ref().is_some_and(|f| !f.is_empty())
            || self.fillings.as_ref().is_some_and(|f| !f.is_empty());
        match (has_tiers, has_flat) {
            (true, false) => Some(FolioType::Tiered),
            (false, true) => Some(FolioType::Normal),
            _ => None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// --- Scalar helpers ---

fn value_str(v: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match v.get(*key) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn as_f64(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn value_f64(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_f64))
}

fn value_money(v: &Value, keys: &[&str]) -> Option<f64> {
    value_f64(v, keys).filter(|n| *n >= 0.0)
}

fn as_u32(v: &Value) -> Option<u32> {
    let n = as_f64(v)?;
    if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return None;
    }
    Some(n as u32)
}

fn value_u32(v: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_u32))
}

fn value_bool(v: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| match v.get(*key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "si" | "sí" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn value_array<'a>(v: &'a Value, keys: &[&str]) -> Option<&'a [Value]> {
    keys.iter()
        .find_map(|key| v.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
}

/// A string list, also accepting a lone string.
fn value_strings(v: &Value, keys: &[&str]) -> Option<Vec<String>> {
    for key in keys {
        match v.get(*key) {
            Some(Value::Array(items)) => {
                return Some(
                    items
                        .iter()
                        .filter_map(|item| match item {
                            Value::String(s) => Some(s.trim().to_string()),
                            Value::Object(_) => value_str(item, &["name", "nombre"]),
                            _ => None,
                        })
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return Some(vec![s.trim().to_string()]);
            }
            _ => {}
        }
    }
    None
}

// --- Field parsers ---

fn parse_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn parse_folio_type(s: &str) -> Option<FolioType> {
    match s.trim().to_lowercase().as_str() {
        "normal" | "sencillo" => Some(FolioType::Normal),
        "tiered" | "special" | "especial" | "pisos" | "tiers" => Some(FolioType::Tiered),
        _ => None,
    }
}

fn parse_delivery_mode(s: &str) -> Option<DeliveryMode> {
    if let Ok(mode) = DeliveryMode::from_str(s) {
        return Some(mode);
    }
    match s.trim().to_lowercase().as_str() {
        "pickup" | "store" | "tienda" | "recoger" | "pickup-in-store" => {
            Some(DeliveryMode::PickupInStore)
        }
        "map" | "pin" | "shared-map" | "ubicacion" | "customer-shares-map-location" => {
            Some(DeliveryMode::SharedMapLocation)
        }
        "address" | "street" | "street-address" | "domicilio" => {
            Some(DeliveryMode::StreetAddress)
        }
        _ => None,
    }
}

/// Reads `deliveryTime` as either a 12-hour or a 24-hour reading, falling back
/// to a `deliveryClock` object or flat hour/minute/period keys.
fn parse_delivery_time(v: &Value) -> (Option<String>, Option<Clock12>) {
    if let Some(raw) = value_str(v, &["deliveryTime", "delivery_time", "time"]) {
        match parse_time_text(&raw) {
            Some(TimeReading::Clock(clock)) => return (None, Some(clock)),
            Some(TimeReading::Canonical(time)) => return (Some(time), None),
            None => debug!(raw = %raw, "ignoring unparseable delivery time"),
        }
    }
    let clock = v
        .get("deliveryClock")
        .or_else(|| v.get("delivery_clock"))
        .and_then(|c| clock_from_parts(c, &["hour"], &["minute"], &["period", "meridiem"]))
        .or_else(|| {
            clock_from_parts(
                v,
                &["deliveryHour", "delivery_hour"],
                &["deliveryMinute", "delivery_minute"],
                &["deliveryPeriod", "delivery_period"],
            )
        });
    (None, clock)
}

enum TimeReading {
    Clock(Clock12),
    Canonical(String),
}

fn parse_time_text(raw: &str) -> Option<TimeReading> {
    let compact: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();

    let (digits, meridiem) = if let Some(rest) = compact.strip_suffix("am") {
        (rest, Some(Meridiem::Am))
    } else if let Some(rest) = compact.strip_suffix("pm") {
        (rest, Some(Meridiem::Pm))
    } else {
        (compact.trim_end_matches("hrs").trim_end_matches('h'), None)
    };

    match meridiem {
        Some(meridiem) => {
            let mut parts = digits.split(':');
            let hour: u32 = parts.next()?.parse().ok()?;
            let minute: u32 = match parts.next() {
                Some(m) => m.parse().ok()?,
                None => 0,
            };
            let clock = Clock12 {
                hour,
                minute,
                meridiem,
            };
            valid_clock(&clock).then_some(TimeReading::Clock(clock))
        }
        None if !digits.contains(':') => {
            let hour: u32 = digits.parse().ok()?;
            (hour < 24).then(|| TimeReading::Canonical(format!("{hour:02}:00:00")))
        }
        None => canonical_time(digits).map(TimeReading::Canonical),
    }
}

fn clock_from_parts(
    v: &Value,
    hour_keys: &[&str],
    minute_keys: &[&str],
    period_keys: &[&str],
) -> Option<Clock12> {
    let hour = value_u32(v, hour_keys)?;
    let minute = value_u32(v, minute_keys).unwrap_or(0);
    let meridiem = value_str(v, period_keys).and_then(|p| Meridiem::from_str(&p).ok())?;
    let clock = Clock12 {
        hour,
        minute,
        meridiem,
    };
    valid_clock(&clock).then_some(clock)
}

fn valid_clock(clock: &Clock12) -> bool {
    (1..=12).contains(&clock.hour) && clock.minute < 60
}

/// Splits `deliveryLocation` into a mode (for the two fixed labels) or free text.
fn parse_location(v: &Value) -> (Option<DeliveryMode>, Option<String>) {
    let text = value_str(v, &["deliveryLocation", "delivery_location"])
        .or_else(|| v.get("address").and_then(Value::as_str).map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty());
    match text {
        Some(t) if t.eq_ignore_ascii_case(PICKUP_IN_STORE) => {
            (Some(DeliveryMode::PickupInStore), None)
        }
        Some(t) if t.eq_ignore_ascii_case(SHARED_MAP_LOCATION) => {
            (Some(DeliveryMode::SharedMapLocation), None)
        }
        other => (None, other),
    }
}

fn parse_address(v: &Value) -> AddressParts {
    let source = match v.get("address") {
        Some(nested @ Value::Object(_)) => nested,
        _ => v,
    };
    AddressParts {
        street: value_str(source, &["street", "calle"]),
        ext_number: value_str(source, &["extNumber", "ext_number", "exteriorNumber", "numExt"]),
        int_number: value_str(source, &["intNumber", "int_number", "interiorNumber", "numInt"]),
        neighborhood: value_str(source, &["neighborhood", "colonia"]),
    }
}

fn parse_fillings(items: &[Value]) -> Vec<Filling> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(Filling {
                name: s.trim().to_string(),
                has_cost: false,
            }),
            Value::Object(_) => Some(Filling {
                name: value_str(item, &["name", "nombre", "filling"])?,
                has_cost: value_bool(item, &["hasCost", "has_cost", "costo"]).unwrap_or(false),
            }),
            _ => None,
        })
        .filter(|f| !f.name.is_empty())
        .collect()
}

fn parse_tiers(items: &[Value]) -> Vec<Tier> {
    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| Tier {
            persons: value_u32(item, &["persons", "personas"]).unwrap_or(0),
            panes: value_strings(item, &["panes", "flavors", "pan"]).unwrap_or_default(),
            fillings: value_array(item, &["fillings", "rellenos"])
                .map(parse_fillings)
                .unwrap_or_default(),
            notes: value_str(item, &["notes", "notas"]),
        })
        .collect()
}

fn parse_items(items: &[Value]) -> Vec<AdditionalItem> {
    items
        .iter()
        .filter_map(|item| {
            Some(AdditionalItem {
                name: value_str(item, &["name", "nombre"])?,
                quantity: value_u32(item, &["quantity", "qty", "cantidad"]).unwrap_or(1),
                unit_price: value_f64(item, &["unitPrice", "unit_price", "price", "precio"])
                    .unwrap_or(0.0),
            })
        })
        .collect()
}

fn parse_complements(items: &[Value]) -> Vec<Complement> {
    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| Complement {
            persons: value_u32(item, &["persons", "personas"]).filter(|p| *p > 0),
            shape: value_str(item, &["shape", "forma"]),
            flavor: value_str(item, &["flavor", "sabor"]),
            filling: value_str(item, &["filling", "relleno"]),
            description: value_str(item, &["description", "descripcion"]),
        })
        .collect()
}

fn parse_images(items: &[Value]) -> Vec<DraftImage> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(DraftImage {
                url: Some(s.trim().to_string()),
                caption: None,
            }),
            Value::Object(_) => Some(DraftImage {
                url: value_str(item, &["url", "src"]),
                caption: value_str(item, &["caption", "descripcion"]),
            }),
            _ => None,
        })
        .collect()
}
