// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Surcharge and commission arithmetic.
//!
//! Filling surcharge: `ceil(persons / block) * surcharge` per filling that carries a cost.
//! Commission:        `subtotal * rate / 100`, rounded up to the next multiple of 10.
//!
//! Amounts are plain `f64` pesos.

/// Tolerance absorbed before rounding up, so `50.000000000001` stays at 50.
const ROUNDING_EPSILON: f64 = 1e-9;

/// Tenant pricing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingRules {
    /// Commission as a percentage of the subtotal.
    pub commission_rate_percent: f64,
    /// Charge per surcharge block for each filling with `has_cost`.
    pub filling_surcharge: f64,
    /// Persons per surcharge block.
    pub persons_per_surcharge_block: u32,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            commission_rate_percent: 5.0,
            filling_surcharge: 30.0,
            persons_per_surcharge_block: 20,
        }
    }
}

impl PricingRules {
    /// Surcharge for a single costed filling on a cake serving `persons`.
    pub fn surcharge_for(&self, persons: u32) -> f64 {
        let block = self.persons_per_surcharge_block.max(1);
        let blocks = persons.div_ceil(block);
        f64::from(blocks) * self.filling_surcharge
    }

    /// Commission owed on `subtotal`, before rounding.
    pub fn raw_commission(&self, subtotal: f64) -> f64 {
        subtotal * self.commission_rate_percent / 100.0
    }
}

/// Rounds `amount` up to the next multiple of 10. Exact multiples are kept.
pub fn round_up_to_ten(amount: f64) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }
    ((amount / 10.0) - ROUNDING_EPSILON).ceil() * 10.0
}

/// `(raw, rounded)` commission for a subtotal.
pub fn commission_amounts(subtotal: f64, rules: &PricingRules) -> (f64, f64) {
    let raw = rules.raw_commission(subtotal);
    (raw, round_up_to_ten(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surcharge_rounds_persons_up_to_whole_blocks() {
        let rules = PricingRules::default();
        assert!((rules.surcharge_for(45) - 90.0).abs() < f64::EPSILON);
        assert!((rules.surcharge_for(40) - 60.0).abs() < f64::EPSILON);
        assert!((rules.surcharge_for(1) - 30.0).abs() < f64::EPSILON);
        assert!((rules.surcharge_for(0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_block_size_is_treated_as_one() {
        let rules = PricingRules {
            persons_per_surcharge_block: 0,
            ..PricingRules::default()
        };
        assert!((rules.surcharge_for(3) - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exact_multiple_of_ten_is_kept() {
        let (raw, rounded) = commission_amounts(1000.0, &PricingRules::default());
        assert!((raw - 50.0).abs() < f64::EPSILON);
        assert!((rounded - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fractional_commission_rounds_up() {
        let (raw, rounded) = commission_amounts(970.0, &PricingRules::default());
        assert!((raw - 48.5).abs() < f64::EPSILON);
        assert!((rounded - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn one_cent_over_moves_to_next_ten() {
        assert!((round_up_to_ten(50.01) - 60.0).abs() < f64::EPSILON);
        assert!((round_up_to_ten(0.5) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn float_noise_does_not_bump_a_multiple() {
        assert!((round_up_to_ten(50.000_000_000_01) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_and_negative_round_to_zero() {
        assert!((round_up_to_ten(0.0)).abs() < f64::EPSILON);
        assert!((round_up_to_ten(-12.0)).abs() < f64::EPSILON);
    }
}
