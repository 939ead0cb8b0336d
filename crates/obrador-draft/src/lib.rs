// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure draft arithmetic for the Obrador order-intake framework.
//!
//! This crate provides:
//! - **Patch parsing**: Lenient conversion of untrusted assistant output into a [`DraftPatch`]
//! - **Merge engine**: Field-by-field folding of a patch into the current draft
//! - **Normalizer**: Canonical time, delivery address and recomputed totals
//! - **Pricing**: Filling surcharge and commission rounding rules
//! - **Validation**: Materialization preconditions with per-field reporting
//!
//! Nothing here performs I/O.

pub mod merge;
pub mod normalize;
pub mod patch;
pub mod pricing;
pub mod validate;

pub use merge::{merge, MergeOutcome, MAX_IMAGES};
pub use normalize::{normalize, normalize_with};
pub use patch::DraftPatch;
pub use pricing::{commission_amounts, round_up_to_ten, PricingRules};
pub use validate::{describe_missing, validate_for_materialization};
