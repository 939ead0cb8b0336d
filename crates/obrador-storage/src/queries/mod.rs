// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod audit;
pub mod commissions;
pub mod folios;
pub mod sessions;
pub mod turns;
