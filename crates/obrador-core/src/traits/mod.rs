// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators around the intake core.
//!
//! All adapters use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod assistant;
pub mod audit;
pub mod storage;

pub use adapter::PluginAdapter;
pub use assistant::AssistantAdapter;
pub use audit::AuditSink;
pub use storage::StorageAdapter;
