// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Obrador integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockAssistant`] - Mock AI assistant with pre-configured replies
//! - [`RecordingAuditSink`] / [`FailingAuditSink`] - Audit sinks for assertions and failure injection
//! - [`TestHarness`] - Full intake stack over a temp SQLite database

pub mod audit_sinks;
pub mod harness;
pub mod mock_assistant;

pub use audit_sinks::{FailingAuditSink, RecordingAuditSink};
pub use harness::{TestHarness, TEST_TENANT};
pub use mock_assistant::MockAssistant;
