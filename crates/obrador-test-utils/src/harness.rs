// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete intake stack with a mock assistant,
//! a recording audit sink and a temp SQLite database. Provides
//! `send_message()` to drive the full inbound pipeline in tests.

use std::sync::Arc;

use obrador_config::model::{IntakeConfig, PricingConfig, StorageConfig};
use obrador_core::types::{AssistantReply, InboundMessage};
use obrador_core::{AuditSink, FolioError, StorageAdapter};
use obrador_intake::{
    pricing_rules, AuditNotifier, InboundOutcome, InboxTriage, IntakeService, SessionService,
};
use obrador_storage::SqliteStorage;

use crate::audit_sinks::RecordingAuditSink;
use crate::mock_assistant::MockAssistant;

/// Tenant every harness operates on.
pub const TEST_TENANT: &str = "test-tenant";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<AssistantReply>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    pricing: PricingConfig,
    intake: IntakeConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            audit_sink: None,
            pricing: PricingConfig::default(),
            intake: IntakeConfig {
                assistant_timeout_secs: 5,
                auto_finalize: true,
            },
        }
    }

    /// Set mock assistant replies.
    pub fn with_replies(mut self, replies: Vec<AssistantReply>) -> Self {
        self.replies = replies;
        self
    }

    /// Route audit events to `sink` instead of the recording sink.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_auto_finalize(mut self, auto_finalize: bool) -> Self {
        self.intake.auto_finalize = auto_finalize;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, FolioError> {
        let temp_dir = tempfile::TempDir::new().map_err(FolioError::persistence)?;
        let db_path = temp_dir.path().join("test.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        }));
        storage.initialize().await?;

        let recorder = RecordingAuditSink::new();
        let sink: Arc<dyn AuditSink> = match self.audit_sink {
            Some(sink) => sink,
            None => Arc::new(recorder.clone()),
        };

        let assistant = Arc::new(MockAssistant::with_replies(self.replies));
        let sessions = Arc::new(SessionService::new(
            storage.clone(),
            AuditNotifier::new(sink),
            pricing_rules(&self.pricing),
        ));
        let intake = IntakeService::new(
            TEST_TENANT,
            sessions.clone(),
            assistant.clone(),
            &self.intake,
        );
        let inbox = InboxTriage::new(storage.clone());

        Ok(TestHarness {
            assistant,
            audit: recorder,
            storage,
            sessions,
            intake,
            inbox,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock assistant.
    pub assistant: Arc<MockAssistant>,
    /// Audit events (empty when a custom sink was configured).
    pub audit: RecordingAuditSink,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub sessions: Arc<SessionService>,
    pub intake: IntakeService,
    pub inbox: InboxTriage,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Sends a customer message from `phone` through the inbound pipeline.
    ///
    /// The phone doubles as the transport session key.
    pub async fn send_message(
        &self,
        phone: &str,
        name: Option<&str>,
        text: &str,
    ) -> Result<InboundOutcome, FolioError> {
        self.intake
            .handle_inbound(InboundMessage {
                session_key: format!("wa:{phone}"),
                customer_phone: phone.to_string(),
                customer_name: name.map(str::to_string),
                text: text.to_string(),
            })
            .await
    }

    /// The storage adapter as a trait object.
    pub fn storage_adapter(&self) -> Arc<dyn StorageAdapter> {
        self.storage.clone()
    }
}
