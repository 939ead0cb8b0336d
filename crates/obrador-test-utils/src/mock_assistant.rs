// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock assistant adapter for deterministic testing.
//!
//! `MockAssistant` implements `AssistantAdapter` with pre-configured replies,
//! enabling fast, CI-runnable tests without a language model.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use obrador_core::traits::adapter::PluginAdapter;
use obrador_core::traits::assistant::AssistantAdapter;
use obrador_core::types::{
    AdapterType, AssistantReply, AssistantRequest, HealthStatus,
};
use obrador_core::FolioError;

enum Scripted {
    Reply(AssistantReply),
    Unavailable(String),
}

/// A mock assistant that answers from a FIFO queue.
///
/// When the queue is empty, a plain "mock reply" with no patch is returned.
/// Every request is recorded for later inspection.
#[derive(Clone, Default)]
pub struct MockAssistant {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<AssistantRequest>>>,
}

impl MockAssistant {
    /// Create a new mock assistant with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock assistant pre-loaded with the given replies.
    pub fn with_replies(replies: Vec<AssistantReply>) -> Self {
        Self {
            script: Arc::new(Mutex::new(
                replies.into_iter().map(Scripted::Reply).collect(),
            )),
            requests: Arc::default(),
        }
    }

    /// Queue a reply.
    pub async fn push_reply(&self, reply: AssistantReply) {
        self.script.lock().await.push_back(Scripted::Reply(reply));
    }

    /// Queue a failure; the next request reports the assistant unavailable.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Unavailable(message.into()));
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<AssistantRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockAssistant {
    fn name(&self) -> &str {
        "mock-assistant"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Assistant
    }

    async fn health_check(&self) -> Result<HealthStatus, FolioError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FolioError> {
        Ok(())
    }
}

#[async_trait]
impl AssistantAdapter for MockAssistant {
    async fn respond(&self, request: AssistantRequest) -> Result<AssistantReply, FolioError> {
        self.requests.lock().await.push(request);
        match self.script.lock().await.pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Unavailable(message)) => Err(FolioError::CollaboratorUnavailable {
                message,
                source: None,
            }),
            None => Ok(AssistantReply::text("mock reply")),
        }
    }
}
