// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit sinks for asserting on (or breaking) the audit side channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use obrador_core::types::{AuditAction, AuditEvent};
use obrador_core::{AuditSink, FolioError};

/// Keeps every audit event in memory.
#[derive(Clone, Default)]
pub struct RecordingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
    notify: Arc<Notify>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    /// Waits until an event with `action` for `entity_id` has been recorded.
    ///
    /// Audit delivery is asynchronous, so tests poll through this instead of
    /// reading [`events`](Self::events) right after the operation.
    pub async fn wait_for(
        &self,
        action: AuditAction,
        entity_id: &str,
        timeout: Duration,
    ) -> Option<AuditEvent> {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if let Some(event) = self
                    .events
                    .lock()
                    .await
                    .iter()
                    .find(|e| e.action == action && e.entity_id == entity_id)
                {
                    return event.clone();
                }
                notified.await;
            }
        })
        .await
        .ok()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), FolioError> {
        self.events.lock().await.push(event);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Rejects every event, counting the attempts.
#[derive(Clone, Default)]
pub struct FailingAuditSink {
    attempts: Arc<std::sync::atomic::AtomicUsize>,
}

impl FailingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: AuditEvent) -> Result<(), FolioError> {
        self.attempts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(FolioError::Internal("audit sink unavailable".into()))
    }
}
