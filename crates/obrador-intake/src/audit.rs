// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget delivery of audit events.

use std::sync::Arc;

use obrador_core::types::AuditEvent;
use obrador_core::AuditSink;
use tokio_util::task::TaskTracker;
use tracing::{warn, Instrument};

/// Hands audit events to a sink on a background task.
///
/// The caller never waits for the sink and never sees its errors: a failed
/// write is logged and dropped.
#[derive(Clone, Default)]
pub struct AuditNotifier {
    sink: Option<Arc<dyn AuditSink>>,
    tracker: TaskTracker,
}

impl AuditNotifier {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink: Some(sink),
            tracker: TaskTracker::new(),
        }
    }

    /// A notifier that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Waits for every event handed over so far to be written or dropped.
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    pub fn notify(&self, event: AuditEvent) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        self.tracker.spawn(async move {
            let action = event.action;
            let entity_id = event.entity_id.clone();
            if let Err(e) = sink.record(event).await {
                warn!(
                    error = %e,
                    action = %action,
                    entity_id = entity_id.as_str(),
                    "audit event dropped"
                );
            }
        }
        .instrument(tracing::Span::current()));
    }
}
