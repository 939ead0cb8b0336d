// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit sink trait for state-change notifications.

use async_trait::async_trait;

use crate::error::FolioError;
use crate::types::AuditEvent;

/// Destination for audit events.
///
/// Callers treat the sink as best-effort: an error returned here is logged
/// and never undoes the operation being audited.
#[async_trait]
pub trait AuditSink: Send + Sync + 'static {
    async fn record(&self, event: AuditEvent) -> Result<(), FolioError>;
}
