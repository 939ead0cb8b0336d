// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the intake stack from configuration.

use std::sync::Arc;

use obrador_config::ObradorConfig;
use obrador_core::{FolioError, StorageAdapter};
use obrador_intake::{pricing_rules, AuditNotifier, InboxTriage, SessionService};
use obrador_storage::SqliteStorage;
use tracing::debug;

/// The services operator commands act on.
pub struct App {
    pub tenant_id: String,
    pub storage: Arc<SqliteStorage>,
    pub sessions: SessionService,
    pub inbox: InboxTriage,
}

impl App {
    /// Opens storage and builds the services. Audit events go to the same database.
    pub async fn open(config: &ObradorConfig) -> Result<Self, FolioError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;
        debug!(path = config.storage.database_path.as_str(), "storage ready");

        let sessions = SessionService::new(
            storage.clone(),
            AuditNotifier::new(storage.clone()),
            pricing_rules(&config.pricing),
        );
        let inbox = InboxTriage::new(storage.clone());

        Ok(Self {
            tenant_id: config.tenant.id.clone(),
            storage,
            sessions,
            inbox,
        })
    }

    /// Waits for pending audit writes, then checkpoints the database.
    pub async fn close(self) -> Result<(), FolioError> {
        self.sessions.audit().flush().await;
        self.storage.close().await
    }
}
