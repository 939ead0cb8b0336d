// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter and AuditSink traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use obrador_config::model::StorageConfig;
use obrador_core::types::{
    AuditEvent, ChatTurn, Commission, ConversationSession, Folio, NewFolio, SessionStatus,
};
use obrador_core::{AdapterType, AuditSink, FolioError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, FolioError> {
        self.db.get().ok_or_else(|| FolioError::Persistence {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Audit events recorded for one entity, oldest first.
    pub async fn audit_trail(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEvent>, FolioError> {
        queries::audit::events_for_entity(self.db()?, entity_type, entity_id).await
    }

    /// Number of commission rows stored for a folio.
    pub async fn commission_count(
        &self,
        tenant_id: &str,
        folio_number: i64,
    ) -> Result<i64, FolioError> {
        queries::commissions::count_for_folio(self.db()?, tenant_id, folio_number).await
    }

    async fn checkpoint(&self) -> Result<(), FolioError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FolioError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FolioError> {
        if self.db.get().is_some() {
            self.checkpoint().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), FolioError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FolioError::Persistence {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FolioError> {
        self.checkpoint().await
    }

    // --- Sessions ---

    async fn create_session(&self, session: &ConversationSession) -> Result<(), FolioError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>, FolioError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn find_active_session(
        &self,
        tenant_id: &str,
        session_key: &str,
    ) -> Result<Option<ConversationSession>, FolioError> {
        queries::sessions::find_active_session(self.db()?, tenant_id, session_key).await
    }

    async fn list_sessions(
        &self,
        tenant_id: &str,
        status: Option<SessionStatus>,
    ) -> Result<Vec<ConversationSession>, FolioError> {
        queries::sessions::list_sessions(self.db()?, tenant_id, status).await
    }

    async fn save_session(&self, session: &ConversationSession) -> Result<bool, FolioError> {
        queries::sessions::save_session(self.db()?, session).await
    }

    // --- Chat history ---

    async fn append_turn(&self, turn: &ChatTurn) -> Result<(), FolioError> {
        queries::turns::append_turn(self.db()?, turn).await
    }

    async fn get_turns(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatTurn>, FolioError> {
        queries::turns::get_turns(self.db()?, session_id, limit).await
    }

    // --- Folios ---

    async fn insert_folio(&self, folio: &NewFolio) -> Result<Folio, FolioError> {
        queries::folios::insert_folio(self.db()?, folio).await
    }

    async fn get_folio(
        &self,
        tenant_id: &str,
        folio_number: i64,
    ) -> Result<Option<Folio>, FolioError> {
        queries::folios::get_folio(self.db()?, tenant_id, folio_number).await
    }

    // --- Commissions ---

    async fn find_or_create_commission(
        &self,
        candidate: &Commission,
    ) -> Result<Commission, FolioError> {
        queries::commissions::find_or_create_commission(self.db()?, candidate).await
    }

    async fn get_commission(
        &self,
        tenant_id: &str,
        folio_number: i64,
    ) -> Result<Option<Commission>, FolioError> {
        queries::commissions::get_commission(self.db()?, tenant_id, folio_number).await
    }
}

#[async_trait]
impl AuditSink for SqliteStorage {
    async fn record(&self, event: AuditEvent) -> Result<(), FolioError> {
        queries::audit::insert_event(self.db()?, &event).await
    }
}
