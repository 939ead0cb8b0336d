// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::FolioError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ChatTurn, Commission, ConversationSession, Folio, NewFolio, SessionStatus,
};

/// Adapter for storage and persistence backends.
///
/// Storage adapters own sessions, their transcripts, folios and commissions.
/// Two guarantees are pushed down to the backend because they must hold across
/// processes: folio numbers are never handed out twice, and at most one
/// commission row exists per folio.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), FolioError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), FolioError>;

    // --- Sessions ---

    async fn create_session(&self, session: &ConversationSession) -> Result<(), FolioError>;

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>, FolioError>;

    /// The active session a transport key currently maps to, if any.
    async fn find_active_session(
        &self,
        tenant_id: &str,
        session_key: &str,
    ) -> Result<Option<ConversationSession>, FolioError>;

    async fn list_sessions(
        &self,
        tenant_id: &str,
        status: Option<SessionStatus>,
    ) -> Result<Vec<ConversationSession>, FolioError>;

    /// Writes back a mutated session.
    ///
    /// Only a session that is still active in storage is overwritten; returns
    /// `false` when the stored row is missing or already terminal.
    async fn save_session(&self, session: &ConversationSession) -> Result<bool, FolioError>;

    // --- Chat history ---

    async fn append_turn(&self, turn: &ChatTurn) -> Result<(), FolioError>;

    async fn get_turns(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ChatTurn>, FolioError>;

    // --- Folios ---

    /// Persists a folio and assigns the tenant's next folio number.
    ///
    /// Idempotent on `source_key`: a repeated insert returns the folio that
    /// was stored the first time.
    async fn insert_folio(&self, folio: &NewFolio) -> Result<Folio, FolioError>;

    async fn get_folio(
        &self,
        tenant_id: &str,
        folio_number: i64,
    ) -> Result<Option<Folio>, FolioError>;

    // --- Commissions ---

    /// Atomically returns the stored commission for the candidate's folio,
    /// creating it from `candidate` only if none exists.
    async fn find_or_create_commission(
        &self,
        candidate: &Commission,
    ) -> Result<Commission, FolioError>;

    async fn get_commission(
        &self,
        tenant_id: &str,
        folio_number: i64,
    ) -> Result<Option<Commission>, FolioError>;
}
