// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Obrador order-intake framework.

use thiserror::Error;

use crate::types::SessionStatus;

/// The primary error type used across all Obrador adapter traits and core operations.
///
/// Duplicate commission settlement has no variant here: a repeated settlement
/// resolves to the stored commission and is never reported as a failure.
#[derive(Debug, Error)]
pub enum FolioError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence backend errors (connection, query failure, serialization).
    ///
    /// The operation that produced this error is safe to retry as-is.
    #[error("persistence failure: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The draft is not materializable yet. `fields` names every missing or
    /// invalid field, using the draft's wire names (e.g. `cakeFlavors`).
    #[error("validation failed, missing or invalid fields: {}", fields.join(", "))]
    ValidationFailed { fields: Vec<String> },

    /// A mutation was attempted on a session that already reached a terminal status.
    #[error("session {session_id} is {status} and can no longer be modified")]
    SessionClosed {
        session_id: String,
        status: SessionStatus,
    },

    /// No session exists with the given identifier.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// No folio with this number exists for the tenant.
    #[error("folio #{folio_number} not found for tenant {tenant_id}")]
    FolioNotFound { tenant_id: String, folio_number: i64 },

    /// An order form could not be read or is not JSON.
    #[error("cannot use order form {path}: {source}")]
    Form {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The AI assistant failed to produce a reply.
    #[error("assistant unavailable: {message}")]
    CollaboratorUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FolioError {
    /// Wraps any storage-layer error as a persistence failure.
    pub fn persistence<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FolioError::Persistence {
            source: Box::new(err),
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    ///
    /// Validation and closed-session errors are caller problems; retrying them
    /// produces the same result.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FolioError::Persistence { .. }
                | FolioError::CollaboratorUnavailable { .. }
                | FolioError::Timeout { .. }
        )
    }

    /// The missing-field list when this is a validation failure.
    pub fn missing_fields(&self) -> Option<&[String]> {
        match self {
            FolioError::ValidationFailed { fields } => Some(fields),
            _ => None,
        }
    }
}
