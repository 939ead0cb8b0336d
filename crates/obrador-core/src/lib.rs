// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Obrador order-intake framework.
//!
//! This crate provides the domain types (order drafts, conversation sessions,
//! folios, commissions), the shared error type, and the adapter traits the
//! intake core uses to reach its collaborators.

pub mod draft;
pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use draft::{DraftSummary, FolioType, OrderDraft};
pub use error::FolioError;
pub use types::{
    AdapterType, ConversationSession, HealthStatus, Priority, SessionId, SessionStatus,
};

// Re-export all adapter traits at crate root.
pub use traits::{AssistantAdapter, AuditSink, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    fn active_session() -> ConversationSession {
        ConversationSession::open(
            "sess-1".into(),
            "tenant-a".into(),
            "wa:5215550001".into(),
            "5215550001".into(),
            Some("Ana".into()),
        )
    }

    #[test]
    fn folio_error_has_all_variants() {
        let _config = FolioError::Config("test".into());
        let _persistence = FolioError::persistence(std::io::Error::other("test"));
        let _validation = FolioError::ValidationFailed {
            fields: vec!["cakeFlavors".into()],
        };
        let _closed = FolioError::SessionClosed {
            session_id: "s".into(),
            status: SessionStatus::Discarded,
        };
        let _not_found = FolioError::SessionNotFound {
            session_id: "s".into(),
        };
        let _no_folio = FolioError::FolioNotFound {
            tenant_id: "t".into(),
            folio_number: 7,
        };
        let _form = FolioError::Form {
            path: "pedido.json".into(),
            source: Box::new(std::io::Error::other("test")),
        };
        let _assistant = FolioError::CollaboratorUnavailable {
            message: "test".into(),
            source: None,
        };
        let _timeout = FolioError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = FolioError::Internal("test".into());
    }

    #[test]
    fn retryable_errors_are_transient_ones() {
        assert!(FolioError::persistence(std::io::Error::other("disk")).is_retryable());
        assert!(FolioError::Timeout {
            duration: std::time::Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!FolioError::ValidationFailed { fields: vec![] }.is_retryable());
        assert!(!FolioError::SessionClosed {
            session_id: "s".into(),
            status: SessionStatus::Completed,
        }
        .is_retryable());
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = FolioError::ValidationFailed {
            fields: vec!["clientName".into(), "deliveryDate".into()],
        };
        assert_eq!(
            err.to_string(),
            "validation failed, missing or invalid fields: clientName, deliveryDate"
        );
        assert_eq!(err.missing_fields().unwrap().len(), 2);
    }

    #[test]
    fn adapter_type_display_round_trip() {
        use std::str::FromStr;

        for variant in [AdapterType::Assistant, AdapterType::Storage, AdapterType::Audit] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn session_status_strings_are_lowercase() {
        use std::str::FromStr;

        assert_eq!(SessionStatus::Active.to_string(), "active");
        assert_eq!(
            SessionStatus::from_str("discarded").unwrap(),
            SessionStatus::Discarded
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Completed).unwrap(),
            "\"completed\""
        );
    }

    #[test]
    fn opened_session_seeds_draft_with_customer() {
        let session = active_session();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.priority, Priority::Normal);
        assert_eq!(session.draft.client_name.as_deref(), Some("Ana"));
        assert_eq!(session.draft.client_phone.as_deref(), Some("5215550001"));
    }

    #[test]
    fn terminal_session_rejects_every_mutation() {
        let mut session = active_session();
        session.discard("customer stopped answering").unwrap();
        assert_eq!(session.status, SessionStatus::Discarded);

        assert!(matches!(
            session.set_priority(Priority::Urgente),
            Err(FolioError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.set_needs_human(true),
            Err(FolioError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.replace_draft(OrderDraft::default()),
            Err(FolioError::SessionClosed { .. })
        ));
        assert!(matches!(
            session.complete(1),
            Err(FolioError::SessionClosed { .. })
        ));
    }

    #[test]
    fn completed_session_cannot_be_discarded() {
        let mut session = active_session();
        session.set_needs_human(true).unwrap();
        session.complete(42).unwrap();
        assert_eq!(session.folio_number, Some(42));
        assert!(!session.needs_human);

        let err = session.discard("too late").unwrap_err();
        assert!(matches!(
            err,
            FolioError::SessionClosed {
                status: SessionStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn replacing_draft_refreshes_customer_name() {
        let mut session = active_session();
        let draft = OrderDraft {
            client_name: Some("Ana María".into()),
            ..OrderDraft::default()
        };
        session.replace_draft(draft).unwrap();
        assert_eq!(session.customer_name.as_deref(), Some("Ana María"));
    }

    #[test]
    fn payment_status_follows_balance() {
        use types::PaymentStatus;
        assert_eq!(PaymentStatus::from_balance(0.0), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_balance(-5.0), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_balance(10.0), PaymentStatus::Pending);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_assistant_adapter<T: AssistantAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_audit_sink<T: AuditSink>() {}
    }
}
