// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator commands over an opened [`App`].

use std::path::Path;

use obrador_core::{FolioError, OrderDraft, Priority, StorageAdapter};
use obrador_draft::{merge, DraftPatch};
use tracing::info;

use crate::app::App;
use crate::render::{self, Output};

pub async fn inbox(app: &App, out: Output, search: Option<&str>) -> Result<(), FolioError> {
    let entries = app.inbox.list(&app.tenant_id, search).await?;
    render::print_inbox(out, &entries);
    Ok(())
}

pub async fn show(app: &App, out: Output, session_id: &str) -> Result<(), FolioError> {
    let detail = app.sessions.detail(session_id).await?;
    render::print_session(out, &detail);
    Ok(())
}

/// Applies whichever triage changes were given, priority first.
pub async fn triage(
    app: &App,
    out: Output,
    session_id: &str,
    priority: Option<Priority>,
    needs_human: Option<bool>,
    actor: Option<&str>,
) -> Result<(), FolioError> {
    if priority.is_none() && needs_human.is_none() {
        return Err(FolioError::Config(
            "triage needs --priority or --needs-human".into(),
        ));
    }
    if let Some(priority) = priority {
        app.sessions.set_priority(session_id, priority, actor).await?;
    }
    if let Some(flag) = needs_human {
        app.sessions.set_needs_human(session_id, flag, actor).await?;
    }
    show(app, out, session_id).await
}

pub async fn discard(
    app: &App,
    out: Output,
    session_id: &str,
    reason: &str,
    actor: Option<&str>,
) -> Result<(), FolioError> {
    let session = app.sessions.discard(session_id, reason, actor).await?;
    if out.json {
        out.print_json(&session);
    } else {
        println!("session {} discarded", session.id);
    }
    Ok(())
}

pub async fn finalize(
    app: &App,
    out: Output,
    session_id: &str,
    actor: Option<&str>,
) -> Result<(), FolioError> {
    let finalized = app.sessions.finalize(session_id, actor).await?;
    render::print_materialization(out, &finalized.materialization);
    Ok(())
}

/// Materializes a folio from an order-form JSON file.
pub async fn create_from_form(
    app: &App,
    out: Output,
    form_path: &Path,
    request_id: Option<&str>,
    actor: Option<&str>,
) -> Result<(), FolioError> {
    let draft = read_form(form_path)?;
    let materialization = app
        .sessions
        .materializer()
        .create_direct(&app.tenant_id, draft, request_id, actor)
        .await?;
    info!(
        folio_number = materialization.folio.folio_number,
        "folio created from form"
    );
    render::print_materialization(out, &materialization);
    Ok(())
}

pub async fn folio(app: &App, out: Output, folio_number: i64) -> Result<(), FolioError> {
    let folio = app
        .storage
        .get_folio(&app.tenant_id, folio_number)
        .await?
        .ok_or_else(|| FolioError::FolioNotFound {
            tenant_id: app.tenant_id.clone(),
            folio_number,
        })?;
    render::print_folio(out, &folio);
    Ok(())
}

/// Reads an order-form JSON file into a draft.
pub fn read_form(path: &Path) -> Result<OrderDraft, FolioError> {
    let form_error = |source: Box<dyn std::error::Error + Send + Sync>| FolioError::Form {
        path: path.display().to_string(),
        source,
    };
    let content = std::fs::read_to_string(path).map_err(|e| form_error(Box::new(e)))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| form_error(Box::new(e)))?;
    Ok(draft_from_form(&value))
}

/// Form payloads use the same field names as assistant patches, so they go
/// through the same lenient parser onto an empty draft.
pub fn draft_from_form(value: &serde_json::Value) -> OrderDraft {
    merge(&OrderDraft::default(), &DraftPatch::from_value(value)).draft
}
