// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant adapter trait for the language model that extracts order fields.

use async_trait::async_trait;

use crate::error::FolioError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AssistantReply, AssistantRequest};

/// Adapter for the AI assistant collaborator.
///
/// Given the transcript, the current draft and the latest user message, the
/// assistant answers with a reply and, optionally, a patch of extracted fields
/// and a finalize intent. Implementations report failures as
/// [`FolioError::CollaboratorUnavailable`].
#[async_trait]
pub trait AssistantAdapter: PluginAdapter {
    async fn respond(&self, request: AssistantRequest) -> Result<AssistantReply, FolioError>;
}
