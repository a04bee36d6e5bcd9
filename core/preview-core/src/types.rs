//! Core types shared by the cache, writer, and reconciler.

use preview_protocol::{PreviewState, SessionId};
use serde::Serialize;
use std::path::PathBuf;

/// What a session's editor state asks of the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewDesiredState {
    NoPreview,
    Preview { source: PathBuf, target: PathBuf },
}

impl From<&PreviewState> for PreviewDesiredState {
    /// A preview is wanted only when both the document and the target are known.
    fn from(state: &PreviewState) -> Self {
        match (&state.buffer, &state.html) {
            (Some(source), Some(target)) => PreviewDesiredState::Preview {
                source: source.clone(),
                target: target.clone(),
            },
            _ => PreviewDesiredState::NoPreview,
        }
    }
}

/// A materialized artifact on disk for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRecord {
    pub session_id: SessionId,
    pub artifact_path: PathBuf,
}

/// What a single reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The action was not one the preview reacts to.
    Ignored,
    /// No preview wanted and none cached.
    Unchanged,
    Rendered { artifact_path: PathBuf },
    Removed { artifact_path: PathBuf },
    /// Render or write failed; any previous artifact was left as is.
    Failed { message: String },
}
