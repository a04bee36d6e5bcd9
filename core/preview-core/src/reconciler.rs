//! Keeps each session's preview artifact in line with its editor state.
//!
//! Per session there are two states, no preview and a preview at some path.
//! Every relevant event recomputes the desired state and moves towards it:
//!
//! ```text
//! desired = NoPreview, cached      → delete file (best effort), drop record
//! desired = NoPreview, not cached  → nothing
//! desired = Preview{src, target}   → render + write; on success record target,
//!                                    on failure keep whatever was there
//! ```
//!
//! The reconciler is not thread-safe. It owns its cache outright and expects
//! its caller to serialize events (the daemon holds it behind a `Mutex`).

use fs_err as fs;
use preview_protocol::{
    BuffersListAction, MainWindowAction, PreviewEvent, PreviewToolAction, SessionId,
    StateActionPair,
};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cache::ArtifactCache;
use crate::config::PreviewConfig;
use crate::error::Result;
use crate::renderer::MarkdownRenderer;
use crate::template::Template;
use crate::types::{ArtifactRecord, PreviewDesiredState, ReconcileOutcome};
use crate::writer::{document_title, ArtifactWriter};

pub struct Reconciler {
    writer: ArtifactWriter,
    cache: ArtifactCache,
}

impl Reconciler {
    pub fn new(writer: ArtifactWriter) -> Self {
        Self {
            writer,
            cache: ArtifactCache::new(),
        }
    }

    /// Builds a reconciler with a markdown renderer and the configured template.
    ///
    /// Fails only when the template cannot be loaded.
    pub fn from_config(config: &PreviewConfig) -> Result<Self> {
        let template = Template::load(config.template_path.as_deref())?;
        let renderer = MarkdownRenderer::new(&config.markdown);
        Ok(Self::new(ArtifactWriter::new(template, Box::new(renderer))))
    }

    pub fn apply_preview_tool(
        &mut self,
        pair: &StateActionPair<PreviewToolAction>,
    ) -> ReconcileOutcome {
        if !pair.action.is_preview_relevant() {
            return ReconcileOutcome::Ignored;
        }
        self.apply_state(pair)
    }

    pub fn apply_buffers_list(
        &mut self,
        pair: &StateActionPair<BuffersListAction>,
    ) -> ReconcileOutcome {
        if !pair.action.is_preview_relevant() {
            return ReconcileOutcome::Ignored;
        }
        self.apply_state(pair)
    }

    pub fn apply_main_window(
        &mut self,
        pair: &StateActionPair<MainWindowAction>,
    ) -> ReconcileOutcome {
        if !pair.action.is_preview_relevant() {
            return ReconcileOutcome::Ignored;
        }
        self.apply_state(pair)
    }

    pub fn handle_event(&mut self, event: &PreviewEvent) -> ReconcileOutcome {
        match event {
            PreviewEvent::PreviewTool(pair) => self.apply_preview_tool(pair),
            PreviewEvent::BuffersList(pair) => self.apply_buffers_list(pair),
            PreviewEvent::MainWindow(pair) => self.apply_main_window(pair),
        }
    }

    fn apply_state<A>(&mut self, pair: &StateActionPair<A>) -> ReconcileOutcome {
        let desired = PreviewDesiredState::from(&pair.state.preview);
        self.reconcile(&pair.state.session_id, desired)
    }

    /// Drives the session towards `desired`. Errors are logged, never returned.
    pub fn reconcile(
        &mut self,
        session_id: &SessionId,
        desired: PreviewDesiredState,
    ) -> ReconcileOutcome {
        match desired {
            PreviewDesiredState::NoPreview => self.teardown(session_id),
            PreviewDesiredState::Preview { source, target } => {
                let title = document_title(&source);
                match self.writer.write_artifact(&source, &target, &title) {
                    Ok(()) => {
                        debug!(
                            session_id = %session_id,
                            source = %source.display(),
                            target = %target.display(),
                            "Preview rendered"
                        );
                        if let Some(previous) = self.cache.put(session_id.clone(), target.clone())
                        {
                            if previous.artifact_path != target {
                                debug!(
                                    session_id = %session_id,
                                    previous = %previous.artifact_path.display(),
                                    "Preview target moved; previous artifact left in place"
                                );
                            }
                        }
                        ReconcileOutcome::Rendered {
                            artifact_path: target,
                        }
                    }
                    Err(err) => {
                        let kind = if err.is_render_error() { "render" } else { "write" };
                        warn!(
                            session_id = %session_id,
                            kind,
                            source = %source.display(),
                            target = %target.display(),
                            error = %err,
                            "Failed to render preview"
                        );
                        ReconcileOutcome::Failed {
                            message: err.to_string(),
                        }
                    }
                }
            }
        }
    }

    /// Removes a session's artifact regardless of its editor state.
    ///
    /// Used when a session ends without ever reporting "no preview".
    pub fn end_session(&mut self, session_id: &SessionId) -> ReconcileOutcome {
        self.teardown(session_id)
    }

    /// Removes artifacts for every session `is_live` rejects.
    pub fn sweep<F>(&mut self, is_live: F) -> Vec<ArtifactRecord>
    where
        F: FnMut(&SessionId) -> bool,
    {
        let removed = self.cache.remove_where(is_live);
        for record in &removed {
            remove_artifact_file(&record.artifact_path);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "Swept orphaned previews");
        }
        removed
    }

    pub fn artifact(&self, session_id: &SessionId) -> Option<&ArtifactRecord> {
        self.cache.get(session_id)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.cache.records()
    }

    pub fn artifact_count(&self) -> usize {
        self.cache.len()
    }

    fn teardown(&mut self, session_id: &SessionId) -> ReconcileOutcome {
        match self.cache.remove(session_id) {
            Some(record) => {
                remove_artifact_file(&record.artifact_path);
                debug!(
                    session_id = %session_id,
                    path = %record.artifact_path.display(),
                    "Preview removed"
                );
                ReconcileOutcome::Removed {
                    artifact_path: record.artifact_path,
                }
            }
            None => ReconcileOutcome::Unchanged,
        }
    }
}

// The record goes regardless; the cache tracks intent, not physical cleanup.
fn remove_artifact_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to remove preview artifact");
        }
    }
}
