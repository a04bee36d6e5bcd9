//! State owned by the daemon.
//!
//! Connections are handled on their own threads, but every event goes
//! through one `Mutex<Reconciler>`, so cache updates and artifact writes
//! happen one at a time and in arrival order.

use preview_core::{ArtifactRecord, ReconcileOutcome, Reconciler};
use preview_protocol::{ArtifactEntry, EventEnvelope, SessionId};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub struct SharedState {
    reconciler: Mutex<Reconciler>,
    artifact_dir: PathBuf,
}

impl SharedState {
    pub fn new(reconciler: Reconciler, artifact_dir: PathBuf) -> Self {
        Self {
            reconciler: Mutex::new(reconciler),
            artifact_dir,
        }
    }

    pub fn apply_event(&self, envelope: &EventEnvelope) -> ReconcileOutcome {
        let outcome = self.lock().handle_event(&envelope.event);
        tracing::debug!(
            event_id = %envelope.event_id,
            session_id = %envelope.event.session_id(),
            outcome = ?outcome,
            "Event applied"
        );
        outcome
    }

    pub fn end_session(&self, session_id: &SessionId) -> ReconcileOutcome {
        let outcome = self.lock().end_session(session_id);
        tracing::info!(session_id = %session_id, outcome = ?outcome, "Session ended");
        outcome
    }

    pub fn artifacts_snapshot(&self) -> Vec<ArtifactEntry> {
        let reconciler = self.lock();
        let mut entries: Vec<ArtifactEntry> = reconciler.artifacts().map(to_entry).collect();
        entries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        entries
    }

    pub fn artifact_count(&self) -> usize {
        self.lock().artifact_count()
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    // A panic while holding the lock leaves the cache consistent: every
    // mutation is a single insert or remove.
    fn lock(&self) -> MutexGuard<'_, Reconciler> {
        self.reconciler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn to_entry(record: &ArtifactRecord) -> ArtifactEntry {
    ArtifactEntry {
        session_id: record.session_id.clone(),
        artifact_path: record.artifact_path.clone(),
    }
}
