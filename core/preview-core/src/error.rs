//! Error types for preview-core operations.

use std::path::PathBuf;

/// All errors that can occur while producing or tracking preview artifacts.
///
/// Template errors happen once at startup and are fatal. Render and write
/// errors are per event: the reconciler logs them and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    // ─────────────────────────────────────────────────────────────────────
    // Template Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Template not found at {0}")]
    TemplateNotFound(PathBuf),

    #[error("Template unreadable: {path}: {source}")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template is missing the {marker} marker")]
    TemplateMarkerMissing { marker: &'static str },

    // ─────────────────────────────────────────────────────────────────────
    // Render Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Source document unreadable: {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source document is not valid UTF-8: {0}")]
    SourceNotUtf8(PathBuf),

    // ─────────────────────────────────────────────────────────────────────
    // Write Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Artifact path has no parent directory: {0}")]
    ArtifactPathInvalid(PathBuf),

    #[error("Artifact write failed: {path}: {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PreviewError {
    /// Startup-only errors after which no preview can ever be produced.
    pub fn is_template_error(&self) -> bool {
        matches!(
            self,
            PreviewError::TemplateNotFound(_)
                | PreviewError::TemplateUnreadable { .. }
                | PreviewError::TemplateMarkerMissing { .. }
        )
    }

    pub fn is_render_error(&self) -> bool {
        matches!(
            self,
            PreviewError::SourceUnreadable { .. } | PreviewError::SourceNotUtf8(_)
        )
    }
}

/// Convenience type alias for Results using PreviewError.
pub type Result<T> = std::result::Result<T, PreviewError>;
