//! Render + template + atomic write.
//!
//! The artifact is written to a temp file in the target's directory and then
//! renamed over the target, so a reader of the target path sees either the
//! previous artifact or the new one, never a partial file.

use std::io::Write;
use std::path::Path;

use tempfile::Builder;

use crate::config::TEMP_FILE_PREFIX;
use crate::error::{PreviewError, Result};
use crate::renderer::DocumentRenderer;
use crate::template::Template;

#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

pub struct ArtifactWriter {
    template: Template,
    renderer: Box<dyn DocumentRenderer>,
}

impl ArtifactWriter {
    pub fn new(template: Template, renderer: Box<dyn DocumentRenderer>) -> Self {
        Self { template, renderer }
    }

    /// Renders `source`, fills the template, and replaces `target`.
    ///
    /// Nothing is written when rendering fails.
    pub fn write_artifact(&self, source: &Path, target: &Path, title: &str) -> Result<()> {
        let body = self.renderer.render(source)?;
        let html = self.template.fill(&body, title);
        write_atomically(target, html.as_bytes())
    }
}

/// Display name for a document: its final path segment.
pub fn document_title(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}

fn write_atomically(target: &Path, content: &[u8]) -> Result<()> {
    let parent_dir = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| PreviewError::ArtifactPathInvalid(target.to_path_buf()))?;

    let write_failed = |source: std::io::Error| PreviewError::ArtifactWriteFailed {
        path: target.to_path_buf(),
        source,
    };

    let mut temp_file = Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile_in(parent_dir)
        .map_err(write_failed)?;
    temp_file.write_all(content).map_err(write_failed)?;
    temp_file.flush().map_err(write_failed)?;
    // NamedTempFile is created 0600; artifacts are read by browsers.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))
            .map_err(write_failed)?;
    }
    temp_file
        .persist(target)
        .map_err(|err| write_failed(err.error))?;

    Ok(())
}
