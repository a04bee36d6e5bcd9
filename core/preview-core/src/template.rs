//! The HTML page every preview is poured into.
//!
//! The template is loaded exactly once at startup. It is either the bundled
//! `assets/markdown/template.html` or a file named in the configuration.
//! Substitution is literal: no escaping, no loops, no conditionals.

use fs_err as fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{PreviewError, Result};

pub const TITLE_MARKER: &str = "{{ title }}";
pub const BODY_MARKER: &str = "{{ body }}";

const BUNDLED_TEMPLATE: &str = include_str!("../assets/markdown/template.html");

/// Immutable template content holding both substitution markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    content: String,
}

impl Template {
    /// Loads the template from `path`, or the bundled one when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => Self::from_content(BUNDLED_TEMPLATE),
        }
    }

    pub fn from_content(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        for marker in [TITLE_MARKER, BODY_MARKER] {
            if !content.contains(marker) {
                return Err(PreviewError::TemplateMarkerMissing { marker });
            }
        }
        Ok(Self { content })
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PreviewError::TemplateNotFound(path.to_path_buf()))
            }
            Err(err) => {
                return Err(PreviewError::TemplateUnreadable {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        };
        Self::from_content(content)
    }

    /// Substitutes `title` first, then `body`.
    ///
    /// The order matters only when a title itself contains the body marker;
    /// a body containing `{{ title }}` is left untouched.
    pub fn fill(&self, body: &str, title: &str) -> String {
        self.content
            .replace(TITLE_MARKER, title)
            .replace(BODY_MARKER, body)
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}
