//! Markdown to body HTML, backed by pulldown-cmark.
//!
//! Malformed markdown is never an error: CommonMark has a rendering for every
//! input. Only unreadable or undecodable sources fail.

use fs_err as fs;
use pulldown_cmark::{html, Options, Parser};
use std::path::Path;

use crate::config::MarkdownConfig;
use crate::error::{PreviewError, Result};

/// Produces the `<body>` fragment for a source document.
///
/// Implementations must be deterministic for a given file content.
pub trait DocumentRenderer: Send {
    fn render(&self, source: &Path) -> Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new(config: &MarkdownConfig) -> Self {
        let mut options = Options::empty();
        options.set(Options::ENABLE_TABLES, config.tables);
        options.set(Options::ENABLE_FOOTNOTES, config.footnotes);
        options.set(Options::ENABLE_STRIKETHROUGH, config.strikethrough);
        options.set(Options::ENABLE_TASKLISTS, config.tasklists);
        options.set(Options::ENABLE_SMART_PUNCTUATION, config.smart_punctuation);
        Self { options }
    }

    pub fn render_str(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut body = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut body, parser);
        body
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(&MarkdownConfig::default())
    }
}

impl DocumentRenderer for MarkdownRenderer {
    fn render(&self, source: &Path) -> Result<String> {
        let bytes = fs::read(source).map_err(|err| PreviewError::SourceUnreadable {
            path: source.to_path_buf(),
            source: err,
        })?;
        let markdown = String::from_utf8(bytes)
            .map_err(|_| PreviewError::SourceNotUtf8(source.to_path_buf()))?;
        Ok(self.render_str(&markdown))
    }
}
