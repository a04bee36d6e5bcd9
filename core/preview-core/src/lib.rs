//! # preview-core
//!
//! Keeps a rendered HTML preview on disk for each editing session, in step
//! with the editor's state.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Rendering and writes block the caller.
//! - **Not thread-safe**: Callers serialize events (`Mutex`, single worker).
//! - **Errors stay inside**: Per-event failures are logged; only startup
//!   (template loading) can fail hard.
//! - **Stale beats missing**: A failed render keeps the previous artifact.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use preview_core::{load_config, Reconciler};
//!
//! let config = load_config(None)?;
//! let mut reconciler = Reconciler::from_config(&config)?;
//! let outcome = reconciler.handle_event(&event);
//! ```

pub mod cache;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod renderer;
pub mod template;
pub mod types;
pub mod writer;

pub use cache::ArtifactCache;
pub use cleanup::{run_startup_cleanup, CleanupStats};
pub use config::*;
pub use error::{PreviewError, Result};
pub use reconciler::Reconciler;
pub use renderer::{DocumentRenderer, MarkdownRenderer};
pub use template::Template;
pub use types::*;
pub use writer::{document_title, ArtifactWriter};
