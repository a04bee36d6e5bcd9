//! Configuration loading and well-known paths.
//!
//! Handles paths for:
//! - Preview configuration (`~/.preview-sync/config.toml`)
//! - Daemon socket and logs
//! - The artifact directory shared by all sessions

use fs_err as fs;
use preview_protocol::SessionId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PreviewError, Result};

const APP_DIR_NAME: &str = ".preview-sync";
const CONFIG_FILE_NAME: &str = "config.toml";
const SOCKET_NAME: &str = "daemon.sock";
const ARTIFACT_DIR_NAME: &str = "preview-sync";
const ARTIFACT_EXTENSION: &str = "html";
/// Prefix of in-flight artifact writes; see `writer::write_atomically`.
pub(crate) const TEMP_FILE_PREFIX: &str = ".preview-";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Directory holding every session's artifact. Defaults to a
    /// per-user directory, see [`default_artifact_dir`].
    pub artifact_dir: Option<PathBuf>,
    /// Template replacing the bundled one.
    pub template_path: Option<PathBuf>,
    pub markdown: MarkdownConfig,
}

impl PreviewConfig {
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(default_artifact_dir)
    }
}

/// CommonMark extensions passed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub smart_punctuation: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            smart_punctuation: false,
        }
    }
}

/// Returns the application directory (~/.preview-sync).
pub fn get_app_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DIR_NAME))
}

pub fn get_config_path() -> Option<PathBuf> {
    get_app_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

pub fn get_socket_path() -> Option<PathBuf> {
    get_app_dir().map(|d| d.join(SOCKET_NAME))
}

pub fn get_log_dir() -> Option<PathBuf> {
    get_app_dir().map(|d| d.join("logs"))
}

/// Per-user artifact directory: `$XDG_RUNTIME_DIR/preview-sync`, falling back
/// to `~/.preview-sync/previews`.
pub fn default_artifact_dir() -> PathBuf {
    choose_artifact_dir(dirs::runtime_dir(), get_app_dir())
}

fn choose_artifact_dir(runtime_dir: Option<PathBuf>, app_dir: Option<PathBuf>) -> PathBuf {
    runtime_dir
        .map(|dir| dir.join(ARTIFACT_DIR_NAME))
        .or_else(|| app_dir.map(|dir| dir.join("previews")))
        .unwrap_or_else(|| std::env::temp_dir().join(ARTIFACT_DIR_NAME))
}

/// Per-session artifact location: `<dir>/<session_id>.html`.
///
/// Session ids never repeat, so paths never collide across sessions.
pub fn artifact_path_for(dir: &Path, session_id: &SessionId) -> PathBuf {
    dir.join(format!("{}.{}", session_id, ARTIFACT_EXTENSION))
}

pub(crate) fn is_artifact_file(path: &Path) -> bool {
    !is_interrupted_write(path)
        && path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION)
}

/// Temp file a crashed writer never renamed into place.
pub(crate) fn is_interrupted_write(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_FILE_PREFIX))
}

/// Loads configuration from `path` (or the default location).
///
/// A missing file yields defaults; a malformed file is an error the caller
/// decides how to handle.
pub fn load_config(path: Option<&Path>) -> Result<PreviewConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => match get_config_path() {
            Some(path) => path,
            None => return Ok(PreviewConfig::default()),
        },
    };

    if !config_path.exists() {
        return Ok(PreviewConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|err| PreviewError::Io {
        context: format!("reading config {}", config_path.display()),
        source: err,
    })?;
    toml::from_str::<PreviewConfig>(&content).map_err(|err| PreviewError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp = tempdir().unwrap();
        let config = load_config(Some(&temp.path().join("missing.toml"))).unwrap();
        assert_eq!(config, PreviewConfig::default());
        assert_eq!(config.artifact_dir(), default_artifact_dir());
    }

    #[test]
    fn default_artifact_dir_prefers_runtime_dir() {
        let runtime = PathBuf::from("/run/user/1000");
        let app = PathBuf::from("/home/u/.preview-sync");

        assert_eq!(
            choose_artifact_dir(Some(runtime), Some(app.clone())),
            PathBuf::from("/run/user/1000/preview-sync")
        );
        assert_eq!(
            choose_artifact_dir(None, Some(app)),
            PathBuf::from("/home/u/.preview-sync/previews")
        );
        assert_eq!(
            choose_artifact_dir(None, None),
            std::env::temp_dir().join("preview-sync")
        );
    }

    #[test]
    fn temp_files_are_not_artifacts() {
        let dir = Path::new("/previews");
        assert!(is_artifact_file(&dir.join("s1.html")));
        assert!(!is_artifact_file(&dir.join(".preview-a1B2c3.html")));
        assert!(is_interrupted_write(&dir.join(".preview-a1B2c3")));
        assert!(!is_interrupted_write(&dir.join("s1.html")));
    }

    #[test]
    fn load_config_parses_all_sections() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
artifact_dir = "/var/tmp/previews"
template_path = "/etc/preview/template.html"

[markdown]
tables = false
smart_punctuation = true
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.artifact_dir(), PathBuf::from("/var/tmp/previews"));
        assert_eq!(
            config.template_path,
            Some(PathBuf::from("/etc/preview/template.html"))
        );
        assert!(!config.markdown.tables);
        assert!(config.markdown.smart_punctuation);
        assert!(config.markdown.footnotes);
    }

    #[test]
    fn load_config_rejects_unknown_keys() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "artifact_directory = \"/tmp\"\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, PreviewError::ConfigMalformed { .. }));
    }

    #[test]
    fn artifact_paths_are_distinct_per_session() {
        let dir = Path::new("/tmp/x");
        let a = artifact_path_for(dir, &SessionId::new("1"));
        let b = artifact_path_for(dir, &SessionId::new("2"));
        assert_eq!(a, PathBuf::from("/tmp/x/1.html"));
        assert_ne!(a, b);
        assert!(is_artifact_file(&a));
        assert!(!is_artifact_file(Path::new("/tmp/x/notes.md")));
    }
}
