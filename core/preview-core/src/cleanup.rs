//! Startup cleanup for artifacts left behind by a previous run.
//!
//! The artifact cache lives in memory, so a daemon that crashed or was killed
//! leaves its `.html` files behind with nothing tracking them. The directory
//! belongs to the daemon; anything with the artifact extension in it at
//! startup is an orphan, as is any temp file from an interrupted write.

use fs_err as fs;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::{is_artifact_file, is_interrupted_write};

/// Results from a cleanup operation.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanupStats {
    /// Number of orphaned artifacts removed.
    pub artifacts_removed: u32,
    /// Number of temp files from interrupted writes removed.
    pub temp_files_removed: u32,
    /// Errors encountered during cleanup.
    pub errors: Vec<String>,
}

/// Ensures `artifact_dir` exists and removes orphaned artifacts and
/// interrupted writes from it.
///
/// Only regular files directly inside the directory are considered;
/// subdirectories and non-artifact files are left alone.
pub fn run_startup_cleanup(artifact_dir: &Path) -> CleanupStats {
    let mut stats = CleanupStats::default();

    if let Err(err) = fs::create_dir_all(artifact_dir) {
        stats.errors.push(err.to_string());
        return stats;
    }

    let entries = match fs::read_dir(artifact_dir) {
        Ok(entries) => entries,
        Err(err) => {
            stats.errors.push(err.to_string());
            return stats;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                stats.errors.push(err.to_string());
                continue;
            }
        };
        let path = entry.path();
        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let counter = if is_interrupted_write(&path) {
            &mut stats.temp_files_removed
        } else if is_artifact_file(&path) {
            &mut stats.artifacts_removed
        } else {
            continue;
        };

        match fs::remove_file(&path) {
            Ok(()) => *counter += 1,
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => stats.errors.push(err.to_string()),
        }
    }

    stats
}
