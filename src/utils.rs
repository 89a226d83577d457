//! Utility functions for external tool discovery and best-effort file cleanup

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Resolve an external binary from an explicit path or, if allowed, from PATH
///
/// # Arguments
///
/// * `explicit` - Configured path, used as-is when present
/// * `name` - Binary name to look up in PATH (e.g. "ffmpeg")
/// * `search_path` - Whether PATH lookup is allowed
///
/// # Errors
///
/// Returns [`Error::NotSupported`] when no binary can be located.
pub fn resolve_tool(explicit: Option<&Path>, name: &str, search_path: bool) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if !search_path {
        return Err(Error::NotSupported(format!(
            "{name} path not configured and PATH search disabled"
        )));
    }
    which::which(name).map_err(|e| Error::NotSupported(format!("{name} not found in PATH: {e}")))
}

/// Remove a file, treating "already gone" as success
///
/// Returns `true` if a file was actually deleted.
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a directory if it is empty; failures are logged, never returned
///
/// Returns `true` if the directory was removed.
pub async fn remove_empty_dir(path: &Path) -> bool {
    match tokio::fs::remove_dir(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed directory");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "error while removing directory");
            false
        }
    }
}

/// Last few lines of a tool's stderr, for error messages
pub fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join(" | ")
}
