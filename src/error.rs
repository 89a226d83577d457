//! Error types for fragment-dl
//!
//! Only a small part of this taxonomy ever crosses the run boundary:
//! - configuration and catalog validation errors (before any work starts)
//! - worker pool and batch orchestration errors (fatal to the run)
//!
//! Everything else (a single fetch, a single slice, the metadata flush,
//! directory cleanup) is recovered where it happens and only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fragment-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fragment-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "extension")
        key: Option<String>,
    },

    /// Catalog could not be loaded or contains unusable rows
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Worker pool could not be built or a whole batch could not be driven
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// Remote fetch of a single asset failed
    #[error("fetch failed for {id}: {reason}")]
    Fetch {
        /// Identifier of the asset that could not be fetched
        id: String,
        /// Why the fetch failed
        reason: String,
    },

    /// Slicing a fragment out of a source asset failed
    #[error("slicing {output} failed: {reason}")]
    Slice {
        /// Fragment output path
        output: PathBuf,
        /// Why slicing failed
        reason: String,
    },

    /// External tool execution failed (yt-dlp, ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// An external invocation exceeded its configured deadline
    #[error("{tool} timed out after {seconds}s")]
    Timeout {
        /// Name of the tool that timed out
        tool: &'static str,
        /// Deadline that was exceeded
        seconds: u64,
    },

    /// Operation not supported (missing binary, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Bulk archive download or unpack failed
    #[error("archive error: {0}")]
    Archive(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config file could not be parsed
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required column is absent from the header row
    #[error("missing required column '{column}' in {path}")]
    MissingColumn {
        /// Column name
        column: &'static str,
        /// Catalog file
        path: PathBuf,
    },

    /// The interval cell could not be parsed as a `[start, end]` or `(start, end)` pair
    #[error("row {row}: invalid interval '{value}': {reason}")]
    InvalidInterval {
        /// 1-based data row number (header excluded)
        row: usize,
        /// Raw cell value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A required cell (group, fragment or row id) is empty on a retained row
    #[error("row {row}: empty value in column '{column}'")]
    EmptyField {
        /// 1-based data row number (header excluded)
        row: usize,
        /// Column name
        column: &'static str,
    },

    /// A cell used as a path component would escape its output directory
    #[error("row {row}: '{value}' in column '{column}' is not a safe path component")]
    UnsafePathComponent {
        /// 1-based data row number (header excluded)
        row: usize,
        /// Column name
        column: &'static str,
        /// Raw cell value
        value: String,
    },

    /// The availability flag could not be interpreted
    #[error("row {row}: unrecognized availability flag '{value}'")]
    InvalidFlag {
        /// 1-based data row number (header excluded)
        row: usize,
        /// Raw cell value
        value: String,
    },
}
