//! Core types for fragment-dl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Remote identifier of a source asset (e.g. a video id)
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// Create a new AssetId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<&str> for AssetId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time interval in seconds, `start <= end`, both non-negative
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
}

impl Interval {
    /// Build an interval, rejecting negative, non-finite or inverted bounds
    pub fn new(start: f64, end: f64) -> Result<Self, String> {
        if !start.is_finite() || !end.is_finite() {
            return Err("bounds must be finite numbers".to_string());
        }
        if start < 0.0 || end < 0.0 {
            return Err("bounds must be non-negative".to_string());
        }
        if start > end {
            return Err(format!("start {start} is after end {end}"));
        }
        Ok(Self { start, end })
    }

    /// Parse a literal pair: `[12, 34]`, `(12, 34)`, `[1.5, 3.]`
    pub fn parse(literal: &str) -> Result<Self, String> {
        let trimmed = literal.trim();
        let inner = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .or_else(|| {
                trimmed
                    .strip_prefix('(')
                    .and_then(|rest| rest.strip_suffix(')'))
            })
            .ok_or_else(|| format!("expected '[a, b]' or '(a, b)', got '{trimmed}'"))?;

        let bounds = inner
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<f64>()
                    .map_err(|e| format!("invalid number '{part}': {e}"))
            })
            .collect::<Result<Vec<f64>, String>>()?;
        match bounds.as_slice() {
            [start, end] => Self::new(*start, *end),
            other => Err(format!("expected 2 numbers, found {}", other.len())),
        }
    }

    /// Start truncated to whole seconds, as passed to the slicer
    pub fn start_secs(&self) -> u64 {
        self.start.trunc() as u64
    }

    /// End truncated to whole seconds, as passed to the slicer
    pub fn end_secs(&self) -> u64 {
        self.end.trunc() as u64
    }
}

/// One usable row of the input catalog
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogRow {
    /// Source asset identifier
    pub asset_id: AssetId,
    /// Group key (first output directory level)
    pub group_id: String,
    /// Fragment key (second output directory level)
    pub fragment_id: String,
    /// Row identifier (output file stem)
    pub row_id: String,
    /// Interval to cut out of the source asset
    pub interval: Interval,
}

impl CatalogRow {
    /// Build the fragment spec for this row under `fragment_root`
    pub fn fragment_spec(&self, fragment_root: &Path, extension: &str) -> FragmentSpec {
        FragmentSpec {
            asset_id: self.asset_id.clone(),
            output_path: fragment_output_path(
                fragment_root,
                &self.group_id,
                &self.fragment_id,
                &self.row_id,
                extension,
            ),
            interval: self.interval,
        }
    }
}

/// Deterministic fragment path: `<root>/<group>/<fragment>/<row_id><extension>`
///
/// `extension` carries its leading dot (e.g. `.mp3`).
pub fn fragment_output_path(
    fragment_root: &Path,
    group_id: &str,
    fragment_id: &str,
    row_id: &str,
    extension: &str,
) -> PathBuf {
    fragment_root
        .join(group_id)
        .join(fragment_id)
        .join(format!("{row_id}{extension}"))
}

/// A fragment to produce from exactly one source asset
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentSpec {
    /// Source asset this fragment is cut from
    pub asset_id: AssetId,
    /// Where the fragment is written
    pub output_path: PathBuf,
    /// Interval within the source asset
    pub interval: Interval,
}

/// Names of the recognized metadata fields, in artifact column order
pub const METADATA_FIELDS: [&str; 9] = [
    "id",
    "title",
    "channel_id",
    "channel",
    "uploader",
    "uploader_id",
    "duration",
    "asr",
    "availability",
];

/// Per-asset metadata record
///
/// Every field except `id` is optional: a failed fetch degrades to an
/// identifier-only record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Asset identifier
    pub id: String,
    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Channel identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Channel display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Uploader display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    /// Uploader identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader_id: Option<String>,
    /// Duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Audio sample rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asr: Option<u32>,
    /// Availability status reported by the remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

impl AssetRecord {
    /// Identifier-only record for a failed fetch
    pub fn degraded(id: &AssetId) -> Self {
        Self {
            id: id.0.clone(),
            ..Default::default()
        }
    }

    /// Build a record from a remote info document, keeping only recognized fields.
    ///
    /// `id` falls back to the requested identifier when the document lacks one.
    /// Fields with an unexpected JSON type are dropped rather than rejected.
    pub fn from_info(requested: &AssetId, info: &serde_json::Value) -> Self {
        let text = |key: &str| info.get(key).and_then(|v| v.as_str()).map(str::to_string);
        Self {
            id: text("id").unwrap_or_else(|| requested.0.clone()),
            title: text("title"),
            channel_id: text("channel_id"),
            channel: text("channel"),
            uploader: text("uploader"),
            uploader_id: text("uploader_id"),
            duration: info.get("duration").and_then(|v| v.as_f64()),
            asr: info
                .get("asr")
                .and_then(|v| v.as_u64())
                .and_then(|v| u32::try_from(v).ok()),
            availability: text("availability"),
        }
    }

    /// True when only the identifier is populated
    pub fn is_degraded(&self) -> bool {
        self.title.is_none()
            && self.channel_id.is_none()
            && self.channel.is_none()
            && self.uploader.is_none()
            && self.uploader_id.is_none()
            && self.duration.is_none()
            && self.asr.is_none()
            && self.availability.is_none()
    }

    /// Cell values in [`METADATA_FIELDS`] order, missing fields empty
    pub fn to_row(&self) -> [String; 9] {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        [
            self.id.clone(),
            opt(&self.title),
            opt(&self.channel_id),
            opt(&self.channel),
            opt(&self.uploader),
            opt(&self.uploader_id),
            self.duration.map(|d| format!("{d:?}")).unwrap_or_default(),
            self.asr.map(|a| a.to_string()).unwrap_or_default(),
            opt(&self.availability),
        ]
    }
}

/// A downloaded asset on local storage, one per identifier at a time
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceAsset {
    /// Identifier the asset was fetched for
    pub id: AssetId,
    /// Fixed per-identifier location under the asset directory
    pub path: PathBuf,
}

/// What the controller is doing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Constructed, not started
    Idle,
    /// Resolving configuration and catalog
    Validating,
    /// Nothing requested; finished without doing work
    DryExit,
    /// Batches in progress
    Running,
    /// Scheduler finished; metadata flushed best-effort
    Completed,
    /// Aborted by a fatal scheduler error
    Failed,
}

impl RunState {
    /// Whether the run finished without a fatal error
    pub fn is_success(&self) -> bool {
        matches!(self, RunState::DryExit | RunState::Completed)
    }
}

/// Event emitted while a run progresses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Scheduler started
    RunStarted {
        /// Distinct identifiers to fetch
        total_assets: usize,
        /// Number of batches
        total_batches: usize,
    },

    /// A batch's fetch phase finished
    BatchFetched {
        /// 0-based batch index
        batch: usize,
        /// Fetches that returned an info document
        succeeded: usize,
        /// Fetches that failed or panicked
        failed: usize,
    },

    /// A batch's extraction sweep finished
    SweepCompleted {
        /// 0-based batch index
        batch: usize,
        /// Source assets processed
        assets: usize,
        /// Fragments written
        fragments_written: usize,
        /// Fragments that could not be produced
        fragments_failed: usize,
    },

    /// Periodic progress notification
    Progress {
        /// Batches completed so far
        completed: usize,
        /// Total batches
        total: usize,
    },

    /// Run finished
    RunCompleted {
        /// Records accumulated
        records: usize,
    },

    /// Run aborted
    RunFailed {
        /// Error message
        error: String,
    },
}
