//! Configuration types for fragment-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the directory holding full source assets under the target dir
pub const ASSET_DIR_NAME: &str = "youtube_audios";
/// Name of the fragment root under the target dir
pub const FRAGMENT_DIR_NAME: &str = "fragments";
/// File name of the metadata artifact under the target dir
pub const METADATA_FILE_NAME: &str = "yt_metadata.csv";

/// Input catalog settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the catalog CSV
    #[serde(default)]
    pub path: PathBuf,

    /// Drop rows flagged unavailable or lacking an identifier (default: true)
    #[serde(default = "default_true")]
    pub available_only: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            available_only: true,
        }
    }
}

/// What to produce and where
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Target directory for assets, fragments and metadata (default: "./data")
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Fragment file extension, with leading dot (default: ".mp3")
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Slice assets into fragments (default: true)
    #[serde(default = "default_true")]
    pub save_fragments: bool,

    /// Keep full source assets after slicing (default: false)
    #[serde(default)]
    pub save_full_assets: bool,

    /// Write the metadata artifact (default: true)
    #[serde(default = "default_true")]
    pub save_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_dir: default_target_dir(),
            extension: default_extension(),
            save_fragments: true,
            save_full_assets: false,
            save_metadata: true,
        }
    }
}

/// Fragment audio format
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate in Hz (default: 16000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Downmix to one channel (default: true)
    #[serde(default = "default_true")]
    pub mono: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            mono: true,
        }
    }
}

impl AudioConfig {
    /// Channel count passed to the slicer
    pub fn channels(&self) -> u8 {
        if self.mono { 1 } else { 2 }
    }
}

/// Worker pool sizing and per-invocation deadlines
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Requested workers, also the batch size (default: 8, capped at hardware parallelism)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Deadline for a single fetch in seconds (None = no deadline)
    #[serde(default, with = "optional_duration_serde")]
    pub fetch_timeout: Option<Duration>,

    /// Deadline for a single slice in seconds (None = no deadline)
    #[serde(default, with = "optional_duration_serde")]
    pub slice_timeout: Option<Duration>,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            fetch_timeout: None,
            slice_timeout: None,
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Source URL template; `{id}` is replaced by the asset identifier
    #[serde(default = "default_url_template")]
    pub url_template: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            url_template: default_url_template(),
        }
    }
}

/// Pre-packaged dataset mirror
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Content store base URL (default: "https://huggingface.co")
    #[serde(default = "default_archive_endpoint")]
    pub endpoint: String,

    /// Dataset repository id (default: "amanteur/CHAD_hummings")
    #[serde(default = "default_archive_repo")]
    pub repo_id: String,

    /// Archive file name inside the repository
    #[serde(default = "default_archive_file")]
    pub filename: String,

    /// Repository revision (default: "main")
    #[serde(default = "default_archive_revision")]
    pub revision: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            endpoint: default_archive_endpoint(),
            repo_id: default_archive_repo(),
            filename: default_archive_file(),
            revision: default_archive_revision(),
        }
    }
}

impl ArchiveConfig {
    /// Direct download URL of the archive
    pub fn url(&self) -> String {
        format!(
            "{}/datasets/{}/resolve/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.repo_id,
            self.revision,
            self.filename
        )
    }
}

/// Main configuration
///
/// Loadable from TOML; every field has a default so a file only needs the
/// settings it changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Requested outputs
    #[serde(default)]
    pub output: OutputConfig,

    /// Fragment audio format
    #[serde(default)]
    pub audio: AudioConfig,

    /// Worker pool and deadlines
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// External binaries
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Bulk archive mirror
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl Config {
    /// Load a config from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Check settings that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.catalog.path.as_os_str().is_empty() {
            return Err(Error::config("catalog.path", "catalog path is required"));
        }
        let ext = &self.output.extension;
        if ext.len() < 2 || !ext.starts_with('.') || ext.contains(['/', '\\']) {
            return Err(Error::config(
                "output.extension",
                format!("extension must look like '.mp3', got '{ext}'"),
            ));
        }
        if self.audio.sample_rate == 0 {
            return Err(Error::config(
                "audio.sample_rate",
                "sample rate must be positive",
            ));
        }
        if self.concurrency.workers == 0 {
            return Err(Error::config(
                "concurrency.workers",
                "at least one worker is required",
            ));
        }
        if !self.tools.url_template.contains("{id}") {
            return Err(Error::config(
                "tools.url_template",
                "template must contain '{id}'",
            ));
        }
        Ok(())
    }

    /// Whether any source asset has to be materialized on disk
    pub fn save_assets(&self) -> bool {
        self.output.save_fragments || self.output.save_full_assets
    }

    /// No output requested at all
    pub fn is_dry_mode(&self) -> bool {
        !(self.save_assets() || self.output.save_metadata)
    }

    /// Worker count after capping at hardware parallelism
    pub fn effective_workers(&self) -> usize {
        let hardware = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.concurrency.workers.min(hardware)
    }

    /// Directory holding full source assets
    pub fn asset_dir(&self) -> PathBuf {
        self.output.target_dir.join(ASSET_DIR_NAME)
    }

    /// Root directory for fragments
    pub fn fragment_dir(&self) -> PathBuf {
        self.output.target_dir.join(FRAGMENT_DIR_NAME)
    }

    /// Metadata artifact path
    pub fn metadata_path(&self) -> PathBuf {
        self.output.target_dir.join(METADATA_FILE_NAME)
    }
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_extension() -> String {
    ".mp3".to_string()
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_workers() -> usize {
    8
}

fn default_url_template() -> String {
    "https://www.youtube.com/watch?v={id}".to_string()
}

fn default_archive_endpoint() -> String {
    "https://huggingface.co".to_string()
}

fn default_archive_repo() -> String {
    "amanteur/CHAD_hummings".to_string()
}

fn default_archive_file() -> String {
    "chad_hummings_subset.tar.gz".to_string()
}

fn default_archive_revision() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
