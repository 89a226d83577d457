//! Traits and types for remote asset fetching

use crate::types::AssetId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File extension of every materialized source asset
pub const ASSET_EXTENSION: &str = "mp3";

/// Fixed location of an asset's file under the asset directory
pub fn asset_path(asset_dir: &Path, id: &AssetId) -> PathBuf {
    asset_dir.join(format!("{}.{}", id.as_str(), ASSET_EXTENSION))
}

/// Whether a fetch materializes the asset or only probes its metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// Metadata only, nothing written to disk
    Probe,
    /// Download and write to [`asset_path`] under `asset_dir`
    Download {
        /// Directory receiving the asset file
        asset_dir: PathBuf,
    },
}

impl FetchMode {
    /// Where the asset lands for this mode, if anywhere
    pub fn target_path(&self, id: &AssetId) -> Option<PathBuf> {
        match self {
            FetchMode::Probe => None,
            FetchMode::Download { asset_dir } => Some(asset_path(asset_dir, id)),
        }
    }
}

/// Trait for the remote-fetch primitive
///
/// Given one identifier, an implementation either returns the remote info
/// document (and, in [`FetchMode::Download`], has written the asset to its
/// fixed path) or fails. Implementations do not retry.
///
/// # Examples
///
/// ```no_run
/// use fragment_dl::fetcher::{AssetFetcher, FetchMode, YtDlpFetcher};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = YtDlpFetcher::from_path().expect("yt-dlp not found in PATH");
/// let info = fetcher.fetch(&"dQw4w9WgXcQ".into(), &FetchMode::Probe).await?;
/// println!("title: {:?}", info.get("title"));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch one asset and return its raw info document
    ///
    /// # Errors
    ///
    /// Any failure (network, missing, unavailable, probe error, tool failure)
    /// is returned as an error; [`fetch_asset`](super::fetch_asset) turns it
    /// into a degraded record.
    async fn fetch(&self, id: &AssetId, mode: &FetchMode) -> crate::Result<serde_json::Value>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
