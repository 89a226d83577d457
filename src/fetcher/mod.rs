//! Remote asset fetching
//!
//! [`AssetFetcher`] is the seam to the remote-fetch primitive; [`YtDlpFetcher`]
//! drives the external `yt-dlp` binary. [`fetch_asset`] wraps any fetcher into a
//! total operation: it always yields an [`AssetRecord`], degrading to an
//! identifier-only record when the fetch fails.

mod traits;
mod ytdlp;

pub use traits::{ASSET_EXTENSION, AssetFetcher, FetchMode, asset_path};
pub use ytdlp::YtDlpFetcher;

use crate::types::{AssetId, AssetRecord, SourceAsset};
use crate::utils::remove_file_if_exists;
use tracing::{debug, warn};

/// What a single fetch left behind
#[derive(Clone, Debug, PartialEq)]
pub struct FetchOutcome {
    /// Metadata record, degraded on failure
    pub record: AssetRecord,
    /// The materialized asset, when one was requested and produced
    pub asset: Option<SourceAsset>,
    /// Whether the fetcher reported success, independent of which fields came back
    pub fetched: bool,
}

impl FetchOutcome {
    /// Whether the fetch succeeded
    pub fn succeeded(&self) -> bool {
        self.fetched
    }

    /// Outcome of a fetch that never produced an info document
    pub fn failed(id: &AssetId) -> Self {
        Self {
            record: AssetRecord::degraded(id),
            asset: None,
            fetched: false,
        }
    }
}

/// Fetch one identifier; never fails.
///
/// On error a warning is logged, any partial file at the asset's fixed path is
/// removed, and an identifier-only record is returned.
pub async fn fetch_asset(fetcher: &dyn AssetFetcher, id: &AssetId, mode: &FetchMode) -> FetchOutcome {
    let target = mode.target_path(id);

    match fetcher.fetch(id, mode).await {
        Ok(info) => {
            let record = AssetRecord::from_info(id, &info);
            let asset = match target {
                Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                    Some(SourceAsset { id: id.clone(), path })
                }
                Some(path) => {
                    warn!(
                        asset_id = %id,
                        path = %path.display(),
                        fetcher = fetcher.name(),
                        "fetch reported success but asset file is missing"
                    );
                    None
                }
                None => None,
            };
            debug!(asset_id = %id, materialized = asset.is_some(), "fetched asset");
            FetchOutcome {
                record,
                asset,
                fetched: true,
            }
        }
        Err(e) => {
            warn!(asset_id = %id, fetcher = fetcher.name(), error = %e, "fetch failed");
            if let Some(path) = target
                && let Err(cleanup) = remove_file_if_exists(&path).await
            {
                warn!(asset_id = %id, error = %cleanup, "failed to remove partial asset");
            }
            FetchOutcome::failed(id)
        }
    }
}
