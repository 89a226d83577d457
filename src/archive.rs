//! Bulk archive path: fetch the pre-packaged fragment tarball and unpack it.
//!
//! This bypasses the batch engine entirely. The archive is downloaded into the
//! target directory and extracted into its fragment root.

use crate::config::{ArchiveConfig, FRAGMENT_DIR_NAME};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::task::spawn_blocking;
use tracing::info;

/// Connection timeout for the archive request
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Where a bulk download ended up
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveDownload {
    /// Downloaded archive file
    pub archive_path: PathBuf,
    /// Directory the archive was unpacked into
    pub extracted_to: PathBuf,
    /// Archive size in bytes
    pub bytes: u64,
}

/// Download the configured archive into `target_dir` and unpack it into
/// `<target_dir>/fragments`.
///
/// # Errors
///
/// Returns [`Error::Network`] for transport failures, [`Error::Archive`] for
/// HTTP errors or a corrupt tarball, and [`Error::Io`] for local write errors.
pub async fn download_and_extract(config: &ArchiveConfig, target_dir: &Path) -> Result<ArchiveDownload> {
    let url = config.url();
    tokio::fs::create_dir_all(target_dir).await?;
    let archive_path = target_dir.join(&config.filename);

    info!(url = %url, path = %archive_path.display(), "downloading archive");
    let bytes = download(&url, &archive_path).await?;

    let extracted_to = target_dir.join(FRAGMENT_DIR_NAME);
    tokio::fs::create_dir_all(&extracted_to).await?;

    let source = archive_path.clone();
    let dest = extracted_to.clone();
    spawn_blocking(move || unpack(&source, &dest))
        .await
        .map_err(|e| Error::Archive(format!("extraction task failed: {e}")))??;

    info!(path = %extracted_to.display(), bytes, "archive extracted");
    Ok(ArchiveDownload {
        archive_path,
        extracted_to,
        bytes,
    })
}

async fn download(url: &str, path: &Path) -> Result<u64> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .build()?;

    let mut response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(Error::Archive(format!(
            "HTTP error fetching archive: {} {}",
            response.status(),
            url
        )));
    }

    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive)?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball
        .unpack(dest)
        .map_err(|e| Error::Archive(format!("failed to unpack {}: {e}", archive.display())))
}
