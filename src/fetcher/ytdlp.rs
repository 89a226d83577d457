//! CLI-based fetcher using the external yt-dlp binary

use super::traits::{ASSET_EXTENSION, AssetFetcher, FetchMode};
use crate::config::{ConcurrencyConfig, ToolsConfig};
use crate::error::Error;
use crate::types::AssetId;
use crate::utils::{resolve_tool, stderr_tail};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_URL_TEMPLATE: &str = "https://www.youtube.com/watch?v={id}";

/// Fetcher that shells out to `yt-dlp`
///
/// Downloads the best available audio stream, converts it to mp3 at 192k and
/// writes it to `<asset_dir>/<id>.mp3`. The info document is read from the
/// JSON yt-dlp prints on stdout.
pub struct YtDlpFetcher {
    binary_path: PathBuf,
    url_template: String,
    timeout: Option<Duration>,
}

impl YtDlpFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout: None,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build a fetcher from the tool and deadline settings
    pub fn from_config(tools: &ToolsConfig, concurrency: &ConcurrencyConfig) -> crate::Result<Self> {
        let binary = resolve_tool(tools.ytdlp_path.as_deref(), "yt-dlp", tools.search_path)?;
        Ok(Self::new(binary)
            .with_url_template(tools.url_template.clone())
            .with_timeout(concurrency.fetch_timeout))
    }

    /// Override the source URL template (`{id}` is substituted)
    pub fn with_url_template(mut self, template: String) -> Self {
        self.url_template = template;
        self
    }

    /// Bound each invocation by a deadline
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn source_url(&self, id: &AssetId) -> String {
        self.url_template.replace("{id}", id.as_str())
    }

    /// Command-line arguments for one fetch
    pub(crate) fn build_args(&self, id: &AssetId, mode: &FetchMode) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--quiet",
            "--no-progress",
            "--no-warnings",
            "--no-playlist",
            "--format",
            "bestaudio/best",
            "--dump-single-json",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        match mode {
            FetchMode::Probe => args.push("--skip-download".into()),
            FetchMode::Download { asset_dir } => {
                let template = asset_dir.join(format!("{}.%(ext)s", id.as_str()));
                args.extend(
                    [
                        "--no-simulate",
                        "--extract-audio",
                        "--audio-format",
                        ASSET_EXTENSION,
                        "--audio-quality",
                        "192K",
                        "--output",
                    ]
                    .iter()
                    .map(OsString::from),
                );
                args.push(template.into_os_string());
            }
        }

        args.push("--".into());
        args.push(self.source_url(id).into());
        args
    }
}

#[async_trait]
impl AssetFetcher for YtDlpFetcher {
    async fn fetch(&self, id: &AssetId, mode: &FetchMode) -> crate::Result<serde_json::Value> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(self.build_args(id, mode))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| Error::Timeout {
                    tool: "yt-dlp",
                    seconds: limit.as_secs(),
                })?,
            None => command.output().await,
        }
        .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Fetch {
                id: id.to_string(),
                reason: format!(
                    "yt-dlp exited with {}: {}",
                    output.status,
                    stderr_tail(&output.stderr, 3)
                ),
            });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
