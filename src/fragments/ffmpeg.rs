//! CLI-based slicer using the external ffmpeg binary

use super::traits::{SliceJob, Slicer};
use crate::config::{ConcurrencyConfig, ToolsConfig};
use crate::error::Error;
use crate::utils::{resolve_tool, stderr_tail};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Slicer that shells out to `ffmpeg`
pub struct FfmpegSlicer {
    binary_path: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegSlicer {
    /// Create a slicer with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            timeout: None,
        }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Build a slicer from the tool and deadline settings
    pub fn from_config(tools: &ToolsConfig, concurrency: &ConcurrencyConfig) -> crate::Result<Self> {
        let binary = resolve_tool(tools.ffmpeg_path.as_deref(), "ffmpeg", tools.search_path)?;
        Ok(Self::new(binary).with_timeout(concurrency.slice_timeout))
    }

    /// Bound each invocation by a deadline
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command-line arguments for one job
    pub(crate) fn build_args(job: &SliceJob) -> Vec<OsString> {
        vec![
            "-v".into(),
            "quiet".into(),
            "-i".into(),
            job.input.as_os_str().to_owned(),
            "-ss".into(),
            job.start_secs.to_string().into(),
            "-to".into(),
            job.end_secs.to_string().into(),
            "-c:a".into(),
            job.format.codec.encoder().into(),
            "-ar".into(),
            job.format.sample_rate.to_string().into(),
            "-ac".into(),
            job.format.channels.to_string().into(),
            "-y".into(),
            job.output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl Slicer for FfmpegSlicer {
    async fn slice(&self, job: &SliceJob) -> crate::Result<()> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(Self::build_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| Error::Timeout {
                    tool: "ffmpeg",
                    seconds: limit.as_secs(),
                })?,
            None => command.output().await,
        }
        .map_err(|e| Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(Error::Slice {
                output: job.output.clone(),
                reason: format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    stderr_tail(&output.stderr, 3)
                ),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
