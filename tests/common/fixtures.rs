//! Fake primitives and catalog builders

use async_trait::async_trait;
use fragment_dl::{AssetFetcher, AssetId, Config, Error, FetchMode, SliceJob, Slicer};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const CATALOG_HEADER: &str = "youtube_id,is_available,group_id,fragment_id,id,interval";

/// One catalog line; the interval is quoted because it contains a comma
pub fn catalog_line(id: &str, available: bool, group: &str, fragment: &str, row: &str, start: u32, end: u32) -> String {
    let flag = if available { "True" } else { "False" };
    format!("{id},{flag},{group},{fragment},{row},\"[{start}, {end}]\"")
}

/// Write a catalog CSV and return its path
pub fn write_catalog(dir: &Path, lines: &[String]) -> PathBuf {
    let path = dir.join("catalog.csv");
    let mut text = String::from(CATALOG_HEADER);
    for line in lines {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    std::fs::write(&path, text).expect("write catalog");
    path
}

/// Config rooted in `dir` with a single worker
pub fn test_config(dir: &Path, catalog: PathBuf, workers: usize) -> Config {
    let mut config = Config::default();
    config.catalog.path = catalog;
    config.output.target_dir = dir.join("data");
    config.concurrency.workers = workers;
    config
}

/// Fetcher that materializes a small file and tracks peak asset-dir usage
#[derive(Default)]
pub struct StubFetcher {
    pub unavailable: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
    pub peak_files: AtomicUsize,
}

impl StubFetcher {
    pub fn with_unavailable(ids: &[&str]) -> Self {
        Self {
            unavailable: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl AssetFetcher for StubFetcher {
    async fn fetch(&self, id: &AssetId, mode: &FetchMode) -> fragment_dl::Result<serde_json::Value> {
        self.calls.lock().expect("calls lock").push(id.to_string());
        if self.unavailable.contains(id.as_str()) {
            return Err(Error::Fetch {
                id: id.to_string(),
                reason: "Private video".to_string(),
            });
        }
        if let FetchMode::Download { asset_dir } = mode {
            tokio::fs::write(asset_dir.join(format!("{id}.mp3")), b"ID3").await?;
            let present = std::fs::read_dir(asset_dir).map(|d| d.count()).unwrap_or(0);
            self.peak_files.fetch_max(present, Ordering::SeqCst);
        }
        Ok(json!({
            "id": id.as_str(),
            "title": format!("hum {id}"),
            "channel_id": "UCfake",
            "channel": "Fake Channel",
            "uploader": "fake",
            "uploader_id": "@fake",
            "duration": 180,
            "asr": 48000,
            "availability": "public",
            "formats": [],
        }))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Slicer that writes the requested bounds into the output file
#[derive(Default)]
pub struct StubSlicer {
    pub jobs: Mutex<Vec<SliceJob>>,
}

#[async_trait]
impl Slicer for StubSlicer {
    async fn slice(&self, job: &SliceJob) -> fragment_dl::Result<()> {
        self.jobs.lock().expect("jobs lock").push(job.clone());
        tokio::fs::write(&job.output, format!("{}..{}", job.start_secs, job.end_secs)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
