//! Shared test doubles for the fetch and slice primitives.

use crate::error::Error;
use crate::fetcher::{AssetFetcher, FetchMode};
use crate::fragments::{SliceJob, Slicer};
use crate::types::AssetId;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

/// Fetcher that writes a small file per asset and fails for configured ids.
///
/// Before materializing, it snapshots the asset directory so tests can check
/// what was on disk while each fetch ran.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    pub(crate) failing: HashSet<String>,
    pub(crate) panicking: HashSet<String>,
    pub(crate) sparse: HashSet<String>,
    pub(crate) calls: Mutex<Vec<AssetId>>,
    pub(crate) snapshots: Mutex<Vec<(AssetId, Vec<String>)>>,
}

impl FakeFetcher {
    pub(crate) fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn panicking(ids: &[&str]) -> Self {
        Self {
            panicking: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Succeed for `ids` with an info document holding no recognized fields
    pub(crate) fn sparse(ids: &[&str]) -> Self {
        Self {
            sparse: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Stems of the files currently in `dir`, sorted
pub(crate) fn file_stems(dir: &std::path::Path) -> Vec<String> {
    let mut stems: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(String::from)
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    stems.sort();
    stems
}

#[async_trait]
impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, id: &AssetId, mode: &FetchMode) -> crate::Result<serde_json::Value> {
        self.calls.lock().unwrap().push(id.clone());

        if let FetchMode::Download { asset_dir } = mode {
            let seen = file_stems(asset_dir);
            self.snapshots.lock().unwrap().push((id.clone(), seen));
        }

        if self.panicking.contains(id.as_str()) {
            panic!("fake fetcher panicked for {id}");
        }
        if self.failing.contains(id.as_str()) {
            return Err(Error::Fetch {
                id: id.to_string(),
                reason: "Video unavailable".to_string(),
            });
        }

        if let Some(path) = mode.target_path(id) {
            tokio::fs::write(&path, id.as_str().as_bytes()).await?;
        }
        // give other workers a chance to interleave
        tokio::task::yield_now().await;

        if self.sparse.contains(id.as_str()) {
            return Ok(json!({"id": id.as_str(), "view_count": 3}));
        }

        Ok(json!({
            "id": id.as_str(),
            "title": format!("title of {id}"),
            "channel": "fake channel",
            "duration": 42.0,
            "asr": 44100,
            "availability": "public",
            "thumbnail": "ignored"
        }))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Slicer that copies nothing and just creates the output file
#[derive(Default)]
pub(crate) struct FakeSlicer {
    pub(crate) jobs: Mutex<Vec<SliceJob>>,
    pub(crate) failing_outputs: HashSet<PathBuf>,
}

#[async_trait]
impl Slicer for FakeSlicer {
    async fn slice(&self, job: &SliceJob) -> crate::Result<()> {
        self.jobs.lock().unwrap().push(job.clone());
        if self.failing_outputs.contains(&job.output) {
            return Err(Error::Slice {
                output: job.output.clone(),
                reason: "exit status: 1".to_string(),
            });
        }
        tokio::fs::write(&job.output, format!("{}-{}", job.start_secs, job.end_secs)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
