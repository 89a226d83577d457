//! Top-level run sequencing.
//!
//! [`DatasetRunner`] owns the run state machine:
//!
//! ```text
//! Idle -> Validating -> DryExit
//!                    -> Running -> Completed
//!                               -> Failed
//! ```
//!
//! Validation resolves the configuration and loads the catalog. Dry mode (no
//! output requested) stops there without touching the filesystem. Otherwise
//! the [`BatchScheduler`] runs, and on success the metadata artifact is
//! flushed and the emptied asset directory removed, both best-effort.

use crate::catalog::{Catalog, CatalogLoader};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{AssetFetcher, FetchMode, YtDlpFetcher};
use crate::fragments::{FfmpegSlicer, FragmentExtractor, Slicer};
use crate::scheduler::{BatchScheduler, ScheduleSummary};
use crate::sink::MetadataSink;
use crate::types::{Event, RunState};
use crate::utils::remove_empty_dir;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

/// Outcome of a finished run
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Terminal state (`DryExit` or `Completed`)
    pub state: RunState,
    /// Distinct identifiers attempted
    pub assets: usize,
    /// Identifiers whose fetch failed
    pub fetch_failures: usize,
    /// Fragments written
    pub fragments_written: usize,
    /// Fragments that could not be produced
    pub fragments_failed: usize,
    /// Metadata artifact, if it was written
    pub metadata_path: Option<PathBuf>,
}

impl RunReport {
    fn dry() -> Self {
        Self {
            state: RunState::DryExit,
            assets: 0,
            fetch_failures: 0,
            fragments_written: 0,
            fragments_failed: 0,
            metadata_path: None,
        }
    }

    fn completed(summary: &ScheduleSummary, metadata_path: Option<PathBuf>) -> Self {
        Self {
            state: RunState::Completed,
            assets: summary.assets,
            fetch_failures: summary.fetch_failures,
            fragments_written: summary.fragments_written,
            fragments_failed: summary.fragments_failed,
            metadata_path,
        }
    }
}

/// Drives one dataset collection run
pub struct DatasetRunner {
    config: Config,
    fetcher: Arc<dyn AssetFetcher>,
    slicer: Arc<dyn Slicer>,
    event_tx: broadcast::Sender<Event>,
    state_tx: watch::Sender<RunState>,
}

impl DatasetRunner {
    /// Create a runner with explicit fetch and slice primitives
    pub fn new(config: Config, fetcher: Arc<dyn AssetFetcher>, slicer: Arc<dyn Slicer>) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        let (state_tx, _state_rx) = watch::channel(RunState::Idle);
        Self {
            config,
            fetcher,
            slicer,
            event_tx,
            state_tx,
        }
    }

    /// Create a runner backed by the `yt-dlp` and `ffmpeg` binaries
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if a binary cannot be located.
    pub fn from_config(config: Config) -> Result<Self> {
        let fetcher = YtDlpFetcher::from_config(&config.tools, &config.concurrency)?;
        let slicer = FfmpegSlicer::from_config(&config.tools, &config.concurrency)?;
        Ok(Self::new(config, Arc::new(fetcher), Arc::new(slicer)))
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Current state
    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    /// Configuration this runner was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn transition(&self, next: RunState) {
        let previous = self.state_tx.send_replace(next);
        tracing::debug!(from = ?previous, to = ?next, "run state changed");
    }

    /// Execute the run
    ///
    /// # Errors
    ///
    /// Configuration and catalog errors fail validation; worker pool errors
    /// fail the run. Per-asset and per-fragment failures never surface here.
    pub async fn run(&self) -> Result<RunReport> {
        self.transition(RunState::Validating);
        let catalog = match self.validate() {
            Ok(catalog) => catalog,
            Err(e) => {
                error!(error = %e, "run validation failed");
                self.fail(&e.to_string());
                return Err(e);
            }
        };

        if self.config.is_dry_mode() {
            info!("Dry mode: no metadata, fragments or full assets requested, nothing to do");
            self.transition(RunState::DryExit);
            return Ok(RunReport::dry());
        }

        self.transition(RunState::Running);
        self.log_outputs();

        let mut sink = MetadataSink::new();
        let summary = match self.execute(&catalog, &mut sink).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "run aborted, metadata not written");
                self.fail(&e.to_string());
                return Err(e);
            }
        };

        let metadata_path = if self.config.output.save_metadata {
            let path = self.config.metadata_path();
            match sink.flush(&path) {
                Ok(()) => Some(path),
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to write metadata");
                    None
                }
            }
        } else {
            None
        };

        if self.config.save_assets() && !self.config.output.save_full_assets {
            remove_empty_dir(&self.config.asset_dir()).await;
        }

        self.transition(RunState::Completed);
        self.event_tx
            .send(Event::RunCompleted {
                records: sink.len(),
            })
            .ok();
        info!(
            records = sink.len(),
            batches = sink.batches(),
            failed_fetches = summary.fetch_failures,
            fragments = summary.fragments_written,
            failed_fragments = summary.fragments_failed,
            "run completed"
        );

        Ok(RunReport::completed(&summary, metadata_path))
    }

    fn validate(&self) -> Result<Catalog> {
        self.config.validate()?;
        CatalogLoader::new(self.config.catalog.available_only).load(&self.config.catalog.path)
    }

    fn log_outputs(&self) {
        let output = &self.config.output;
        if output.save_metadata {
            info!("Saving metadata to {}", self.config.metadata_path().display());
        }
        if output.save_fragments {
            info!("Saving fragments to {}", self.config.fragment_dir().display());
        }
        if output.save_full_assets {
            info!("Saving full assets to {}", self.config.asset_dir().display());
        }
    }

    async fn execute(&self, catalog: &Catalog, sink: &mut MetadataSink) -> Result<ScheduleSummary> {
        let fetch_mode = if self.config.save_assets() {
            let asset_dir = self.config.asset_dir();
            tokio::fs::create_dir_all(&asset_dir).await?;
            FetchMode::Download { asset_dir }
        } else {
            FetchMode::Probe
        };

        let mut scheduler =
            BatchScheduler::new(Arc::clone(&self.fetcher), fetch_mode, self.event_tx.clone());

        if self.config.output.save_fragments {
            let fragment_dir = self.config.fragment_dir();
            tokio::fs::create_dir_all(&fragment_dir).await?;
            let index = catalog.fragment_index(&fragment_dir, &self.config.output.extension);
            info!(
                assets = index.asset_count(),
                fragments = index.fragment_count(),
                "fragment index built"
            );
            let extractor = FragmentExtractor::from_config(Arc::clone(&self.slicer), &self.config);
            scheduler = scheduler.with_extraction(Arc::new(extractor), Arc::new(index));
        }

        scheduler
            .run(&catalog.identifiers(), self.config.effective_workers(), sink)
            .await
    }

    fn fail(&self, reason: &str) {
        self.transition(RunState::Failed);
        self.event_tx
            .send(Event::RunFailed {
                error: reason.to_string(),
            })
            .ok();
    }
}
