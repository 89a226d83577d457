//! Batch scheduling -- the fetch/extract alternation that bounds disk usage.
//!
//! Split into focused submodules:
//! - [`batching`] - Deduplication, partitioning, progress cadence
//!
//! For every batch the scheduler runs two phases on the same worker pool:
//! 1. fetch every identifier of the batch (barrier)
//! 2. if fragments are requested, slice every asset that phase 1 produced and
//!    release it (barrier)
//!
//! Phase 2 of batch *i* always finishes before phase 1 of batch *i+1* starts,
//! so without full-asset retention the asset directory never holds more than
//! one batch of source files.

pub mod batching;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use batching::{distinct_in_order, partition, progress_due, progress_interval};

use crate::catalog::FragmentIndex;
use crate::error::Result;
use crate::fetcher::{AssetFetcher, FetchMode, FetchOutcome, fetch_asset};
use crate::fragments::{ExtractionReport, FragmentExtractor};
use crate::sink::MetadataSink;
use crate::types::{AssetId, Event, FragmentSpec, SourceAsset};
use crate::utils::remove_file_if_exists;
use crate::worker_pool::{WorkOutcome, WorkerPool};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Totals for a whole scheduler run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Batches processed
    pub batches: usize,
    /// Distinct identifiers attempted
    pub assets: usize,
    /// Identifiers whose fetch failed
    pub fetch_failures: usize,
    /// Source assets passed through an extraction sweep
    pub assets_extracted: usize,
    /// Fragments written
    pub fragments_written: usize,
    /// Fragments that could not be produced
    pub fragments_failed: usize,
}

/// Sweep totals for one batch
#[derive(Clone, Copy, Debug, Default)]
struct SweepTotals {
    assets: usize,
    written: usize,
    failed: usize,
}

/// Extraction stage wiring: how to slice and what to slice
struct ExtractionStage {
    extractor: Arc<FragmentExtractor>,
    index: Arc<FragmentIndex>,
}

/// Drives the fetcher and extractor over batches of identifiers
pub struct BatchScheduler {
    fetcher: Arc<dyn AssetFetcher>,
    fetch_mode: FetchMode,
    extraction: Option<ExtractionStage>,
    event_tx: broadcast::Sender<Event>,
}

impl BatchScheduler {
    /// Scheduler that only fetches (metadata and/or full assets)
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        fetch_mode: FetchMode,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            fetcher,
            fetch_mode,
            extraction: None,
            event_tx,
        }
    }

    /// Enable an extraction sweep after every fetch phase
    pub fn with_extraction(mut self, extractor: Arc<FragmentExtractor>, index: Arc<FragmentIndex>) -> Self {
        self.extraction = Some(ExtractionStage { extractor, index });
        self
    }

    /// Run every batch, appending each batch's records to `sink`.
    ///
    /// Duplicated identifiers are fetched once. `batch_size` is both the batch
    /// length and the worker count.
    ///
    /// # Errors
    ///
    /// Fails only if the worker pool cannot be built. Individual fetch and
    /// slice failures are absorbed into the records and the summary.
    pub async fn run(
        &self,
        identifiers: &[AssetId],
        batch_size: usize,
        sink: &mut MetadataSink,
    ) -> Result<ScheduleSummary> {
        let pool = WorkerPool::new(batch_size)?;

        let distinct = distinct_in_order(identifiers);
        let assets = distinct.len();
        let batches = partition(distinct, batch_size);
        let total_batches = batches.len();
        let interval = progress_interval(total_batches);

        info!(
            assets,
            batches = total_batches,
            workers = pool.size(),
            extract = self.extraction.is_some(),
            "starting batch downloads"
        );
        self.event_tx
            .send(Event::RunStarted {
                total_assets: assets,
                total_batches,
            })
            .ok();

        let mut summary = ScheduleSummary {
            assets,
            ..Default::default()
        };

        for (index, batch) in batches.into_iter().enumerate() {
            let outcomes = self.fetch_batch(&pool, batch).await;

            let mut records = Vec::with_capacity(outcomes.len());
            let mut fetched_assets = Vec::new();
            let mut failed = 0;
            for outcome in outcomes {
                if !outcome.succeeded() {
                    failed += 1;
                }
                records.push(outcome.record);
                fetched_assets.extend(outcome.asset);
            }
            summary.fetch_failures += failed;
            self.event_tx
                .send(Event::BatchFetched {
                    batch: index,
                    succeeded: records.len() - failed,
                    failed,
                })
                .ok();
            sink.extend_batch(records);

            if let Some(stage) = &self.extraction {
                let totals = self.sweep(&pool, stage, fetched_assets).await;
                summary.assets_extracted += totals.assets;
                summary.fragments_written += totals.written;
                summary.fragments_failed += totals.failed;
                self.event_tx
                    .send(Event::SweepCompleted {
                        batch: index,
                        assets: totals.assets,
                        fragments_written: totals.written,
                        fragments_failed: totals.failed,
                    })
                    .ok();
            }

            summary.batches += 1;
            if progress_due(index, interval) {
                info!("Downloading of {}/{} is complete...", index + 1, total_batches);
                self.event_tx
                    .send(Event::Progress {
                        completed: index + 1,
                        total: total_batches,
                    })
                    .ok();
            }
        }

        Ok(summary)
    }

    /// Fetch phase: one unit of work per identifier
    async fn fetch_batch(&self, pool: &WorkerPool, batch: Vec<AssetId>) -> Vec<FetchOutcome> {
        let fetcher = Arc::clone(&self.fetcher);
        let mode = self.fetch_mode.clone();

        let outcomes = pool
            .run("fetch", batch, move |id: AssetId| {
                let fetcher = Arc::clone(&fetcher);
                let mode = mode.clone();
                async move { fetch_asset(fetcher.as_ref(), &id, &mode).await }
            })
            .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                WorkOutcome::Completed(fetched) => results.push(fetched),
                WorkOutcome::Failed { item, reason } => {
                    warn!(asset_id = %item, reason = %reason, "fetch worker failed");
                    if let Some(path) = self.fetch_mode.target_path(&item)
                        && let Err(e) = remove_file_if_exists(&path).await
                    {
                        warn!(asset_id = %item, error = %e, "failed to remove partial asset");
                    }
                    results.push(FetchOutcome::failed(&item));
                }
            }
        }
        results
    }

    /// Extraction sweep over the assets the preceding fetch phase produced.
    ///
    /// Work is dispatched in sub-groups no larger than the pool.
    async fn sweep(
        &self,
        pool: &WorkerPool,
        stage: &ExtractionStage,
        assets: Vec<SourceAsset>,
    ) -> SweepTotals {
        let mut totals = SweepTotals::default();
        if assets.is_empty() {
            return totals;
        }

        let jobs: Vec<(SourceAsset, Vec<FragmentSpec>)> = assets
            .into_iter()
            .map(|asset| {
                let specs = stage.index.specs_for(&asset.id).to_vec();
                if specs.is_empty() {
                    debug!(asset_id = %asset.id, "asset has no fragments in catalog");
                }
                (asset, specs)
            })
            .collect();

        for group in jobs.chunks(pool.size()) {
            let extractor = Arc::clone(&stage.extractor);
            let outcomes = pool
                .run(
                    "extract",
                    group.to_vec(),
                    move |(asset, specs): (SourceAsset, Vec<FragmentSpec>)| {
                        let extractor = Arc::clone(&extractor);
                        async move { extractor.extract(&asset, &specs).await }
                    },
                )
                .await;

            for outcome in outcomes {
                totals.assets += 1;
                match outcome {
                    WorkOutcome::Completed(report) => totals.add(&report),
                    WorkOutcome::Failed {
                        item: (asset, specs),
                        reason,
                    } => {
                        warn!(asset_id = %asset.id, reason = %reason, "extraction worker failed");
                        totals.failed += specs.len();
                        // the extractor never reached its own cleanup
                        if !stage.extractor.keeps_source()
                            && let Err(e) = remove_file_if_exists(&asset.path).await
                        {
                            warn!(asset_id = %asset.id, error = %e, "failed to delete source asset");
                        }
                    }
                }
            }
        }

        debug!(
            assets = totals.assets,
            written = totals.written,
            failed = totals.failed,
            "extraction sweep finished"
        );
        totals
    }
}

impl SweepTotals {
    fn add(&mut self, report: &ExtractionReport) {
        self.written += report.written();
        self.failed += report.failed();
    }
}
