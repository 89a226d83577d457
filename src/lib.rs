//! # fragment-dl
//!
//! Batch download and fragment extraction engine for audio datasets.
//!
//! A catalog lists remote asset identifiers and the time intervals to cut out
//! of each asset. fragment-dl fetches the assets with bounded parallelism,
//! slices every interval into its own file, deletes each source asset once it
//! has been sliced, and collects per-asset metadata into one CSV artifact.
//!
//! ## Design Philosophy
//!
//! fragment-dl is designed to be:
//! - **Disk-bounded** - fetch and extraction phases alternate per batch, so at
//!   most one batch of source assets sits on disk at any time
//! - **Failure-isolated** - a failed fetch or slice degrades one record or one
//!   fragment, never the run
//! - **Library-first** - the CLI is a thin wrapper around [`DatasetRunner`]
//! - **Event-driven** - consumers subscribe to [`Event`]s instead of polling
//!
//! ## Quick Start
//!
//! ```no_run
//! use fragment_dl::{Config, DatasetRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.catalog.path = "chad_hummings.csv".into();
//!
//!     let runner = DatasetRunner::from_config(config)?;
//!
//!     let mut events = runner.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = runner.run().await?;
//!     println!("{} fragments written", report.fragments_written);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Bulk archive download and extraction
pub mod archive;
/// Catalog loading and filtering
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Remote asset fetching
pub mod fetcher;
/// Fragment slicing
pub mod fragments;
/// Run state machine
pub mod runner;
/// Batch scheduling
pub mod scheduler;
/// Metadata accumulation
pub mod sink;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Bounded worker pool
pub mod worker_pool;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::{ArchiveDownload, download_and_extract};
pub use catalog::{Catalog, CatalogLoader, FragmentIndex};
pub use config::Config;
pub use error::{CatalogError, Error, Result};
pub use fetcher::{AssetFetcher, FetchMode, FetchOutcome, YtDlpFetcher, fetch_asset};
pub use fragments::{
    AudioCodec, ExtractionReport, FfmpegSlicer, FragmentExtractor, FragmentOutcome, SliceFormat,
    SliceJob, Slicer,
};
pub use runner::{DatasetRunner, RunReport};
pub use scheduler::{BatchScheduler, ScheduleSummary};
pub use sink::MetadataSink;
pub use types::{
    AssetId, AssetRecord, CatalogRow, Event, FragmentSpec, Interval, RunState, SourceAsset,
};
pub use worker_pool::{WorkOutcome, WorkerPool};
