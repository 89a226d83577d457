//! Per-asset fragment extraction

use super::traits::{AudioCodec, SliceFormat, SliceJob, Slicer};
use crate::config::Config;
use crate::types::{AssetId, FragmentSpec, SourceAsset};
use crate::utils::remove_file_if_exists;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of slicing one fragment
#[derive(Clone, Debug, PartialEq)]
pub struct FragmentOutcome {
    /// Fragment file
    pub output_path: PathBuf,
    /// Whether the slicer reported success
    pub success: bool,
    /// Failure reason
    pub error: Option<String>,
}

/// Result of one extraction pass over a source asset
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionReport {
    /// Source asset identifier
    pub asset_id: AssetId,
    /// One entry per requested fragment, in spec order
    pub fragments: Vec<FragmentOutcome>,
    /// Whether the source file was deleted afterwards
    pub source_removed: bool,
}

impl ExtractionReport {
    /// Fragments written successfully
    pub fn written(&self) -> usize {
        self.fragments.iter().filter(|f| f.success).count()
    }

    /// Fragments that could not be produced
    pub fn failed(&self) -> usize {
        self.fragments.len() - self.written()
    }
}

/// Slices a source asset into its fragments, then optionally deletes it
///
/// Each fragment is independent and best-effort: a failed slice is recorded
/// in the report and never retried. Deleting the source after the pass is
/// what keeps the asset directory bounded to one batch.
pub struct FragmentExtractor {
    slicer: Arc<dyn Slicer>,
    format: SliceFormat,
    keep_source: bool,
}

impl FragmentExtractor {
    /// Create an extractor
    pub fn new(slicer: Arc<dyn Slicer>, format: SliceFormat, keep_source: bool) -> Self {
        Self {
            slicer,
            format,
            keep_source,
        }
    }

    /// Create an extractor with the format and retention settings of `config`
    pub fn from_config(slicer: Arc<dyn Slicer>, config: &Config) -> Self {
        let format = SliceFormat {
            codec: AudioCodec::for_extension(&config.output.extension),
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels(),
        };
        Self::new(slicer, format, config.output.save_full_assets)
    }

    /// Output format used for every fragment
    pub fn format(&self) -> SliceFormat {
        self.format
    }

    /// Whether source assets survive extraction
    pub fn keeps_source(&self) -> bool {
        self.keep_source
    }

    /// Slice every spec out of `source`
    pub async fn extract(&self, source: &SourceAsset, specs: &[FragmentSpec]) -> ExtractionReport {
        let mut fragments = Vec::with_capacity(specs.len());

        for spec in specs {
            fragments.push(self.extract_one(source, spec).await);
        }

        let source_removed = if self.keep_source {
            false
        } else {
            match remove_file_if_exists(&source.path).await {
                Ok(removed) => removed,
                Err(e) => {
                    warn!(
                        asset_id = %source.id,
                        path = %source.path.display(),
                        error = %e,
                        "failed to delete source asset"
                    );
                    false
                }
            }
        };

        let report = ExtractionReport {
            asset_id: source.id.clone(),
            fragments,
            source_removed,
        };
        debug!(
            asset_id = %source.id,
            written = report.written(),
            failed = report.failed(),
            source_removed,
            "extraction pass finished"
        );
        report
    }

    async fn extract_one(&self, source: &SourceAsset, spec: &FragmentSpec) -> FragmentOutcome {
        let failed = |error: String| FragmentOutcome {
            output_path: spec.output_path.clone(),
            success: false,
            error: Some(error),
        };

        if let Some(parent) = spec.output_path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            warn!(
                asset_id = %source.id,
                dir = %parent.display(),
                error = %e,
                "failed to create fragment directory"
            );
            return failed(e.to_string());
        }

        let job = SliceJob {
            input: source.path.clone(),
            output: spec.output_path.clone(),
            start_secs: spec.interval.start_secs(),
            end_secs: spec.interval.end_secs(),
            format: self.format,
        };

        match self.slicer.slice(&job).await {
            Ok(()) => FragmentOutcome {
                output_path: spec.output_path.clone(),
                success: true,
                error: None,
            },
            Err(e) => {
                warn!(
                    asset_id = %source.id,
                    output = %spec.output_path.display(),
                    slicer = self.slicer.name(),
                    error = %e,
                    "fragment extraction failed"
                );
                failed(e.to_string())
            }
        }
    }
}
