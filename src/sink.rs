//! Metadata accumulation and the final CSV artifact

use crate::error::Result;
use crate::types::{AssetRecord, METADATA_FIELDS};
use std::path::Path;
use tracing::info;

/// Append-only collection of per-asset records
///
/// Records arrive one batch at a time, after the batch's barrier, so a batch
/// always occupies a contiguous run of the sequence.
#[derive(Clone, Debug, Default)]
pub struct MetadataSink {
    records: Vec<AssetRecord>,
    batches: usize,
}

impl MetadataSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all records of one batch
    pub fn extend_batch(&mut self, records: impl IntoIterator<Item = AssetRecord>) {
        self.records.extend(records);
        self.batches += 1;
    }

    /// Records in arrival order
    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of batches appended so far
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Records whose fetch failed
    pub fn degraded(&self) -> usize {
        self.records.iter().filter(|r| r.is_degraded()).count()
    }

    /// Write all records as CSV with the fixed metadata column order
    pub fn flush(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(METADATA_FIELDS)?;
        for record in &self.records {
            writer.write_record(record.to_row())?;
        }
        writer.flush()?;

        info!(path = %path.display(), records = self.records.len(), "metadata written");
        Ok(())
    }
}
