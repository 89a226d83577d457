//! Catalog loading: CSV rows to fragment specs
//!
//! The catalog is a CSV with (at least) the columns `youtube_id`,
//! `is_available`, `group_id`, `fragment_id`, `id` and `interval`. Rows
//! without an identifier never reach the scheduler; rows flagged unavailable
//! are dropped when `available_only` is set.

use crate::error::{CatalogError, Result};
use crate::types::{AssetId, CatalogRow, FragmentSpec, Interval};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const COL_ASSET_ID: &str = "youtube_id";
const COL_AVAILABLE: &str = "is_available";
const COL_GROUP: &str = "group_id";
const COL_FRAGMENT: &str = "fragment_id";
const COL_ROW_ID: &str = "id";
const COL_INTERVAL: &str = "interval";

/// Loaded and filtered catalog
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    rows: Vec<CatalogRow>,
    dropped: usize,
}

impl Catalog {
    /// Build a catalog from already-validated rows
    pub fn from_rows(rows: Vec<CatalogRow>) -> Self {
        Self { rows, dropped: 0 }
    }

    /// Usable rows, in file order
    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    /// Number of rows removed by filtering
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// True if no usable rows remain
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifier of every usable row, in file order (duplicates kept)
    pub fn identifiers(&self) -> Vec<AssetId> {
        self.rows.iter().map(|r| r.asset_id.clone()).collect()
    }

    /// Group fragment specs by source asset
    pub fn fragment_index(&self, fragment_root: &Path, extension: &str) -> FragmentIndex {
        let mut by_asset: HashMap<AssetId, Vec<FragmentSpec>> = HashMap::new();
        for row in &self.rows {
            by_asset
                .entry(row.asset_id.clone())
                .or_default()
                .push(row.fragment_spec(fragment_root, extension));
        }
        FragmentIndex { by_asset }
    }
}

/// Fragment specs keyed by the asset they are cut from
#[derive(Clone, Debug, Default)]
pub struct FragmentIndex {
    by_asset: HashMap<AssetId, Vec<FragmentSpec>>,
}

impl FragmentIndex {
    /// Specs for one asset (empty if the catalog never mentions it)
    pub fn specs_for(&self, id: &AssetId) -> &[FragmentSpec] {
        self.by_asset.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct assets
    pub fn asset_count(&self) -> usize {
        self.by_asset.len()
    }

    /// Total number of fragments across all assets
    pub fn fragment_count(&self) -> usize {
        self.by_asset.values().map(Vec::len).sum()
    }
}

/// Reads the catalog file and applies row filtering
#[derive(Clone, Copy, Debug)]
pub struct CatalogLoader {
    available_only: bool,
}

impl CatalogLoader {
    /// Create a loader
    pub fn new(available_only: bool) -> Self {
        Self { available_only }
    }

    /// Load a catalog from a CSV file
    pub fn load(&self, path: &Path) -> Result<Catalog> {
        let file = std::fs::File::open(path)?;
        let catalog = self.load_from_reader(file, path)?;
        info!(
            path = %path.display(),
            rows = catalog.rows.len(),
            dropped = catalog.dropped,
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Load a catalog from any reader; `source` is only used in error messages
    pub fn load_from_reader<R: Read>(&self, reader: R, source: &Path) -> Result<Catalog> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CatalogError::MissingColumn {
                    column: name,
                    path: source.to_path_buf(),
                })
        };
        let asset_col = column(COL_ASSET_ID)?;
        let group_col = column(COL_GROUP)?;
        let fragment_col = column(COL_FRAGMENT)?;
        let row_id_col = column(COL_ROW_ID)?;
        let interval_col = column(COL_INTERVAL)?;
        let available_col = if self.available_only {
            Some(column(COL_AVAILABLE)?)
        } else {
            None
        };

        let mut rows = Vec::new();
        let mut dropped = 0;

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = index + 1;
            let cell = |col: usize| record.get(col).unwrap_or("");

            let asset_id = cell(asset_col);
            if is_missing(asset_id) {
                debug!(row, "dropping row without identifier");
                dropped += 1;
                continue;
            }

            if let Some(col) = available_col
                && !parse_flag(cell(col), row)?
            {
                debug!(row, asset_id, "dropping unavailable row");
                dropped += 1;
                continue;
            }

            if !is_path_safe(asset_id) {
                return Err(CatalogError::UnsafePathComponent {
                    row,
                    column: COL_ASSET_ID,
                    value: asset_id.to_string(),
                }
                .into());
            }

            let required = |col: usize, name: &'static str| {
                let value = cell(col);
                if value.is_empty() {
                    Err(CatalogError::EmptyField { row, column: name })
                } else if !is_path_safe(value) {
                    Err(CatalogError::UnsafePathComponent {
                        row,
                        column: name,
                        value: value.to_string(),
                    })
                } else {
                    Ok(value.to_string())
                }
            };
            let group_id = required(group_col, COL_GROUP)?;
            let fragment_id = required(fragment_col, COL_FRAGMENT)?;
            let row_id = required(row_id_col, COL_ROW_ID)?;

            let raw_interval = cell(interval_col);
            let interval =
                Interval::parse(raw_interval).map_err(|reason| CatalogError::InvalidInterval {
                    row,
                    value: raw_interval.to_string(),
                    reason,
                })?;

            rows.push(CatalogRow {
                asset_id: AssetId::new(asset_id),
                group_id,
                fragment_id,
                row_id,
                interval,
            });
        }

        Ok(Catalog { rows, dropped })
    }
}

/// Empty cells and the usual spellings of a missing value
fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("null")
}

/// Keys become single path components under the output roots
fn is_path_safe(value: &str) -> bool {
    value != "." && value != ".." && !value.contains(['/', '\\', '\0'])
}

fn parse_flag(value: &str, row: usize) -> std::result::Result<bool, CatalogError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "1.0" => Ok(true),
        "false" | "0" | "no" | "0.0" | "" => Ok(false),
        _ => Err(CatalogError::InvalidFlag {
            row,
            value: value.to_string(),
        }),
    }
}
