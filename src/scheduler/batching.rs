//! Batch preparation -- deduplication, partitioning and progress cadence.

use crate::types::AssetId;
use std::collections::HashSet;

/// Number of progress notifications aimed for over a whole run
pub const PROGRESS_NOTIFICATIONS: usize = 20;

/// Drop repeated identifiers, keeping the first occurrence of each
pub fn distinct_in_order(identifiers: &[AssetId]) -> Vec<AssetId> {
    let mut seen = HashSet::with_capacity(identifiers.len());
    identifiers
        .iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// Split identifiers into consecutive batches of at most `batch_size`
///
/// `batch_size` must be non-zero.
pub fn partition(identifiers: Vec<AssetId>, batch_size: usize) -> Vec<Vec<AssetId>> {
    identifiers
        .chunks(batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Batches between progress notifications; at least 1 for short runs
pub fn progress_interval(total_batches: usize) -> usize {
    (total_batches / PROGRESS_NOTIFICATIONS).max(1)
}

/// Whether a notification is due after finishing the 0-based batch `index`
pub fn progress_due(index: usize, interval: usize) -> bool {
    (index + 1) % interval.max(1) == 0
}
