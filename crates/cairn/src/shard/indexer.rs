//! Maps timestamps to fixed-width shards anchored at the store epoch.

use crate::error::{Result, StoreError};
use crate::reading::Timestamp;
use crate::shard::{EPOCH, SHARD_WIDTH, TimeRange};

/// Maps any timestamp at or after [`EPOCH`] to the unique week-wide shard
/// interval containing it, and walks shard sequences for range scans.
///
/// Shard `k` covers `[EPOCH + k * SHARD_WIDTH, EPOCH + (k + 1) * SHARD_WIDTH)`;
/// the mapping is pure arithmetic over the two frozen constants, so identical
/// inputs always yield the identical shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardIndexer;

impl ShardIndexer {
    /// Creates a new indexer.
    pub fn new() -> Self {
        Self
    }

    /// Returns the shard containing `t`.
    ///
    /// Fails with [`StoreError::BeforeEpoch`] for timestamps predating
    /// [`EPOCH`]; the on-disk layout has no shard for them.
    pub fn containing_shard(&self, t: Timestamp) -> Result<TimeRange> {
        if t < EPOCH {
            return Err(StoreError::BeforeEpoch {
                timestamp: t,
                epoch: EPOCH,
            });
        }
        let k = (t - EPOCH) / SHARD_WIDTH;
        let start = EPOCH + k * SHARD_WIDTH;
        Ok(TimeRange::closed(start, start + SHARD_WIDTH))
    }

    /// Returns the shard immediately after `shard`.
    pub fn next_shard(&self, shard: &TimeRange) -> Result<TimeRange> {
        self.containing_shard(shard.to + 1)
    }

    /// Returns the ordered shards a query over `[from, to]` must scan.
    ///
    /// The walk runs from the shard containing `from` and includes one shard
    /// past the first shard starting strictly after `to`. A batch is filed
    /// under the shard of its first-inserted reading, so a file's contents
    /// can spill past its folder's nominal window; the extra shard catches
    /// those boundary-overflow files.
    pub fn shards_covering(&self, from: Timestamp, to: Timestamp) -> Result<Vec<TimeRange>> {
        let mut shards = Vec::new();
        let mut shard = self.containing_shard(from)?;
        loop {
            let past_end = shard.from > to;
            shards.push(shard);
            if past_end {
                return Ok(shards);
            }
            shard = self.next_shard(&shard)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containing_shard_rejects_pre_epoch() {
        let indexer = ShardIndexer::new();
        let result = indexer.containing_shard(EPOCH - 1);
        assert!(matches!(result, Err(StoreError::BeforeEpoch { .. })));
    }

    #[test]
    fn test_containing_shard_first_window() {
        let indexer = ShardIndexer::new();
        let shard = indexer.containing_shard(EPOCH).unwrap();
        assert_eq!(shard.from, EPOCH);
        assert_eq!(shard.to, EPOCH + SHARD_WIDTH);

        // Anywhere inside the first week maps to the same shard
        assert_eq!(indexer.containing_shard(EPOCH + 1).unwrap(), shard);
        assert_eq!(
            indexer.containing_shard(EPOCH + SHARD_WIDTH - 1).unwrap(),
            shard
        );
    }

    #[test]
    fn test_containing_shard_boundary_starts_next_window() {
        let indexer = ShardIndexer::new();
        let shard = indexer.containing_shard(EPOCH + SHARD_WIDTH).unwrap();
        assert_eq!(shard.from, EPOCH + SHARD_WIDTH);
        assert_eq!(shard.to, EPOCH + 2 * SHARD_WIDTH);
    }

    #[test]
    fn test_every_valid_timestamp_is_contained_by_its_shard() {
        let indexer = ShardIndexer::new();
        for offset in [
            0,
            1,
            999,
            SHARD_WIDTH - 1,
            SHARD_WIDTH,
            SHARD_WIDTH + 1,
            52 * SHARD_WIDTH + 12_345,
        ] {
            let t = EPOCH + offset;
            let shard = indexer.containing_shard(t).unwrap();
            assert!(shard.contains(t), "shard {shard} must contain {t}");
            assert!(shard.from <= t && t < shard.to, "{t} not in [{shard})");
        }
    }

    #[test]
    fn test_next_shard_is_adjacent() {
        let indexer = ShardIndexer::new();
        let first = indexer.containing_shard(EPOCH).unwrap();
        let second = indexer.next_shard(&first).unwrap();
        assert_eq!(second.from, first.to);
        assert_eq!(second.to, first.to + SHARD_WIDTH);
    }

    #[test]
    fn test_shards_covering_includes_one_past_the_end() {
        let indexer = ShardIndexer::new();

        // A point query still walks its own shard plus the overflow shard
        let shards = indexer.shards_covering(EPOCH, EPOCH).unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].from, EPOCH);
        assert_eq!(shards[1].from, EPOCH + SHARD_WIDTH);

        // A query ending exactly on a shard start includes that shard and
        // one more past it
        let shards = indexer
            .shards_covering(EPOCH, EPOCH + SHARD_WIDTH)
            .unwrap();
        assert_eq!(shards.len(), 3);
        assert_eq!(shards[2].from, EPOCH + 2 * SHARD_WIDTH);
    }

    #[test]
    fn test_shards_covering_walks_contiguously() {
        let indexer = ShardIndexer::new();
        let shards = indexer
            .shards_covering(EPOCH + 100, EPOCH + 3 * SHARD_WIDTH + 100)
            .unwrap();
        assert_eq!(shards.len(), 5);
        for pair in shards.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
    }
}
