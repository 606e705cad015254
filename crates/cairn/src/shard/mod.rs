//! Time-sharded persistence: ranges, shard indexing, decoded-file caching,
//! and the on-disk persister.

pub mod cache;
pub mod indexer;
pub mod persister;

pub use cache::ShardFileCache;
pub use indexer::ShardIndexer;
pub use persister::Persister;

use crate::error::{Result, StoreError};
use crate::reading::Timestamp;
use std::fmt;
use std::str::FromStr;

/// The fixed instant shard boundaries are computed from (unix milliseconds).
///
/// Frozen: changing it invalidates every existing on-disk layout.
pub const EPOCH: Timestamp = 1_702_166_400_000;

/// Fixed shard width: one week, in milliseconds.
pub const SHARD_WIDTH: i64 = 604_800_000;

/// A closed interval of unix-millisecond timestamps.
///
/// The canonical string form `"{from}-{to}"` names shard folders and shard
/// files on disk; [`TimeRange::parse`] is its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    /// Inclusive start (unix milliseconds).
    pub from: Timestamp,
    /// Inclusive end (unix milliseconds).
    pub to: Timestamp,
}

impl TimeRange {
    /// Creates a range; fails unless `from` strictly precedes `to`.
    pub fn new(from: Timestamp, to: Timestamp) -> Result<Self> {
        if from >= to {
            return Err(StoreError::InvalidRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Creates a possibly-degenerate closed range (`from == to` allowed).
    ///
    /// Query windows and single-reading file extents legitimately collapse
    /// to a point, which the public constructor rejects.
    pub(crate) fn closed(from: Timestamp, to: Timestamp) -> Self {
        debug_assert!(from <= to);
        Self { from, to }
    }

    /// Returns true if `t` lies within the range, endpoints included.
    pub fn contains(&self, t: Timestamp) -> bool {
        self.from <= t && t <= self.to
    }

    /// Returns true if the two closed intervals share at least one instant.
    ///
    /// Exact endpoint coincidence counts as overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Parses the canonical `"{from}-{to}"` form.
    ///
    /// Fails with [`StoreError::InvalidEncoding`] on a missing separator, a
    /// non-integer component, or an inverted interval. `from == to` is
    /// accepted: single-reading shard files carry such names.
    pub fn parse(s: &str) -> Result<Self> {
        let (from, to) = s
            .split_once('-')
            .ok_or_else(|| StoreError::InvalidEncoding(s.to_string()))?;
        let from: Timestamp = from
            .parse()
            .map_err(|_| StoreError::InvalidEncoding(s.to_string()))?;
        let to: Timestamp = to
            .parse()
            .map_err(|_| StoreError::InvalidEncoding(s.to_string()))?;
        if from > to {
            return Err(StoreError::InvalidEncoding(s.to_string()));
        }
        Ok(Self { from, to })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for TimeRange {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
