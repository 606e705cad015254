//! On-disk persistence for one store's readings.
//!
//! Layout, one root directory per store:
//!
//! ```text
//! <store-root>/
//! ├── <shard-from>-<shard-to>/        folder: shard of the batch's first reading
//! │   ├── <min-ts>-<max-ts>.json      one immutable file per flush batch
//! │   └── ...
//! └── ...
//! ```
//!
//! Folder names are nominal shard boundaries; file names are the batch's own
//! timestamp extent. The two differ whenever a flush batch does not start on
//! a shard boundary, and can disagree about shard membership when a batch
//! arrives out of timestamp order, which is why range scans walk one shard
//! past the query window.

use crate::error::{Result, StoreError};
use crate::reading::{Reading, SensorValue, Timestamp};
use crate::shard::cache::ShardFileCache;
use crate::shard::indexer::ShardIndexer;
use crate::shard::{EPOCH, TimeRange};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension for shard files.
const SHARD_FILE_EXTENSION: &str = "json";

/// Extension for in-progress shard file writes.
const TMP_EXTENSION: &str = "json.tmp";

/// Writes flush batches into the time-sharded layout under one store's
/// directory and answers range queries over it.
///
/// Shard files are write-once: a second batch producing the same file name
/// fails with [`StoreError::WriteConflict`] rather than overwriting. Decoded
/// files are cached for the persister's lifetime, so repeated queries do not
/// re-parse them.
#[derive(Debug)]
pub struct Persister<V> {
    directory: PathBuf,
    indexer: ShardIndexer,
    cache: ShardFileCache<V>,
}

impl<V: SensorValue> Persister<V> {
    /// Creates a persister rooted at `directory`, creating it if absent.
    pub fn new(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            indexer: ShardIndexer::new(),
            cache: ShardFileCache::new(),
        })
    }

    /// Returns the store's root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the decoded-file cache.
    pub fn cache(&self) -> &ShardFileCache<V> {
        &self.cache
    }

    /// Persists one flush batch as a single immutable shard file.
    ///
    /// The batch lands in the folder of the shard containing its
    /// first-inserted reading; the file name spans the batch's own min/max
    /// timestamps. The write goes through a temp file, fsync, and rename,
    /// so a crash never leaves a partial file at the final path.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NothingToPersist`] for an empty batch
    /// - [`StoreError::BeforeEpoch`] if the first reading predates the epoch
    /// - [`StoreError::WriteConflict`] if the destination file exists
    pub fn persist(&mut self, items: &[Reading<V>]) -> Result<()> {
        let first = items.first().ok_or(StoreError::NothingToPersist)?;

        let mut min_ts = first.timestamp;
        let mut max_ts = first.timestamp;
        for item in items {
            min_ts = min_ts.min(item.timestamp);
            max_ts = max_ts.max(item.timestamp);
        }

        let shard = self.indexer.containing_shard(first.timestamp)?;
        let shard_dir = self.directory.join(shard.to_string());
        fs::create_dir_all(&shard_dir)?;

        let extent = TimeRange::closed(min_ts, max_ts);
        let file_path = shard_dir.join(format!("{extent}.{SHARD_FILE_EXTENSION}"));
        if file_path.exists() {
            return Err(StoreError::WriteConflict { path: file_path });
        }

        let encoded = serde_json::to_vec(items)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;

        // 1. Write to temp file
        let tmp_path = shard_dir.join(format!("{extent}.{TMP_EXTENSION}"));
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&encoded)?;
            // 2. fsync temp file
            tmp.sync_all()?;
        }

        // 3. fsync directory (file entry persistence)
        File::open(&shard_dir)?.sync_all()?;

        // 4. Atomic rename to the final name
        fs::rename(&tmp_path, &file_path)?;

        // 5. fsync directory again (rename persistence)
        File::open(&shard_dir)?.sync_all()?;

        debug!(
            "Persisted {} readings to {}",
            items.len(),
            file_path.display()
        );
        Ok(())
    }

    /// Retrieves all persisted readings with timestamps in `[from, to]`.
    ///
    /// `from` below [`EPOCH`] is clamped to it: pre-epoch instants cannot
    /// match any shard, so the clamp cannot drop data. Shard folders that
    /// were never written list as empty, and an entirely unwritten store
    /// yields an empty vector rather than an error. Candidate files are
    /// selected by name-encoded extent overlap, decoded through the cache,
    /// and filtered down to exact timestamp membership; results concatenate
    /// in shard-then-file order with files sorted by extent. A file that
    /// fails to decode is skipped so the rest of the query still answers.
    pub fn retrieve(&mut self, from: Timestamp, to: Timestamp) -> Result<Vec<Reading<V>>> {
        let from = from.max(EPOCH);
        if from > to {
            return Ok(Vec::new());
        }
        let query = TimeRange::closed(from, to);

        let mut results = Vec::new();
        for shard in self.indexer.shards_covering(from, to)? {
            let shard_dir = self.directory.join(shard.to_string());
            for (extent, path) in list_shard_files(&shard_dir)? {
                if !extent.overlaps(&query) {
                    continue;
                }
                let readings = match self.cache.get_or_decode(&path) {
                    Ok(readings) => readings,
                    Err(StoreError::CorruptShardFile { path, source }) => {
                        warn!("Skipping corrupt shard file {}: {}", path.display(), source);
                        continue;
                    }
                    Err(err) => return Err(err),
                };
                results.extend(
                    readings
                        .iter()
                        .filter(|reading| query.contains(reading.timestamp))
                        .copied(),
                );
            }
        }
        Ok(results)
    }
}

/// Lists shard files in `dir` with their name-encoded extents, sorted by
/// extent. A missing directory lists as empty: no data was ever flushed
/// into that shard's window. Files whose names do not parse as a range are
/// not shard files and are ignored.
fn list_shard_files(dir: &Path) -> Result<Vec<(TimeRange, PathBuf)>> {
    let mut files = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(err) => return Err(err.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(extent) = parse_file_extent(&path) {
            files.push((extent, path));
        }
    }

    files.sort_by_key(|(extent, _)| (extent.from, extent.to));
    Ok(files)
}

/// Parses a shard file name of the form `{from}-{to}.json`.
fn parse_file_extent(path: &Path) -> Option<TimeRange> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(SHARD_FILE_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    TimeRange::parse(stem).ok()
}
