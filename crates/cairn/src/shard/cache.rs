//! Cache of decoded shard files.

use crate::error::{Result, StoreError};
use crate::reading::{Reading, SensorValue};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maps a shard file's location to its already-decoded contents.
///
/// Shard files are immutable once written, so entries never go stale. The
/// cache has no eviction: it is bounded by the number of distinct shard
/// files touched over the owning persister's lifetime, which is also the
/// cache's lifetime.
#[derive(Debug)]
pub struct ShardFileCache<V> {
    entries: HashMap<PathBuf, Vec<Reading<V>>>,
}

impl<V: SensorValue> ShardFileCache<V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the decoded contents of the shard file at `path`, reading
    /// and decoding it on first access.
    ///
    /// Decode failures surface as [`StoreError::CorruptShardFile`] and are
    /// not cached, so a later read retries the file.
    pub fn get_or_decode(&mut self, path: &Path) -> Result<&[Reading<V>]> {
        if !self.entries.contains_key(path) {
            let bytes = fs::read(path)?;
            let readings: Vec<Reading<V>> =
                serde_json::from_slice(&bytes).map_err(|source| StoreError::CorruptShardFile {
                    path: path.to_path_buf(),
                    source,
                })?;
            self.entries.insert(path.to_path_buf(), readings);
        }
        Ok(self.entries.get(path).unwrap().as_slice())
    }

    /// Returns true if `path` has been decoded and cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of cached shard files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: SensorValue> Default for ShardFileCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_shard_file(dir: &Path, name: &str, readings: &[Reading<f64>]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_vec(readings).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_decodes_on_first_access() {
        let temp_dir = TempDir::new().unwrap();
        let readings = vec![Reading::new(1.5, 1000), Reading::new(2.5, 2000)];
        let path = write_shard_file(temp_dir.path(), "1000-2000.json", &readings);

        let mut cache = ShardFileCache::new();
        assert!(cache.is_empty());

        let decoded = cache.get_or_decode(&path).unwrap();
        assert_eq!(decoded, readings.as_slice());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&path));
    }

    #[test]
    fn test_serves_cached_contents_without_rereading() {
        let temp_dir = TempDir::new().unwrap();
        let readings = vec![Reading::new(1.5, 1000)];
        let path = write_shard_file(temp_dir.path(), "1000-1000.json", &readings);

        let mut cache = ShardFileCache::new();
        cache.get_or_decode(&path).unwrap();

        // Deleting the backing file proves the second read is a cache hit
        fs::remove_file(&path).unwrap();
        let decoded = cache.get_or_decode(&path).unwrap();
        assert_eq!(decoded, readings.as_slice());
    }

    #[test]
    fn test_corrupt_file_is_reported_and_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("1000-2000.json");
        fs::write(&path, b"not json").unwrap();

        let mut cache: ShardFileCache<f64> = ShardFileCache::new();
        let result = cache.get_or_decode(&path);
        assert!(matches!(
            result,
            Err(StoreError::CorruptShardFile { .. })
        ));
        assert!(cache.is_empty());

        // Once the file decodes, the cache picks it up: the failure was not
        // remembered
        let readings = vec![Reading::new(3.5, 1500)];
        fs::write(&path, serde_json::to_vec(&readings).unwrap()).unwrap();
        let decoded = cache.get_or_decode(&path).unwrap();
        assert_eq!(decoded, readings.as_slice());
    }

    #[test]
    fn test_missing_file_surfaces_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache: ShardFileCache<f64> = ShardFileCache::new();
        let result = cache.get_or_decode(&temp_dir.path().join("absent.json"));
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
