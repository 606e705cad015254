//! The ingestion-facing hybrid store: an in-memory buffer and flush policy
//! in front of the sharded persister.
//!
//! Write path:
//!
//! ```text
//! Sensor → save → buffer append → policy check → persist → buffer clear
//! ```
//!
//! The buffer is cleared only after the persister reports success, so a
//! failed flush loses nothing: the error propagates out of `save` and the
//! next save retries. Capacity is advisory; while flushes keep failing the
//! buffer keeps growing.

use crate::error::{Result, StoreError};
use crate::reading::{Reading, SensorValue, Timestamp};
use crate::shard::Persister;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Default advisory buffer capacity.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Rule deciding when the buffer is handed to the persister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Flush when the buffer reaches the advisory capacity.
    OnCapacity,
    /// Flush on capacity, and additionally once this much wall-clock time
    /// has passed since the last successful flush.
    OnCapacityAndSchedule(Duration),
}

/// Configuration for a [`HybridStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Advisory buffer capacity. Reaching it triggers a flush attempt; it
    /// never rejects writes, so the buffer can outgrow it while flushes
    /// keep failing.
    pub capacity: usize,
    /// When to hand the buffer to the persister.
    pub policy: FlushPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: FlushPolicy::OnCapacity,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with a custom capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Creates a configuration with a custom flush policy.
    pub fn with_policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Hybrid (memory + disk) store for one sensor's readings.
///
/// Recent readings buffer in memory and are written out in batches per the
/// flush policy; range reads merge persisted shards with the live buffer.
/// Methods take `&mut self`, so a single owner already executes operations
/// in strict serial order; wrap the store in a [`SharedStore`] to keep that
/// order across threads.
#[derive(Debug)]
pub struct HybridStore<V> {
    buffer: Vec<Reading<V>>,
    capacity: usize,
    policy: FlushPolicy,
    last_flush: Instant,
    latest: Option<Reading<V>>,
    persister: Persister<V>,
}

impl<V: SensorValue> HybridStore<V> {
    /// Creates a store over `persister` with the given configuration.
    pub fn new(persister: Persister<V>, config: StoreConfig) -> Self {
        Self {
            buffer: Vec::with_capacity(config.capacity),
            capacity: config.capacity,
            policy: config.policy,
            last_flush: Instant::now(),
            latest: None,
            persister,
        }
    }

    /// Creates a store with a backdated last-flush instant for testing
    /// schedule-based policies.
    #[cfg(test)]
    pub(crate) fn with_last_flush(
        persister: Persister<V>,
        config: StoreConfig,
        last_flush: Instant,
    ) -> Self {
        let mut store = Self::new(persister, config);
        store.last_flush = last_flush;
        store
    }

    /// Accepts one reading.
    ///
    /// The reading is buffered unconditionally. If the flush policy then
    /// triggers, the whole buffer is handed to the persister; a failed
    /// flush propagates to the caller with the buffer intact, so the
    /// reading is never lost to a disk error.
    pub fn save(&mut self, reading: Reading<V>) -> Result<()> {
        self.latest = Some(reading);
        self.buffer.push(reading);
        if self.should_flush() {
            self.flush_to_disk()?;
        }
        Ok(())
    }

    fn should_flush(&self) -> bool {
        if self.buffer.len() >= self.capacity {
            return true;
        }
        match self.policy {
            FlushPolicy::OnCapacity => false,
            FlushPolicy::OnCapacityAndSchedule(interval) => self.last_flush.elapsed() >= interval,
        }
    }

    /// Hands the current buffer to the persister as one batch.
    ///
    /// The buffer is cleared and the last-flush instant stamped only after
    /// the persister reports success; on failure both are left untouched
    /// and the persister's error is returned.
    pub fn flush_to_disk(&mut self) -> Result<()> {
        self.persister.persist(&self.buffer)?;
        debug!("Flushed {} buffered readings", self.buffer.len());
        self.buffer.clear();
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Retrieves all readings with timestamps at or after `since`.
    ///
    /// Buffered readings are returned in insertion order. When the oldest
    /// buffered timestamp is newer than `since` there is a gap that prior
    /// flushes may hold, so the persister is queried for `[since, oldest]`
    /// and its results come first (oldest-first). An empty result is not an
    /// error.
    pub fn retrieve(&mut self, since: Timestamp) -> Result<Vec<Reading<V>>> {
        if self.buffer.is_empty() {
            let now = current_timestamp_millis()?;
            return self.persister.retrieve(since, now);
        }

        let in_memory: Vec<Reading<V>> = self
            .buffer
            .iter()
            .filter(|reading| reading.timestamp >= since)
            .copied()
            .collect();

        let oldest_buffered = self
            .buffer
            .iter()
            .map(|reading| reading.timestamp)
            .min()
            .unwrap();
        if oldest_buffered > since {
            let mut merged = self.persister.retrieve(since, oldest_buffered)?;
            merged.extend(in_memory);
            return Ok(merged);
        }

        Ok(in_memory)
    }

    /// Returns the most recently saved reading, or `None` before the first
    /// save.
    ///
    /// This is a process-lifetime cache: it survives flushes and reflects
    /// the last `save` call, not the newest timestamp.
    pub fn retrieve_latest(&self) -> Option<Reading<V>> {
        self.latest
    }

    /// Number of readings currently buffered in memory.
    pub fn total_count(&self) -> usize {
        self.buffer.len()
    }

    /// Remaining fraction of the advisory capacity, clamped to `0.0` once
    /// the buffer has grown past it.
    pub fn available_capacity_ratio(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        let used = self.buffer.len() as f32 / self.capacity as f32;
        (1.0 - used).max(0.0)
    }

    /// Returns the underlying persister.
    pub fn persister(&self) -> &Persister<V> {
        &self.persister
    }
}

/// A [`HybridStore`] behind a mutex, for callers on multiple threads.
///
/// Every operation holds the lock for its full duration, so all operations
/// against one store execute in strict serial order: a retrieve can never
/// observe a buffer mid-clear, and two saves can never both decide to
/// flush. Stores wrapped separately remain fully independent.
#[derive(Debug)]
pub struct SharedStore<V> {
    inner: Mutex<HybridStore<V>>,
}

impl<V: SensorValue> SharedStore<V> {
    /// Wraps `store` for shared use.
    pub fn new(store: HybridStore<V>) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HybridStore<V>>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// See [`HybridStore::save`].
    pub fn save(&self, reading: Reading<V>) -> Result<()> {
        self.lock()?.save(reading)
    }

    /// See [`HybridStore::retrieve`].
    pub fn retrieve(&self, since: Timestamp) -> Result<Vec<Reading<V>>> {
        self.lock()?.retrieve(since)
    }

    /// See [`HybridStore::retrieve_latest`].
    pub fn retrieve_latest(&self) -> Result<Option<Reading<V>>> {
        Ok(self.lock()?.retrieve_latest())
    }

    /// See [`HybridStore::flush_to_disk`].
    pub fn flush_to_disk(&self) -> Result<()> {
        self.lock()?.flush_to_disk()
    }

    /// See [`HybridStore::total_count`].
    pub fn total_count(&self) -> Result<usize> {
        Ok(self.lock()?.total_count())
    }

    /// See [`HybridStore::available_capacity_ratio`].
    pub fn available_capacity_ratio(&self) -> Result<f32> {
        Ok(self.lock()?.available_capacity_ratio())
    }
}

fn current_timestamp_millis() -> Result<Timestamp> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| StoreError::Clock(err.to_string()))?;
    Ok(now.as_millis() as i64)
}
