//! Cairn - Hybrid Time-Sharded Sensor Reading Store
//!
//! This crate provides the storage core for continuously ingested,
//! timestamped sensor readings: an in-memory buffer with a flush policy in
//! front of an on-disk, time-sharded file layout.
//!
//! # Components
//!
//! - [`HybridStore`]: ingestion-facing buffer with a capacity/schedule flush policy
//! - [`Persister`]: sharded on-disk persistence with range retrieval
//! - [`ShardIndexer`]: timestamp to fixed-width shard mapping
//! - [`ShardFileCache`]: cache of decoded shard files
//!
//! # Example
//!
//! ```rust,ignore
//! use cairn::{HybridStore, Persister, Reading, StoreConfig};
//!
//! // One store per sensor, rooted at its own directory
//! let persister = Persister::new("/data/readings/temperature")?;
//! let mut store = HybridStore::new(persister, StoreConfig::default());
//!
//! // Ingest readings; the store flushes to disk per its policy
//! store.save(Reading::new(21.5_f32, now_millis))?;
//!
//! // Range reads merge buffered and persisted readings
//! let recent = store.retrieve(now_millis - 60_000)?;
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod reading;
pub mod shard;
pub mod store;

pub use error::{Result, StoreError};
pub use reading::{Reading, SensorValue, Timestamp};
pub use shard::{EPOCH, Persister, SHARD_WIDTH, ShardFileCache, ShardIndexer, TimeRange};
pub use store::{FlushPolicy, HybridStore, SharedStore, StoreConfig};
