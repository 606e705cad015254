//! Error and Result types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A convenience `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// The error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A time range whose start does not precede its end.
    #[error("Invalid time range: from {from} must precede to {to}")]
    InvalidRange {
        /// Start of the rejected range (unix milliseconds).
        from: i64,
        /// End of the rejected range (unix milliseconds).
        to: i64,
    },

    /// A string that does not decode as a canonical time range.
    #[error("Invalid range encoding: {0:?}")]
    InvalidEncoding(String),

    /// A timestamp predating the fixed shard epoch.
    #[error("Timestamp {timestamp} predates the shard epoch {epoch}")]
    BeforeEpoch {
        /// The rejected timestamp (unix milliseconds).
        timestamp: i64,
        /// The fixed shard epoch (unix milliseconds).
        epoch: i64,
    },

    /// An attempt to persist an empty batch.
    #[error("Nothing to persist: the batch is empty")]
    NothingToPersist,

    /// A shard file with this name already exists.
    ///
    /// File names are derived from batch contents, so a collision indicates
    /// a logic or clock error rather than a retryable condition.
    #[error("Shard file already exists: {path:?}")]
    WriteConflict {
        /// The conflicting file path.
        path: PathBuf,
    },

    /// A shard file whose contents fail to decode.
    #[error("Corrupt shard file {path:?}: {source}")]
    CorruptShardFile {
        /// The file that failed to decode.
        path: PathBuf,
        /// The underlying decode error.
        source: serde_json::Error,
    },

    /// Error while encoding a batch for persistence.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The system clock read before the unix epoch.
    #[error("System clock error: {0}")]
    Clock(String),

    /// A shared store lock was poisoned by a panicking holder.
    #[error("Store lock poisoned")]
    Poisoned,
}
