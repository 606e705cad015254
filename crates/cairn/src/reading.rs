//! The stored reading value type and the sensor value trait bound.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Unix-millisecond timestamp.
pub type Timestamp = i64;

/// Bounds required of a sensor's numeric output type.
///
/// Values must be copyable, comparable, printable for display layers, and
/// serializable into the self-describing shard-file encoding. The blanket
/// implementation makes plain numeric types (`f32`, `f64`, `i64`, ...)
/// qualify without further ceremony.
pub trait SensorValue:
    Copy + PartialOrd + Display + Serialize + DeserializeOwned + Send + 'static
{
}

impl<T> SensorValue for T where
    T: Copy + PartialOrd + Display + Serialize + DeserializeOwned + Send + 'static
{
}

/// A single timestamped sensor reading.
///
/// Readings carry only a value and a capture time; sensor identity is
/// implied by which store a reading lives in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading<V> {
    /// The sensor's output value.
    pub value: V,
    /// Capture time, unix milliseconds.
    pub timestamp: Timestamp,
}

impl<V: SensorValue> Reading<V> {
    /// Creates a reading from a value and its capture time.
    pub fn new(value: V, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_json_roundtrip() {
        let reading = Reading::new(21.5_f64, 1_702_166_401_000);
        let encoded = serde_json::to_string(&reading).unwrap();
        let decoded: Reading<f64> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, reading);
    }

    #[test]
    fn test_reading_encoding_is_self_describing() {
        let reading = Reading::new(42_i64, 1_702_166_400_123);
        let encoded = serde_json::to_string(&reading).unwrap();
        assert!(encoded.contains("\"value\""));
        assert!(encoded.contains("\"timestamp\""));
    }
}
