//! Records of buffer statistics.
//!
//! [`SegmentBuffer::stats`](crate::SegmentBuffer::stats) and
//! [`KeyedBufferRouter::stats`](crate::KeyedBufferRouter::stats) summarize the
//! content of the buffers as a [`Record`], which can be handed to whatever
//! logger the training loop uses.
//!
//! ```rust
//! use segment_buffer::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("num_episodes", 3.0);
//! record.insert("episode_lengths", RecordValue::Array1(vec![10.0, 7.0, 12.0]));
//! assert_eq!(record.get_scalar("num_episodes").unwrap(), 3.0);
//! ```
use crate::error::SegmentBufferError;
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, e.g., the number of stored episodes.
    Scalar(f32),

    /// A 1-dimensional array of floating-point values, e.g., episode lengths.
    Array1(Vec<f32>),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of buffer statistics.
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<'_, String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns an iterator that consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges another record into this one in place, prefixing its keys.
    ///
    /// Keys become `"{prefix}/{key}"`. Existing keys are overwritten.
    pub fn merge_with_prefix(&mut self, prefix: &str, record: Record) {
        for (k, v) in record.into_iter_in_record() {
            self.0.insert(format!("{}/{}", prefix, k), v);
        }
    }

    /// Gets a scalar value from the record.
    pub fn get_scalar(&self, k: &str) -> Result<f32, SegmentBufferError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(SegmentBufferError::RecordValueTypeError(
                "Scalar".to_string(),
            )),
            None => Err(SegmentBufferError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array from the record.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, SegmentBufferError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(SegmentBufferError::RecordValueTypeError(
                "Array1".to_string(),
            )),
            None => Err(SegmentBufferError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, SegmentBufferError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(SegmentBufferError::RecordValueTypeError(
                "String".to_string(),
            )),
            None => Err(SegmentBufferError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
