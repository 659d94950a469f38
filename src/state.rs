//! Persisted task state: per-dataset checkpoint metadata.
//!
//! The whole state is one ordered name -> metadata mapping treated as an
//! immutable value. Every mutation goes through the pure [`TaskState::put`],
//! and the downloader only swaps its in-memory reference to the value the
//! checkpoint store acknowledged, so memory never runs ahead of durable
//! state.

use crate::config::Settings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Checkpoint record for a single dataset.
///
/// `first_chunk..=last_chunk` is the committed and valid chunk-index range.
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Last successful content change
    pub last_update: i64,
    /// First committed chunk index (inclusive)
    pub first_chunk: u32,
    /// Last committed chunk index (inclusive)
    pub last_chunk: u32,
    /// Checksum of the last fully verified payload
    pub md5: String,
    /// Last time the dataset was confirmed current, even if unchanged
    pub last_check: i64,
}

impl DatasetMetadata {
    /// Whether this dataset is still valid under the current configuration:
    /// it must be enabled and its last confirmation must fall inside the
    /// validity window. Expiration rewinds `last_check`, keeping the entry
    /// invalid until a fresh successful check.
    pub fn is_valid(&self, name: &str, settings: &Settings, now_ms: i64) -> bool {
        if !settings.dataset_enabled(name) {
            return false;
        }
        let validity_ms = settings.dataset_validity.as_millis() as i64;
        self.last_check > now_ms - validity_ms
    }
}

/// The task's entire persisted state: an ordered dataset -> metadata map.
///
/// Copy-on-write: `put` returns a new instance and never mutates in place.
/// Entries are never removed; expiration rewrites them (see the reaper).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    datasets: BTreeMap<String, DatasetMetadata>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure insert: returns a new state with `name` bound to `meta`.
    pub fn put(&self, name: &str, meta: DatasetMetadata) -> TaskState {
        let mut datasets = self.datasets.clone();
        datasets.insert(name.to_string(), meta);
        TaskState { datasets }
    }

    pub fn get(&self, name: &str) -> Option<&DatasetMetadata> {
        self.datasets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DatasetMetadata)> {
        self.datasets.iter()
    }
}
