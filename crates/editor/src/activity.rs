//! Capped audit log of completed exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wmark_common::WmarkResult;
use wmark_scene_model::ExportFormat;

use crate::store::KeyValueStore;

/// Store key holding the log.
pub const ACTIVITY_KEY: &str = "activity_log";

/// Entries kept; older ones are evicted.
pub const ACTIVITY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Single,
    Batch,
}

/// One export record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Millisecond timestamp, doubles as the entry id.
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub kind: ActivityKind,
    /// File name for single exports, `"<n> Images"` for batches.
    pub label: String,
    pub format: ExportFormat,
    pub quality: u8,
    pub object_count: usize,
}

/// Activity log view over a key-value store. Newest entries come first.
pub struct ActivityLog<'a, S: KeyValueStore> {
    store: &'a mut S,
}

impl<'a, S: KeyValueStore> ActivityLog<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.store.get_json(ACTIVITY_KEY).unwrap_or_default()
    }

    /// Prepend an entry, evicting the oldest past the cap.
    pub fn record(&mut self, entry: ActivityEntry) -> WmarkResult<()> {
        let mut entries = self.entries();
        entries.insert(0, entry);
        entries.truncate(ACTIVITY_CAPACITY);
        self.store.set_json(ACTIVITY_KEY, &entries)
    }

    pub fn clear(&mut self) -> WmarkResult<bool> {
        self.store.remove(ACTIVITY_KEY)
    }
}
