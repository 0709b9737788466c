//! Named snapshots persisted independently of history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use wmark_common::{WmarkError, WmarkResult};
use wmark_scene_model::Snapshot;

use crate::editor::snapshot_error;
use crate::store::KeyValueStore;

/// Store key holding the name -> snapshot document mapping.
pub const PRESETS_KEY: &str = "presets";

/// Preset view over a key-value store.
pub struct PresetStore<'a, S: KeyValueStore> {
    store: &'a mut S,
}

impl<'a, S: KeyValueStore> PresetStore<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    fn entries(&self) -> BTreeMap<String, serde_json::Value> {
        self.store.get_json(PRESETS_KEY).unwrap_or_default()
    }

    /// Store `snapshot` under `name`, silently replacing an existing entry.
    pub fn save(&mut self, name: &str, snapshot: &Snapshot) -> WmarkResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WmarkError::storage("Preset name cannot be empty"));
        }
        let mut entries = self.entries();
        let replaced = entries
            .insert(name.to_string(), snapshot.to_value().map_err(snapshot_error)?)
            .is_some();
        self.store.set_json(PRESETS_KEY, &entries)?;
        tracing::info!(
            name,
            objects = snapshot.object_count(),
            replaced,
            "Saved preset"
        );
        Ok(())
    }

    /// Stored names in name order.
    pub fn list(&self) -> Vec<String> {
        self.entries().into_keys().collect()
    }

    /// Fetch a preset. `Ok(None)` for unknown names.
    pub fn get(&self, name: &str, taken_at: DateTime<Utc>) -> WmarkResult<Option<Snapshot>> {
        match self.entries().remove(name.trim()) {
            Some(value) => Snapshot::from_value(value, taken_at)
                .map(Some)
                .map_err(snapshot_error),
            None => Ok(None),
        }
    }

    /// Delete a preset. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> WmarkResult<bool> {
        let mut entries = self.entries();
        if entries.remove(name.trim()).is_none() {
            return Ok(false);
        }
        self.store.set_json(PRESETS_KEY, &entries)?;
        tracing::info!(name, "Deleted preset");
        Ok(true)
    }
}
