//! Explicit application state.
//!
//! A [`Workspace`] bundles the editor, the batch queue, the export settings
//! and the persisted store. It is constructed once and handed to whatever
//! drives it (the CLI, the export pipeline, tests).

use std::path::Path;

use wmark_common::{WmarkError, WmarkResult};
use wmark_scene_model::{BackgroundImage, ExportSettings, ObjectId, RasterSource};

use crate::activity::{ActivityEntry, ActivityKind, ActivityLog};
use crate::editor::{snapshot_error, Editor};
use crate::presets::PresetStore;
use crate::queue::BatchQueue;
use crate::store::KeyValueStore;

/// Turns raw file bytes into scene inputs. Implemented by the render engine.
pub trait SourceDecoder {
    /// Decode a background image and measure its native size.
    fn decode_background(&self, name: &str, bytes: Vec<u8>) -> WmarkResult<BackgroundImage>;

    /// Decode a logo and measure its natural size.
    fn decode_raster(&self, bytes: Vec<u8>) -> WmarkResult<RasterSource>;
}

pub struct Workspace<S: KeyValueStore> {
    editor: Editor,
    queue: BatchQueue,
    settings: ExportSettings,
    store: S,
}

impl<S: KeyValueStore> Workspace<S> {
    pub fn new(editor: Editor, store: S) -> Self {
        Self {
            editor,
            queue: BatchQueue::default(),
            settings: ExportSettings::default(),
            store,
        }
    }

    pub fn with_settings(mut self, settings: ExportSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn queue(&self) -> &BatchQueue {
        &self.queue
    }

    pub fn settings(&self) -> ExportSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: ExportSettings) {
        self.settings = settings;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// A new file selection: the first file becomes the background (which
    /// clears marks and history) and the queue is replaced by all of them.
    ///
    /// Every path is checked before anything changes. Returns `false` for
    /// an empty selection.
    pub fn open_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        decoder: &dyn SourceDecoder,
    ) -> WmarkResult<bool> {
        let queue = BatchQueue::from_paths(paths)?;
        let Some(first) = queue.first() else {
            return Ok(false);
        };
        let bytes = std::fs::read(&first.path)?;
        let background = decoder.decode_background(&first.name, bytes)?;
        self.editor.load_background(background)?;

        tracing::info!(
            files = queue.len(),
            total_mb = queue.total_bytes() as f64 / (1024.0 * 1024.0),
            "Queued files"
        );
        self.queue = queue;
        Ok(true)
    }

    /// Read, decode and insert a logo file.
    pub fn add_logo_file(
        &mut self,
        path: impl AsRef<Path>,
        decoder: &dyn SourceDecoder,
    ) -> WmarkResult<ObjectId> {
        if self.editor.scene().background().is_none() {
            return Err(WmarkError::NoSourceImage);
        }
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|_| WmarkError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let source = decoder.decode_raster(bytes)?;
        self.editor.add_logo(source)
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    /// Save the current marks under `name`, replacing any existing preset.
    pub fn save_preset(&mut self, name: &str) -> WmarkResult<()> {
        let snapshot = self.editor.snapshot()?;
        PresetStore::new(&mut self.store).save(name, &snapshot)
    }

    /// Append a preset's marks to the scene with one history entry.
    /// Unknown names are a no-op returning `false`.
    pub fn load_preset(&mut self, name: &str) -> WmarkResult<bool> {
        let now = self.editor.clock().now();
        let Some(snapshot) = PresetStore::new(&mut self.store).get(name, now)? else {
            tracing::debug!(name, "No such preset");
            return Ok(false);
        };
        let marks = snapshot.decode().map_err(snapshot_error)?;
        let count = self.editor.insert_marks(marks)?;
        tracing::info!(name, objects = count, "Loaded preset");
        Ok(true)
    }

    pub fn remove_preset(&mut self, name: &str) -> WmarkResult<bool> {
        PresetStore::new(&mut self.store).remove(name)
    }

    pub fn preset_names(&mut self) -> Vec<String> {
        PresetStore::new(&mut self.store).list()
    }

    // ------------------------------------------------------------------
    // Activity log
    // ------------------------------------------------------------------

    /// Append an activity entry for a finished export. Best-effort: a
    /// storage failure is logged, never returned.
    pub fn record_activity(&mut self, kind: ActivityKind, label: impl Into<String>, object_count: usize) {
        let now = self.editor.clock().now();
        let entry = ActivityEntry {
            id: now.timestamp_millis(),
            recorded_at: now,
            kind,
            label: label.into(),
            format: self.settings.format,
            quality: self.settings.quality(),
            object_count,
        };
        if let Err(err) = ActivityLog::new(&mut self.store).record(entry) {
            tracing::warn!(error = %err, "Failed to record activity");
        }
    }

    pub fn activity(&mut self) -> Vec<ActivityEntry> {
        ActivityLog::new(&mut self.store).entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use wmark_common::ManualClock;
    use wmark_scene_model::{ApproximateMetrics, ExportFormat, Mark, Point2D};

    use crate::store::MemoryStore;

    /// Reads a `WxH` header instead of real image data.
    struct FakeDecoder;

    fn parse_size(bytes: &[u8]) -> WmarkResult<(u32, u32)> {
        let text = std::str::from_utf8(bytes).map_err(|e| WmarkError::decode(e.to_string()))?;
        let (w, h) = text
            .trim()
            .split_once('x')
            .ok_or_else(|| WmarkError::decode("no size header"))?;
        let parse = |v: &str| v.parse::<u32>().map_err(|e| WmarkError::decode(e.to_string()));
        Ok((parse(w)?, parse(h)?))
    }

    impl SourceDecoder for FakeDecoder {
        fn decode_background(&self, name: &str, bytes: Vec<u8>) -> WmarkResult<BackgroundImage> {
            let (w, h) = parse_size(&bytes)?;
            Ok(BackgroundImage::new(name, w, h, bytes))
        }

        fn decode_raster(&self, bytes: Vec<u8>) -> WmarkResult<RasterSource> {
            let (w, h) = parse_size(&bytes)?;
            Ok(RasterSource::new("image/png", w, h, bytes))
        }
    }

    fn workspace() -> Workspace<MemoryStore> {
        let editor = Editor::new(Arc::new(ApproximateMetrics), Arc::new(ManualClock::at_epoch()));
        Workspace::new(editor, MemoryStore::new())
            .with_settings(ExportSettings::new(ExportFormat::Jpeg, 80))
    }

    #[test]
    fn test_open_files_loads_first_and_queues_all() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, "1000x800").unwrap();
        std::fs::write(&b, "300x200").unwrap();

        let mut ws = workspace();
        assert!(ws.open_files(&[&a, &b], &FakeDecoder).unwrap());
        assert_eq!(ws.queue().len(), 2);
        let background = ws.editor().scene().background().unwrap();
        assert_eq!((background.name.as_str(), background.width), ("a.png", 1000));
    }

    #[test]
    fn test_open_files_with_missing_path_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        std::fs::write(&a, "1000x800").unwrap();

        let mut ws = workspace();
        ws.open_files(&[&a], &FakeDecoder).unwrap();
        ws.editor_mut().add_text().unwrap();

        let missing = dir.path().join("missing.png");
        assert!(ws.open_files(&[&a, &missing], &FakeDecoder).is_err());
        assert_eq!(ws.queue().len(), 1);
        assert_eq!(ws.editor().scene().len(), 1);
    }

    #[test]
    fn test_empty_selection_is_ignored() {
        let mut ws = workspace();
        let none: [&Path; 0] = [];
        assert!(!ws.open_files(&none, &FakeDecoder).unwrap());
    }

    #[test]
    fn test_logo_file_requires_background() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.png");
        std::fs::write(&logo, "50x50").unwrap();
        let mut ws = workspace();
        assert!(matches!(
            ws.add_logo_file(&logo, &FakeDecoder),
            Err(WmarkError::NoSourceImage)
        ));
    }

    #[test]
    fn test_preset_survives_new_background() {
        let mut ws = workspace();
        ws.editor_mut()
            .load_background(BackgroundImage::new("a.png", 1000, 800, vec![]))
            .unwrap();
        ws.editor_mut().add_text().unwrap();
        ws.editor_mut().move_active(-200.0, -100.0).unwrap();
        ws.editor_mut()
            .add_logo(RasterSource::new("image/png", 80, 40, vec![1]))
            .unwrap();
        let saved: Vec<Mark> = ws.editor().scene().marks().cloned().collect();
        ws.save_preset("brand").unwrap();

        ws.editor_mut()
            .load_background(BackgroundImage::new("b.png", 400, 300, vec![]))
            .unwrap();
        assert!(ws.load_preset("brand").unwrap());

        let loaded: Vec<Mark> = ws.editor().scene().marks().cloned().collect();
        assert_eq!(loaded, saved);
        assert_eq!(loaded[0].position(), Point2D::new(300.0, 300.0));
        assert_eq!(ws.editor().history().len(), 2);
        assert_eq!(ws.editor().history().cursor(), Some(1));
    }

    #[test]
    fn test_preset_load_appends() {
        let mut ws = workspace();
        ws.editor_mut()
            .load_background(BackgroundImage::new("a.png", 1000, 800, vec![]))
            .unwrap();
        ws.editor_mut().add_text().unwrap();
        ws.save_preset("one").unwrap();
        assert!(ws.load_preset("one").unwrap());
        assert_eq!(ws.editor().scene().len(), 2);
    }

    #[test]
    fn test_unknown_preset_is_noop() {
        let mut ws = workspace();
        ws.editor_mut()
            .load_background(BackgroundImage::new("a.png", 1000, 800, vec![]))
            .unwrap();
        assert!(!ws.load_preset("ghost").unwrap());
        assert_eq!(ws.editor().history().len(), 1);
    }

    #[test]
    fn test_record_activity_uses_settings() {
        let mut ws = workspace();
        ws.record_activity(ActivityKind::Batch, "3 Images", 2);
        let entries = ws.activity();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "3 Images");
        assert_eq!(entries[0].format, ExportFormat::Jpeg);
        assert_eq!(entries[0].quality, 80);
        assert_eq!(entries[0].object_count, 2);
    }
}
