//! The watermark operation set.
//!
//! [`Editor`] owns the live [`Scene`] and its [`History`]. Every mutating
//! operation validates its preconditions first and then commits exactly
//! once, either directly or through a suppressed-history scope.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use wmark_common::{Clock, SystemClock, WmarkError, WmarkResult};
use wmark_scene_model::{
    Anchor, ApproximateMetrics, BackgroundImage, Color, ImageMark, Mark, NativeView, ObjectId,
    Point2D, RasterSource, Scene, Shadow, Snapshot, SnapshotError, TextMark, TextMetrics,
    ViewportTransform,
};

use crate::history::History;

/// Spacing between tile origins, added to the mark's scaled size.
pub const TILE_GAP: f64 = 50.0;

/// Opacity given to every tile.
pub const TILE_OPACITY: f64 = 0.3;

/// Largest logo width, as a fraction of the background width.
pub const LOGO_MAX_WIDTH_RATIO: f64 = 0.3;

/// New text size as a fraction of the background width.
const TEXT_SIZE_RATIO: f64 = 0.05;
const MIN_TEXT_SIZE: f64 = 20.0;

/// A property-panel edit applied to the selected mark.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEdit {
    /// Replace the text content. Text marks only.
    Text(String),
    /// CSS fill color. Text marks only.
    Fill(String),
    Opacity(f64),
    /// Uniform scale, must be positive.
    Scale(f64),
    /// Font size in pixels. Text marks only.
    FontSize(f64),
}

pub(crate) fn snapshot_error(err: SnapshotError) -> WmarkError {
    WmarkError::snapshot(err.to_string())
}

/// Live scene plus history, metrics and clock.
pub struct Editor {
    scene: Scene,
    history: History,
    metrics: Arc<dyn TextMetrics>,
    clock: Arc<dyn Clock>,
    font_family: String,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Arc::new(ApproximateMetrics), Arc::new(SystemClock))
    }
}

impl Editor {
    pub fn new(metrics: Arc<dyn TextMetrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            scene: Scene::new(),
            history: History::new(),
            metrics,
            clock,
            font_family: TextMark::default().font_family,
        }
    }

    /// Font family stored on new text marks.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn metrics(&self) -> &Arc<dyn TextMetrics> {
        &self.metrics
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Capture the scene into history (no-op while suppressed).
    pub fn commit(&mut self) -> WmarkResult<bool> {
        let committed = self
            .history
            .commit(&self.scene, self.clock.now())
            .map_err(snapshot_error)?;
        if committed {
            tracing::debug!(
                cursor = ?self.history.cursor(),
                len = self.history.len(),
                objects = self.scene.len(),
                "History commit"
            );
        }
        Ok(committed)
    }

    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> WmarkResult<bool> {
        let moved = self.history.undo(&mut self.scene).map_err(snapshot_error)?;
        if moved {
            tracing::debug!(cursor = ?self.history.cursor(), "Undo");
        }
        Ok(moved)
    }

    /// Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> WmarkResult<bool> {
        let moved = self.history.redo(&mut self.scene).map_err(snapshot_error)?;
        if moved {
            tracing::debug!(cursor = ?self.history.cursor(), "Redo");
        }
        Ok(moved)
    }

    /// Snapshot of the live scene, independent of history.
    pub fn snapshot(&self) -> WmarkResult<Snapshot> {
        Snapshot::of_scene(&self.scene, self.clock.now()).map_err(snapshot_error)
    }

    /// Enter suppressed-history mode until the returned guard drops.
    ///
    /// The guard derefs to the editor; the previous mode is restored on
    /// every exit path.
    pub fn suppressed(&mut self) -> SuppressedEditor<'_> {
        let prior = self.history.set_suppressed(true);
        SuppressedEditor {
            editor: self,
            prior,
        }
    }

    /// Run `f` with history suppressed, then commit once.
    ///
    /// On error the scene is rolled back to the last committed snapshot and
    /// nothing is committed.
    pub fn with_suppressed_history<T>(
        &mut self,
        f: impl FnOnce(&mut Editor) -> WmarkResult<T>,
    ) -> WmarkResult<T> {
        let result = {
            let mut guard = self.suppressed();
            f(&mut *guard)
        };
        match result {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(revert_err) = self.history.revert(&mut self.scene) {
                    tracing::warn!(error = %revert_err, "Failed to roll back scene");
                }
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Scene lifecycle
    // ------------------------------------------------------------------

    /// Replace the background. Clears all marks and resets history to one
    /// empty snapshot.
    pub fn load_background(&mut self, background: BackgroundImage) -> WmarkResult<()> {
        tracing::info!(
            name = %background.name,
            width = background.width,
            height = background.height,
            "Loaded background"
        );
        self.scene.set_background(background);
        self.history
            .reset(&self.scene, self.clock.now())
            .map_err(snapshot_error)
    }

    fn background(&self) -> WmarkResult<&BackgroundImage> {
        self.scene.background().ok_or(WmarkError::NoSourceImage)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Insert a centered text mark sized to the background and select it.
    pub fn add_text(&mut self) -> WmarkResult<ObjectId> {
        let background = self.background()?;
        let mut text = TextMark {
            font_family: self.font_family.clone(),
            font_size: (background.width as f64 * TEXT_SIZE_RATIO).max(MIN_TEXT_SIZE),
            position: background.center(),
            anchor: Anchor::CENTER,
            shadow: Some(Shadow::default()),
            ..TextMark::default()
        };
        text.remeasure(self.metrics.as_ref());

        let id = self.scene.insert(Mark::Text(text));
        self.scene.set_active(Some(id));
        self.commit()?;
        Ok(id)
    }

    /// Insert a centered logo and select it. Logos wider than 30% of the
    /// background are scaled down to exactly that width.
    pub fn add_logo(&mut self, source: RasterSource) -> WmarkResult<ObjectId> {
        let background = self.background()?;
        let max_width = background.width as f64 * LOGO_MAX_WIDTH_RATIO;
        let center = background.center();

        let mut image = ImageMark::new(source);
        if image.source.width as f64 > max_width {
            image.scale_to_width(max_width);
        }
        image.position = center;
        image.anchor = Anchor::CENTER;

        let id = self.scene.insert(Mark::Image(image));
        self.scene.set_active(Some(id));
        self.commit()?;
        Ok(id)
    }

    /// Remove the selected mark. `false` when nothing is selected.
    pub fn delete_active(&mut self) -> WmarkResult<bool> {
        let Some(id) = self.scene.active() else {
            return Ok(false);
        };
        self.scene.remove(id);
        self.commit()?;
        Ok(true)
    }

    /// Move the selected mark to the background center.
    pub fn center_active(&mut self) -> WmarkResult<bool> {
        let center = self.background()?.center();
        let Some(mark) = self.scene.active_mark_mut() else {
            return Ok(false);
        };
        mark.set_center(center);
        self.commit()?;
        Ok(true)
    }

    /// Replace the selected mark with a grid of translucent copies covering
    /// the background. Produces a single history entry. Returns the number
    /// of tiles.
    pub fn tile_active(&mut self) -> WmarkResult<usize> {
        let id = self.scene.active().ok_or(WmarkError::NoSelection)?;
        let template = self.scene.get(id).cloned().ok_or(WmarkError::NoSelection)?;
        let background = self.background()?;

        let (w, h) = template.scaled_size();
        let tile_w = w + TILE_GAP;
        let tile_h = h + TILE_GAP;
        let cols = (background.width as f64 / tile_w).ceil() as usize;
        let rows = (background.height as f64 / tile_h).ceil() as usize;

        let count = self.with_suppressed_history(|editor| {
            editor.scene.remove(id);
            for row in 0..rows {
                for col in 0..cols {
                    let mut tile = template.clone();
                    tile.set_anchor(Anchor::TOP_LEFT);
                    tile.set_position(Point2D::new(
                        col as f64 * tile_w + TILE_GAP / 2.0,
                        row as f64 * tile_h + TILE_GAP / 2.0,
                    ));
                    tile.set_opacity(TILE_OPACITY);
                    editor.scene.insert(tile);
                }
            }
            Ok(rows * cols)
        })?;

        tracing::debug!(cols, rows, count, "Tiled watermark");
        Ok(count)
    }

    /// Append marks (a preset or a layout file) with one history entry.
    ///
    /// Text marks without a measured box are measured on the way in.
    pub fn insert_marks(&mut self, marks: Vec<Mark>) -> WmarkResult<usize> {
        self.background()?;
        self.with_suppressed_history(|editor| {
            let count = marks.len();
            for mut mark in marks {
                if let Mark::Text(text) = &mut mark {
                    if text.width <= 0.0 || text.height <= 0.0 {
                        text.remeasure(editor.metrics.as_ref());
                    }
                }
                editor.scene.insert(mark);
            }
            Ok(count)
        })
    }

    /// Drag end: offset the selected mark and commit.
    pub fn move_active(&mut self, dx: f64, dy: f64) -> WmarkResult<bool> {
        let Some(mark) = self.scene.active_mark_mut() else {
            return Ok(false);
        };
        let p = mark.position();
        mark.set_position(Point2D::new(p.x + dx, p.y + dy));
        self.commit()?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn active(&self) -> Option<ObjectId> {
        self.scene.active()
    }

    pub fn active_mark(&self) -> Option<&Mark> {
        self.scene.active_mark()
    }

    /// Select by id. `false` for unknown ids.
    pub fn select(&mut self, id: ObjectId) -> bool {
        self.scene.set_active(Some(id))
    }

    /// Select the topmost mark under a scene point, or clear the selection
    /// when the point hits nothing.
    pub fn select_at(&mut self, point: Point2D) -> Option<ObjectId> {
        let hit = self.scene.hit_test(point);
        self.scene.set_active(hit);
        hit
    }

    /// Same as [`Editor::select_at`] for a point in screen coordinates.
    pub fn select_at_screen(&mut self, point: Point2D) -> Option<ObjectId> {
        let scene_point = self.scene.viewport().to_scene(point);
        self.select_at(scene_point)
    }

    pub fn clear_selection(&mut self) {
        self.scene.set_active(None);
    }

    // ------------------------------------------------------------------
    // Property edits
    // ------------------------------------------------------------------

    /// Apply an edit to the selected mark without committing.
    ///
    /// Returns `false` when nothing is selected or the edit does not apply
    /// to the selected mark (text edits on an image, a bad color, a
    /// non-positive size).
    pub fn preview_edit(&mut self, edit: &PropertyEdit) -> WmarkResult<bool> {
        let metrics = Arc::clone(&self.metrics);
        let Some(mark) = self.scene.active_mark_mut() else {
            return Ok(false);
        };

        let applied = match (edit, mark) {
            (PropertyEdit::Text(content), Mark::Text(text)) => {
                text.content = content.clone();
                text.remeasure(metrics.as_ref());
                true
            }
            (PropertyEdit::Fill(fill), Mark::Text(text)) => match Color::parse(fill) {
                Ok(_) => {
                    text.fill = fill.trim().to_string();
                    true
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Rejected fill color");
                    false
                }
            },
            (PropertyEdit::FontSize(size), Mark::Text(text)) if size.is_finite() && *size > 0.0 => {
                text.font_size = *size;
                text.remeasure(metrics.as_ref());
                true
            }
            (PropertyEdit::Opacity(opacity), mark) if opacity.is_finite() => {
                mark.set_opacity(*opacity);
                true
            }
            (PropertyEdit::Scale(scale), mark) if scale.is_finite() && *scale > 0.0 => {
                mark.set_scale(*scale);
                true
            }
            _ => false,
        };
        Ok(applied)
    }

    /// Commit the edits previewed so far (control released).
    pub fn commit_edit(&mut self) -> WmarkResult<bool> {
        if self.scene.active().is_none() {
            return Ok(false);
        }
        self.commit()
    }

    /// Preview and commit in one step.
    pub fn apply_edit(&mut self, edit: &PropertyEdit) -> WmarkResult<bool> {
        if !self.preview_edit(edit)? {
            return Ok(false);
        }
        self.commit_edit()
    }

    // ------------------------------------------------------------------
    // Viewport (presentation only, never committed)
    // ------------------------------------------------------------------

    pub fn viewport(&self) -> &ViewportTransform {
        self.scene.viewport()
    }

    /// Fit the background inside a container of the given size.
    pub fn fit_to_screen(&mut self, container_w: f64, container_h: f64) {
        if let Some((w, h)) = self
            .scene
            .background()
            .map(|b| (b.width as f64, b.height as f64))
        {
            *self.scene.viewport_mut() = ViewportTransform::fit(w, h, container_w, container_h);
        }
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.scene.viewport_mut().zoom_by(delta);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.scene.viewport_mut().pan_by(dx, dy);
    }

    /// Reset the viewport to 1:1 for the lifetime of the returned guard.
    pub fn native_view(&mut self) -> NativeView<'_> {
        self.scene.native_view()
    }
}

/// Guard returned by [`Editor::suppressed`].
pub struct SuppressedEditor<'a> {
    editor: &'a mut Editor,
    prior: bool,
}

impl Deref for SuppressedEditor<'_> {
    type Target = Editor;

    fn deref(&self) -> &Editor {
        self.editor
    }
}

impl DerefMut for SuppressedEditor<'_> {
    fn deref_mut(&mut self) -> &mut Editor {
        self.editor
    }
}

impl Drop for SuppressedEditor<'_> {
    fn drop(&mut self) {
        self.editor.history.set_suppressed(self.prior);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmark_common::ManualClock;

    fn editor() -> Editor {
        let mut editor = Editor::new(Arc::new(ApproximateMetrics), Arc::new(ManualClock::at_epoch()));
        editor
            .load_background(BackgroundImage::new("photo.jpg", 1000, 800, vec![0; 8]))
            .unwrap();
        editor
    }

    fn logo(width: u32, height: u32) -> RasterSource {
        RasterSource::new("image/png", width, height, vec![1, 2, 3])
    }

    #[test]
    fn test_operations_require_background() {
        let mut editor = Editor::default();
        assert!(matches!(editor.add_text(), Err(WmarkError::NoSourceImage)));
        assert!(matches!(editor.add_logo(logo(10, 10)), Err(WmarkError::NoSourceImage)));
        assert!(editor.history().is_empty());
    }

    #[test]
    fn test_add_text_defaults() {
        let mut editor = editor();
        let id = editor.add_text().unwrap();
        assert_eq!(editor.active(), Some(id));

        let text = editor.active_mark().and_then(Mark::as_text).unwrap();
        assert_eq!(text.font_size, 50.0);
        assert_eq!(text.position, Point2D::new(500.0, 400.0));
        assert_eq!(text.anchor, Anchor::CENTER);
        assert_eq!(text.shadow, Some(Shadow::default()));
        assert!(text.width > 0.0);
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn test_add_text_has_minimum_size() {
        let mut editor = editor();
        editor
            .load_background(BackgroundImage::new("small.png", 200, 100, vec![]))
            .unwrap();
        editor.add_text().unwrap();
        let text = editor.active_mark().and_then(Mark::as_text).unwrap();
        assert_eq!(text.font_size, 20.0);
    }

    #[test]
    fn test_wide_logo_is_scaled_to_thirty_percent() {
        let mut editor = editor();
        editor.add_logo(logo(600, 200)).unwrap();
        let (w, h) = editor.active_mark().unwrap().scaled_size();
        assert!((w - 300.0).abs() < 1e-9);
        assert!((h - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_narrow_logo_keeps_natural_size() {
        let mut editor = editor();
        editor.add_logo(logo(120, 40)).unwrap();
        let mark = editor.active_mark().unwrap();
        assert_eq!(mark.scale(), 1.0);
        assert_eq!(mark.center(), Point2D::new(500.0, 400.0));
    }

    #[test]
    fn test_delete_and_center_without_selection_are_noops() {
        let mut editor = editor();
        editor.add_text().unwrap();
        editor.clear_selection();
        let len = editor.history().len();
        assert!(!editor.delete_active().unwrap());
        assert!(!editor.center_active().unwrap());
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn test_center_active() {
        let mut editor = editor();
        editor.add_logo(logo(100, 100)).unwrap();
        editor.move_active(-300.0, 120.0).unwrap();
        assert!(editor.center_active().unwrap());
        assert_eq!(editor.active_mark().unwrap().center(), Point2D::new(500.0, 400.0));
    }

    #[test]
    fn test_tile_without_selection_fails_and_changes_nothing() {
        let mut editor = editor();
        editor.add_text().unwrap();
        editor.clear_selection();
        let len = editor.history().len();
        assert!(matches!(editor.tile_active(), Err(WmarkError::NoSelection)));
        assert_eq!(editor.scene().len(), 1);
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn test_tile_grid() {
        let mut editor = editor();
        editor.add_logo(logo(150, 50)).unwrap();
        let before = editor.history().len();

        // (150 + 50) x (50 + 50) on 1000 x 800 -> 5 x 8
        let count = editor.tile_active().unwrap();
        assert_eq!(count, 40);
        assert_eq!(editor.scene().len(), 40);
        assert_eq!(editor.history().len(), before + 1);
        assert_eq!(editor.active(), None);
        assert!(!editor.history().is_suppressed());

        let marks: Vec<&Mark> = editor.scene().marks().collect();
        assert!(marks.iter().all(|m| m.opacity() == TILE_OPACITY));
        assert!(marks.iter().all(|m| m.anchor() == Anchor::TOP_LEFT));
        assert_eq!(marks[0].position(), Point2D::new(25.0, 25.0));
        assert_eq!(marks[6].position(), Point2D::new(225.0, 125.0));
    }

    #[test]
    fn test_tile_is_one_undo_step() {
        let mut editor = editor();
        editor.add_logo(logo(150, 50)).unwrap();
        editor.tile_active().unwrap();
        assert!(editor.undo().unwrap());
        assert_eq!(editor.scene().len(), 1);
        assert_eq!(editor.scene().marks().next().unwrap().opacity(), 1.0);
    }

    #[test]
    fn test_undo_redo_scenario() {
        let mut editor = editor();
        editor.add_text().unwrap();
        let before = editor.scene().marks().cloned().collect::<Vec<_>>();

        assert!(editor.undo().unwrap());
        assert!(editor.scene().is_empty());
        assert!(editor.redo().unwrap());
        let after = editor.scene().marks().cloned().collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn test_new_background_resets_history() {
        let mut editor = editor();
        editor.add_text().unwrap();
        editor.add_text().unwrap();
        editor
            .load_background(BackgroundImage::new("next.png", 640, 480, vec![]))
            .unwrap();
        assert!(editor.scene().is_empty());
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.history().cursor(), Some(0));
    }

    #[test]
    fn test_suppressed_guard_restores_mode() {
        let mut editor = editor();
        {
            let mut guard = editor.suppressed();
            guard.add_text().unwrap();
            assert!(guard.history().is_suppressed());
        }
        assert!(!editor.history().is_suppressed());
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_failed_suppressed_scope_rolls_back() {
        let mut editor = editor();
        editor.add_text().unwrap();
        let len = editor.history().len();

        let result: WmarkResult<()> = editor.with_suppressed_history(|e| {
            e.add_text()?;
            e.add_text()?;
            Err(WmarkError::render("boom"))
        });
        assert!(result.is_err());
        assert_eq!(editor.scene().len(), 1);
        assert_eq!(editor.history().len(), len);
        assert!(!editor.history().is_suppressed());
    }

    #[test]
    fn test_preview_then_commit_edit() {
        let mut editor = editor();
        editor.add_text().unwrap();
        let len = editor.history().len();

        for value in [0.9, 0.7, 0.5] {
            assert!(editor.preview_edit(&PropertyEdit::Opacity(value)).unwrap());
        }
        assert_eq!(editor.history().len(), len);
        assert!(editor.commit_edit().unwrap());
        assert_eq!(editor.history().len(), len + 1);
        assert_eq!(editor.active_mark().unwrap().opacity(), 0.5);
    }

    #[test]
    fn test_text_edits_remeasure_and_skip_images() {
        let mut editor = editor();
        editor.add_text().unwrap();
        let width = editor.active_mark().unwrap().intrinsic_size().0;
        editor
            .apply_edit(&PropertyEdit::Text("© A much longer watermark".into()))
            .unwrap();
        assert!(editor.active_mark().unwrap().intrinsic_size().0 > width);

        editor.add_logo(logo(10, 10)).unwrap();
        let len = editor.history().len();
        assert!(!editor.apply_edit(&PropertyEdit::Text("nope".into())).unwrap());
        assert!(!editor.apply_edit(&PropertyEdit::FontSize(12.0)).unwrap());
        assert_eq!(editor.history().len(), len);
    }

    #[test]
    fn test_bad_fill_is_rejected() {
        let mut editor = editor();
        editor.add_text().unwrap();
        assert!(!editor.apply_edit(&PropertyEdit::Fill("not-a-color".into())).unwrap());
        assert!(editor.apply_edit(&PropertyEdit::Fill("#ff0000".into())).unwrap());
        assert_eq!(editor.active_mark().and_then(Mark::as_text).unwrap().fill, "#ff0000");
        assert!(!editor.apply_edit(&PropertyEdit::Scale(0.0)).unwrap());
    }

    #[test]
    fn test_select_at_screen_uses_viewport() {
        let mut editor = editor();
        let id = editor.add_logo(logo(100, 100)).unwrap();
        editor.clear_selection();
        editor.fit_to_screen(560.0, 460.0);
        // fit: zoom 0.5, no pan -> scene (500, 400) is screen (250, 200)
        assert_eq!(editor.select_at_screen(Point2D::new(250.0, 200.0)), Some(id));
        assert_eq!(editor.select_at(Point2D::new(5.0, 5.0)), None);
        assert_eq!(editor.active(), None);
    }

    #[test]
    fn test_viewport_changes_do_not_commit() {
        let mut editor = editor();
        editor.add_text().unwrap();
        let len = editor.history().len();
        editor.zoom_by(1.0);
        editor.pan_by(10.0, 10.0);
        assert_eq!(editor.history().len(), len);
        assert!(editor.undo().unwrap());
        assert_eq!(editor.viewport().zoom, 2.0);
    }

    #[test]
    fn test_insert_marks_is_one_commit() {
        let mut editor = editor();
        let marks = vec![
            Mark::Text(TextMark::default()),
            Mark::Image(ImageMark::new(logo(5, 5))),
        ];
        let len = editor.history().len();
        assert_eq!(editor.insert_marks(marks).unwrap(), 2);
        assert_eq!(editor.history().len(), len + 1);
        let text = editor.scene().marks().next().and_then(Mark::as_text).unwrap();
        assert!(text.width > 0.0);
    }
}
