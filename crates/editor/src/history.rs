//! Linear undo/redo history of scene snapshots.
//!
//! The history owns an ordered list of snapshots and a cursor into it.
//! Committing while the cursor is behind the end discards the redo branch.
//! After every undo or redo the live scene holds exactly the marks decoded
//! from the snapshot under the cursor, so cycling never drifts.

use chrono::{DateTime, Utc};

use wmark_scene_model::{Scene, Snapshot, SnapshotError};

/// Snapshot stack plus cursor and the suppression flag.
#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
    /// `None` until the first snapshot exists.
    cursor: Option<usize>,
    suppressed: bool,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the scene. No-op (returns `false`) while suppressed.
    pub fn commit(&mut self, scene: &Scene, taken_at: DateTime<Utc>) -> Result<bool, SnapshotError> {
        if self.suppressed {
            return Ok(false);
        }
        let snapshot = Snapshot::of_scene(scene, taken_at)?;
        self.push(snapshot);
        Ok(true)
    }

    fn push(&mut self, snapshot: Snapshot) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.snapshots.truncate(keep);
        self.snapshots.push(snapshot);
        self.cursor = Some(self.snapshots.len() - 1);
    }

    /// Drop everything and start over from the given scene.
    ///
    /// Ignores suppression: a reset always leaves exactly one snapshot.
    pub fn reset(&mut self, scene: &Scene, taken_at: DateTime<Utc>) -> Result<(), SnapshotError> {
        let snapshot = Snapshot::of_scene(scene, taken_at)?;
        self.snapshots.clear();
        self.cursor = None;
        self.push(snapshot);
        Ok(())
    }

    /// Step back one snapshot and restore it into `scene`.
    ///
    /// Returns `false` at the boundary or on an empty history.
    pub fn undo(&mut self, scene: &mut Scene) -> Result<bool, SnapshotError> {
        match self.cursor {
            Some(cursor) if cursor > 0 => self.restore(cursor - 1, scene).map(|_| true),
            _ => Ok(false),
        }
    }

    /// Step forward one snapshot and restore it into `scene`.
    pub fn redo(&mut self, scene: &mut Scene) -> Result<bool, SnapshotError> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.snapshots.len() => {
                self.restore(cursor + 1, scene).map(|_| true)
            }
            _ => Ok(false),
        }
    }

    /// Put the scene back to the snapshot under the cursor. An empty
    /// history restores an empty mark list.
    pub fn revert(&self, scene: &mut Scene) -> Result<(), SnapshotError> {
        let marks = match self.current() {
            Some(snapshot) => snapshot.decode()?,
            None => Vec::new(),
        };
        scene.replace_marks(marks);
        Ok(())
    }

    // Decode before moving the cursor so a failure leaves both untouched.
    fn restore(&mut self, index: usize, scene: &mut Scene) -> Result<(), SnapshotError> {
        let marks = self.snapshots[index].decode()?;
        scene.replace_marks(marks);
        self.cursor = Some(index);
        Ok(())
    }

    /// Set the suppression flag, returning the previous value.
    pub fn set_suppressed(&mut self, suppressed: bool) -> bool {
        std::mem::replace(&mut self.suppressed, suppressed)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.snapshots.len())
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.map(|c| &self.snapshots[c])
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmark_scene_model::{BackgroundImage, Mark, Point2D, TextMark};

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_background(BackgroundImage::new("bg.png", 1000, 800, vec![]));
        scene
    }

    fn text(x: f64) -> Mark {
        Mark::Text(TextMark {
            position: Point2D::new(x, 10.0),
            ..TextMark::default()
        })
    }

    #[test]
    fn test_empty_history_is_noop() {
        let mut history = History::new();
        let mut scene = scene();
        assert!(!history.undo(&mut scene).unwrap());
        assert!(!history.redo(&mut scene).unwrap());
        assert_eq!(history.cursor(), None);
        assert!(history.current().is_none());
    }

    #[test]
    fn test_undo_redo_restores_scene() {
        let mut history = History::new();
        let mut scene = scene();
        history.reset(&scene, at()).unwrap();

        scene.insert(text(1.0));
        history.commit(&scene, at()).unwrap();
        assert_eq!(history.len(), 2);

        assert!(history.undo(&mut scene).unwrap());
        assert!(scene.is_empty());
        assert!(!history.undo(&mut scene).unwrap());

        assert!(history.redo(&mut scene).unwrap());
        assert_eq!(scene.len(), 1);
        assert!(!history.redo(&mut scene).unwrap());
    }

    #[test]
    fn test_commit_prunes_redo_branch() {
        let mut history = History::new();
        let mut scene = scene();
        history.reset(&scene, at()).unwrap();
        for x in 0..3 {
            scene.insert(text(x as f64));
            history.commit(&scene, at()).unwrap();
        }
        history.undo(&mut scene).unwrap();
        history.undo(&mut scene).unwrap();
        assert_eq!(history.cursor(), Some(1));

        scene.insert(text(99.0));
        history.commit(&scene, at()).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_suppressed_commit_is_noop() {
        let mut history = History::new();
        let scene = scene();
        history.reset(&scene, at()).unwrap();
        assert!(!history.set_suppressed(true));
        assert!(!history.commit(&scene, at()).unwrap());
        assert_eq!(history.len(), 1);
        assert!(history.set_suppressed(false));
        assert!(history.commit(&scene, at()).unwrap());
    }

    #[test]
    fn test_reset_leaves_single_snapshot() {
        let mut history = History::new();
        let mut scene = scene();
        history.reset(&scene, at()).unwrap();
        scene.insert(text(1.0));
        history.commit(&scene, at()).unwrap();

        history.reset(&scene, at()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_revert_discards_uncommitted_marks() {
        let mut history = History::new();
        let mut scene = scene();
        history.reset(&scene, at()).unwrap();
        scene.insert(text(1.0));
        history.revert(&mut scene).unwrap();
        assert!(scene.is_empty());
    }
}
