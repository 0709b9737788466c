//! The live editable scene.
//!
//! A scene exclusively owns its marks. Snapshots taken from it are
//! independent copies; nothing outside the scene holds a live reference to
//! a mark, so undo/redo and batch replay cannot alias it.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::object::Mark;
use crate::viewport::{Point2D, ViewportTransform};

/// Runtime identity of a mark inside one scene.
///
/// Volatile: never serialized, reassigned whenever marks are re-materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A mark placed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkObject {
    id: ObjectId,
    pub mark: Mark,
}

impl WatermarkObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// The loaded source image the marks are placed on.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    /// Original file name.
    pub name: String,
    /// Native pixel width.
    pub width: u32,
    /// Native pixel height.
    pub height: u32,
    /// Encoded bytes as read from disk.
    pub data: Arc<Vec<u8>>,
}

impl BackgroundImage {
    pub fn new(name: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            data: Arc::new(data),
        }
    }

    /// Geometric center in scene pixels.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Background, ordered marks, selection and the presentation viewport.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    background: Option<BackgroundImage>,
    objects: Vec<WatermarkObject>,
    active: Option<ObjectId>,
    viewport: ViewportTransform,
    next_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the background. Drops every mark and the selection.
    pub fn set_background(&mut self, background: BackgroundImage) {
        self.background = Some(background);
        self.objects.clear();
        self.active = None;
        self.viewport = ViewportTransform::IDENTITY;
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    /// Marks in paint order (first is bottom-most).
    pub fn objects(&self) -> &[WatermarkObject] {
        &self.objects
    }

    /// Iterate the marks in paint order.
    pub fn marks(&self) -> impl Iterator<Item = &Mark> {
        self.objects.iter().map(|o| &o.mark)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append a mark on top and return its new id.
    pub fn insert(&mut self, mark: Mark) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.push(WatermarkObject { id, mark });
        id
    }

    /// Remove a mark. Clears the selection if it pointed at it.
    pub fn remove(&mut self, id: ObjectId) -> Option<Mark> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Some(self.objects.remove(index).mark)
    }

    /// Replace all marks with fresh instances. Clears the selection.
    pub fn replace_marks(&mut self, marks: Vec<Mark>) {
        self.objects.clear();
        self.active = None;
        for mark in marks {
            self.insert(mark);
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&Mark> {
        self.objects.iter().find(|o| o.id == id).map(|o| &o.mark)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Mark> {
        self.objects
            .iter_mut()
            .find(|o| o.id == id)
            .map(|o| &mut o.mark)
    }

    /// Currently selected object id.
    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    /// Currently selected mark.
    pub fn active_mark(&self) -> Option<&Mark> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_mark_mut(&mut self) -> Option<&mut Mark> {
        let id = self.active?;
        self.get_mut(id)
    }

    /// Select `id` (or clear with `None`). Returns false for unknown ids.
    pub fn set_active(&mut self, id: Option<ObjectId>) -> bool {
        match id {
            Some(id) if self.get(id).is_none() => false,
            _ => {
                self.active = id;
                true
            }
        }
    }

    /// Topmost mark whose bounds contain the scene point.
    pub fn hit_test(&self, p: Point2D) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.mark.contains(p))
            .map(|o| o.id)
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportTransform {
        &mut self.viewport
    }

    /// Reset the viewport to 1:1 for as long as the returned guard lives.
    /// The previous viewport comes back when the guard drops, whatever the
    /// exit path.
    pub fn native_view(&mut self) -> NativeView<'_> {
        let saved = std::mem::replace(&mut self.viewport, ViewportTransform::IDENTITY);
        NativeView { scene: self, saved }
    }
}

/// Scope guard returned by [`Scene::native_view`].
pub struct NativeView<'a> {
    scene: &'a mut Scene,
    saved: ViewportTransform,
}

impl Deref for NativeView<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for NativeView<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for NativeView<'_> {
    fn drop(&mut self) {
        self.scene.viewport = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ImageMark, RasterSource, TextMark};

    fn scene_with_background() -> Scene {
        let mut scene = Scene::new();
        scene.set_background(BackgroundImage::new("photo.png", 1000, 800, vec![0; 16]));
        scene
    }

    fn square(x: f64, y: f64) -> Mark {
        let mut image = ImageMark::new(RasterSource::new("image/png", 100, 100, vec![]));
        image.position = Point2D::new(x, y);
        Mark::Image(image)
    }

    #[test]
    fn test_insert_assigns_unique_ids() {
        let mut scene = scene_with_background();
        let a = scene.insert(Mark::Text(TextMark::default()));
        let b = scene.insert(Mark::Text(TextMark::default()));
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut scene = scene_with_background();
        let id = scene.insert(square(10.0, 10.0));
        assert!(scene.set_active(Some(id)));
        assert!(scene.remove(id).is_some());
        assert_eq!(scene.active(), None);
        assert!(scene.remove(id).is_none());
    }

    #[test]
    fn test_set_active_rejects_unknown_id() {
        let mut scene = scene_with_background();
        let id = scene.insert(square(10.0, 10.0));
        scene.remove(id);
        assert!(!scene.set_active(Some(id)));
        assert!(scene.set_active(None));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut scene = scene_with_background();
        let bottom = scene.insert(square(100.0, 100.0));
        let top = scene.insert(square(120.0, 120.0));
        assert_eq!(scene.hit_test(Point2D::new(110.0, 110.0)), Some(top));
        assert_eq!(scene.hit_test(Point2D::new(60.0, 60.0)), Some(bottom));
        assert_eq!(scene.hit_test(Point2D::new(900.0, 700.0)), None);
    }

    #[test]
    fn test_new_background_clears_marks() {
        let mut scene = scene_with_background();
        scene.insert(square(10.0, 10.0));
        scene.viewport_mut().zoom_by(1.0);
        scene.set_background(BackgroundImage::new("other.png", 640, 480, vec![]));
        assert!(scene.is_empty());
        assert!(scene.viewport().is_identity());
        assert_eq!(scene.background().map(|b| b.width), Some(640));
    }

    #[test]
    fn test_native_view_restores_viewport() {
        let mut scene = scene_with_background();
        *scene.viewport_mut() = ViewportTransform::new(0.5, 30.0, 40.0);
        {
            let view = scene.native_view();
            assert!(view.viewport().is_identity());
        }
        assert_eq!(*scene.viewport(), ViewportTransform::new(0.5, 30.0, 40.0));
    }

    #[test]
    fn test_replace_marks_reassigns_ids() {
        let mut scene = scene_with_background();
        let old = scene.insert(square(10.0, 10.0));
        scene.set_active(Some(old));
        scene.replace_marks(vec![square(10.0, 10.0)]);
        assert_eq!(scene.len(), 1);
        assert_ne!(scene.objects()[0].id(), old);
        assert_eq!(scene.active(), None);
    }
}
