//! Geometry primitives and the interactive viewport transform.
//!
//! Scene coordinates are background pixels at scale 1. The viewport maps
//! them to screen coordinates for display only.

use serde::{Deserialize, Serialize};

/// A 2D point in scene (or screen) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// The center point of this rectangle.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Check if a point lies within this rectangle (edges inclusive).
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// Zoom and pan applied to the editing surface.
///
/// Presentation-only: never stored in snapshots and ignored by export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    /// Screen pixels per scene pixel.
    pub zoom: f64,
    /// Horizontal pan in screen pixels.
    pub pan_x: f64,
    /// Vertical pan in screen pixels.
    pub pan_y: f64,
}

impl ViewportTransform {
    /// 1:1, no pan.
    pub const IDENTITY: ViewportTransform = ViewportTransform {
        zoom: 1.0,
        pan_x: 0.0,
        pan_y: 0.0,
    };

    pub const MIN_ZOOM: f64 = 0.1;
    pub const MAX_ZOOM: f64 = 5.0;

    /// Margin kept around the image when fitting it into a container.
    pub const FIT_PADDING: f64 = 60.0;

    /// Create a transform, clamping zoom to the supported range.
    pub fn new(zoom: f64, pan_x: f64, pan_y: f64) -> Self {
        Self {
            zoom: zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM),
            pan_x,
            pan_y,
        }
    }

    /// Fit a canvas into a container: shrink to fit with padding, never
    /// upscale, and reset the pan.
    pub fn fit(canvas_w: f64, canvas_h: f64, container_w: f64, container_h: f64) -> Self {
        if canvas_w <= 0.0 || canvas_h <= 0.0 {
            return Self::IDENTITY;
        }
        let scale = ((container_w - Self::FIT_PADDING) / canvas_w)
            .min((container_h - Self::FIT_PADDING) / canvas_h);
        let zoom = if scale < 1.0 { scale } else { 1.0 };
        Self::new(zoom, 0.0, 0.0)
    }

    /// Adjust zoom by `delta`, keeping it within `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom = (self.zoom + delta).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
    }

    /// Pan by a screen-space offset.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Convert a screen point to scene coordinates.
    pub fn to_scene(&self, screen: Point2D) -> Point2D {
        Point2D::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Convert a scene point to screen coordinates.
    pub fn to_screen(&self, scene: Point2D) -> Point2D {
        Point2D::new(
            scene.x * self.zoom + self.pan_x,
            scene.y * self.zoom + self.pan_y,
        )
    }

    /// Whether this transform renders scene pixels 1:1.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
