//! Watermark mark types and their geometry.
//!
//! A mark's `position` is where its anchor point sits in scene pixels. The
//! anchor is a pair of origins (`left|center|right`, `top|center|bottom`)
//! into the mark's scaled box.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::metrics::TextMetrics;
use crate::viewport::{Point2D, Rect};

/// Horizontal origin of a mark's anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OriginX {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical origin of a mark's anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OriginY {
    Top,
    #[default]
    Center,
    Bottom,
}

impl OriginX {
    /// Fraction of the width between the left edge and the anchor.
    pub fn factor(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

impl OriginY {
    /// Fraction of the height between the top edge and the anchor.
    pub fn factor(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Which point of the mark its `position` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Anchor {
    #[serde(default)]
    pub x: OriginX,
    #[serde(default)]
    pub y: OriginY,
}

impl Anchor {
    pub const CENTER: Anchor = Anchor {
        x: OriginX::Center,
        y: OriginY::Center,
    };

    pub const TOP_LEFT: Anchor = Anchor {
        x: OriginX::Left,
        y: OriginY::Top,
    };
}

/// Drop shadow drawn under a text mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shadow {
    /// CSS color string.
    pub color: String,
    /// Blur radius in pixels (at scale 1).
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for Shadow {
    /// The subtle shadow new text marks get.
    fn default() -> Self {
        Self {
            color: "rgba(0,0,0,0.5)".to_string(),
            blur: 5.0,
            offset_x: 2.0,
            offset_y: 2.0,
        }
    }
}

/// A text watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextMark {
    pub content: String,
    /// CSS fill color.
    pub fill: String,
    pub font_family: String,
    /// Font size in pixels at scale 1.
    pub font_size: f64,
    pub position: Point2D,
    pub anchor: Anchor,
    /// Opacity in `[0.0, 1.0]`.
    pub opacity: f64,
    /// Uniform scale.
    pub scale: f64,
    pub shadow: Option<Shadow>,
    /// Unscaled text box width, as measured by [`TextMetrics`].
    pub width: f64,
    /// Unscaled text box height, as measured by [`TextMetrics`].
    pub height: f64,
}

impl Default for TextMark {
    fn default() -> Self {
        Self {
            content: "© Watermark".to_string(),
            fill: "#ffffff".to_string(),
            font_family: "Inter".to_string(),
            font_size: 40.0,
            position: Point2D::default(),
            anchor: Anchor::CENTER,
            opacity: 1.0,
            scale: 1.0,
            shadow: None,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl TextMark {
    /// Recompute the intrinsic box from content, family and size.
    pub fn remeasure(&mut self, metrics: &dyn TextMetrics) {
        let (w, h) = metrics.measure(&self.content, &self.font_family, self.font_size);
        self.width = w;
        self.height = h;
    }
}

/// Encoded raster bytes plus their natural size.
///
/// Serialized as a `data:<mime>;base64,...` URL so a snapshot is
/// self-contained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RasterRecord", into = "RasterRecord")]
pub struct RasterSource {
    pub mime: String,
    pub width: u32,
    pub height: u32,
    pub data: Arc<Vec<u8>>,
}

/// Wire form of a [`RasterSource`].
#[derive(Serialize, Deserialize)]
pub struct RasterRecord {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

/// Errors reading an embedded raster.
#[derive(Debug, thiserror::Error)]
pub enum RasterSourceError {
    #[error("Raster source is not a base64 data URL")]
    NotDataUrl,

    #[error("Raster source has invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl RasterSource {
    pub fn new(mime: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            width,
            height,
            data: Arc::new(data),
        }
    }

    /// Render as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, BASE64.encode(self.data.as_slice()))
    }

    /// Parse a `data:<mime>;base64,<payload>` URL.
    pub fn parse_data_url(url: &str) -> Result<(String, Vec<u8>), RasterSourceError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or(RasterSourceError::NotDataUrl)?;
        let (meta, payload) = rest.split_once(',').ok_or(RasterSourceError::NotDataUrl)?;
        let mime = meta
            .strip_suffix(";base64")
            .ok_or(RasterSourceError::NotDataUrl)?;
        Ok((mime.to_string(), BASE64.decode(payload)?))
    }
}

impl TryFrom<RasterRecord> for RasterSource {
    type Error = RasterSourceError;

    fn try_from(record: RasterRecord) -> Result<Self, Self::Error> {
        let (mime, data) = Self::parse_data_url(&record.src)?;
        Ok(Self::new(mime, record.width, record.height, data))
    }
}

impl From<RasterSource> for RasterRecord {
    fn from(source: RasterSource) -> Self {
        Self {
            src: source.to_data_url(),
            width: source.width,
            height: source.height,
        }
    }
}

fn default_opacity() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

/// An image (logo) watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMark {
    pub source: RasterSource,
    #[serde(default)]
    pub position: Point2D,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl ImageMark {
    pub fn new(source: RasterSource) -> Self {
        Self {
            source,
            position: Point2D::default(),
            anchor: Anchor::CENTER,
            opacity: 1.0,
            scale: 1.0,
        }
    }

    /// Scale uniformly so the rendered width equals `width`.
    pub fn scale_to_width(&mut self, width: f64) {
        if self.source.width > 0 {
            self.scale = width / self.source.width as f64;
        }
    }
}

/// A single watermark element: text or image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Text(TextMark),
    Image(ImageMark),
}

impl Mark {
    /// Short type label (`text` / `image`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }

    /// Unscaled size.
    pub fn intrinsic_size(&self) -> (f64, f64) {
        match self {
            Self::Text(t) => (t.width, t.height),
            Self::Image(i) => (i.source.width as f64, i.source.height as f64),
        }
    }

    /// Size after applying the mark's scale.
    pub fn scaled_size(&self) -> (f64, f64) {
        let (w, h) = self.intrinsic_size();
        let s = self.scale();
        (w * s, h * s)
    }

    pub fn position(&self) -> Point2D {
        match self {
            Self::Text(t) => t.position,
            Self::Image(i) => i.position,
        }
    }

    pub fn set_position(&mut self, p: Point2D) {
        match self {
            Self::Text(t) => t.position = p,
            Self::Image(i) => i.position = p,
        }
    }

    pub fn anchor(&self) -> Anchor {
        match self {
            Self::Text(t) => t.anchor,
            Self::Image(i) => i.anchor,
        }
    }

    pub fn set_anchor(&mut self, anchor: Anchor) {
        match self {
            Self::Text(t) => t.anchor = anchor,
            Self::Image(i) => i.anchor = anchor,
        }
    }

    pub fn opacity(&self) -> f64 {
        match self {
            Self::Text(t) => t.opacity,
            Self::Image(i) => i.opacity,
        }
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        let opacity = opacity.clamp(0.0, 1.0);
        match self {
            Self::Text(t) => t.opacity = opacity,
            Self::Image(i) => i.opacity = opacity,
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            Self::Text(t) => t.scale,
            Self::Image(i) => i.scale,
        }
    }

    pub fn set_scale(&mut self, scale: f64) {
        match self {
            Self::Text(t) => t.scale = scale,
            Self::Image(i) => i.scale = scale,
        }
    }

    /// Scene-space bounding box.
    pub fn bounds(&self) -> Rect {
        let (w, h) = self.scaled_size();
        let anchor = self.anchor();
        let p = self.position();
        Rect::new(
            p.x - anchor.x.factor() * w,
            p.y - anchor.y.factor() * h,
            w,
            h,
        )
    }

    /// Geometric center of the bounding box.
    pub fn center(&self) -> Point2D {
        self.bounds().center()
    }

    /// Move so the bounding box center lands on `center`, keeping the anchor.
    pub fn set_center(&mut self, center: Point2D) {
        let (w, h) = self.scaled_size();
        let anchor = self.anchor();
        self.set_position(Point2D::new(
            center.x - w / 2.0 + anchor.x.factor() * w,
            center.y - h / 2.0 + anchor.y.factor() * h,
        ));
    }

    /// Hit test against the bounding box.
    pub fn contains(&self, p: Point2D) -> bool {
        self.bounds().contains(p)
    }

    pub fn as_text(&self) -> Option<&TextMark> {
        match self {
            Self::Text(t) => Some(t),
            Self::Image(_) => None,
        }
    }
}
