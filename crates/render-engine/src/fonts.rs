//! Font loading, text measurement and glyph rasterization.
//!
//! Text marks need a real outline font to be drawn. The library loads the
//! configured font file or the first well-known system font it finds.
//! Without one it still measures text (approximately) so editing works, but
//! rasterizing text fails with a render error.

use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::{GrayImage, Luma};

use wmark_common::{FontConfig, WmarkError, WmarkResult};
use wmark_scene_model::{ApproximateMetrics, TextMetrics, LINE_HEIGHT};

use crate::compositor::{MAX_LAYER_PIXELS, MAX_LAYER_SIDE};

/// Fonts tried in order when none is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// The font used for every text mark, regardless of its stored family.
pub struct FontLibrary {
    font: Option<FontVec>,
    source: Option<PathBuf>,
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary")
            .field("source", &self.source)
            .field("available", &self.font.is_some())
            .finish()
    }
}

impl FontLibrary {
    /// Load the configured font, falling back to system fonts.
    pub fn load(config: &FontConfig) -> Self {
        if let Some(path) = &config.path {
            match Self::from_file(path) {
                Ok(library) => return library,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Configured font unusable")
                }
            }
        }
        Self::discover()
    }

    /// First usable system font, or an empty library.
    pub fn discover() -> Self {
        for candidate in SYSTEM_FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            if let Ok(library) = Self::from_file(path) {
                return library;
            }
        }
        tracing::warn!("No usable font found; text marks cannot be rendered");
        Self::empty()
    }

    pub fn from_file(path: &Path) -> WmarkResult<Self> {
        let bytes = std::fs::read(path).map_err(|_| WmarkError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        let mut library = Self::from_bytes(bytes)?;
        library.source = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded font");
        Ok(library)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> WmarkResult<Self> {
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| WmarkError::render(format!("Invalid font: {e}")))?;
        Ok(Self {
            font: Some(font),
            source: None,
        })
    }

    /// A library without any font.
    pub fn empty() -> Self {
        Self {
            font: None,
            source: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.font.is_some()
    }

    /// Path the font was loaded from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Rasterize `content` at `font_size` into a coverage mask.
    ///
    /// Lines are left-aligned and spaced by [`LINE_HEIGHT`]. Returns `None`
    /// for text with no visible extent, and a render error for text whose
    /// mask would exceed [`MAX_LAYER_SIDE`] or [`MAX_LAYER_PIXELS`].
    pub fn rasterize(&self, content: &str, font_size: f64) -> WmarkResult<Option<GrayImage>> {
        let lines = content.split('\n').count() as f64;
        if !font_size.is_finite() || lines * font_size * LINE_HEIGHT > MAX_LAYER_SIDE as f64 {
            return Err(too_large(font_size));
        }
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| WmarkError::render("No font available to draw text"))?;

        let (w, h) = measure_with(font, content, font_size);
        if w > MAX_LAYER_SIDE as f64 || w.ceil() * h.ceil() > MAX_LAYER_PIXELS as f64 {
            return Err(too_large(font_size));
        }
        let (width, height) = (w.ceil() as u32, h.ceil() as u32);
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let scale = PxScale::from(font_size as f32);
        let scaled = font.as_scaled(scale);
        let line_height = font_size as f32 * LINE_HEIGHT as f32;
        let glyph_height = scaled.ascent() - scaled.descent();
        let mut mask = GrayImage::new(width, height);

        for (index, line) in content.split('\n').enumerate() {
            let top = index as f32 * line_height;
            let baseline = top + (line_height - glyph_height) / 2.0 + scaled.ascent();
            let mut cursor_x = 0.0f32;
            let mut previous: Option<GlyphId> = None;

            for c in line.chars() {
                let id = scaled.glyph_id(c);
                if let Some(prev) = previous {
                    cursor_x += scaled.kern(prev, id);
                }
                let glyph = id.with_scale_and_position(scale, point(cursor_x, baseline));
                if let Some(outlined) = font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|px, py, coverage| {
                        let x = px as i32 + bounds.min.x as i32;
                        let y = py as i32 + bounds.min.y as i32;
                        if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                            let pixel = mask.get_pixel_mut(x as u32, y as u32);
                            let value = pixel[0] as f32 + coverage * 255.0;
                            *pixel = Luma([value.min(255.0) as u8]);
                        }
                    });
                }
                cursor_x += scaled.h_advance(id);
                previous = Some(id);
            }
        }
        Ok(Some(mask))
    }
}

fn too_large(font_size: f64) -> WmarkError {
    WmarkError::render(format!("Text at {font_size}px is too large to render"))
}

fn line_width(font: &FontVec, line: &str, font_size: f64) -> f64 {
    let scaled = font.as_scaled(PxScale::from(font_size as f32));
    let mut width = 0.0f32;
    let mut previous: Option<GlyphId> = None;
    for c in line.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = previous {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        previous = Some(id);
    }
    width as f64
}

fn measure_with(font: &FontVec, content: &str, font_size: f64) -> (f64, f64) {
    let lines: Vec<&str> = content.split('\n').collect();
    let width = lines
        .iter()
        .map(|line| line_width(font, line, font_size))
        .fold(0.0, f64::max);
    (width, lines.len() as f64 * font_size * LINE_HEIGHT)
}

impl TextMetrics for FontLibrary {
    fn measure(&self, content: &str, font_family: &str, font_size: f64) -> (f64, f64) {
        match &self.font {
            Some(font) => measure_with(font, content, font_size),
            None => ApproximateMetrics.measure(content, font_family, font_size),
        }
    }
}
