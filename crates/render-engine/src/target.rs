//! Reusable offscreen render target.

use image::{imageops, Rgba, RgbaImage};

use wmark_common::{WmarkError, WmarkResult};

/// An RGBA surface sized to the image being rendered.
///
/// One target is reused across a whole batch: it is reconfigured to each
/// image's native size and cleared after each encode.
#[derive(Debug, Clone, Default)]
pub struct RenderTarget {
    canvas: RgbaImage,
}

impl RenderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to `width x height` and clear. Keeps the allocation when the
    /// size is unchanged.
    pub fn configure(&mut self, width: u32, height: u32) -> WmarkResult<()> {
        if width == 0 || height == 0 {
            return Err(WmarkError::render(format!(
                "Invalid render target size {width}x{height}"
            )));
        }
        if self.canvas.dimensions() == (width, height) {
            self.clear();
        } else {
            self.canvas = RgbaImage::new(width, height);
        }
        Ok(())
    }

    /// Draw the background at the origin. Must match the configured size.
    pub fn set_background(&mut self, background: &RgbaImage) -> WmarkResult<()> {
        if background.dimensions() != self.canvas.dimensions() {
            return Err(WmarkError::render(format!(
                "Background is {:?} but target is {:?}",
                background.dimensions(),
                self.canvas.dimensions()
            )));
        }
        imageops::replace(&mut self.canvas, background, 0, 0);
        Ok(())
    }

    /// Make every pixel transparent.
    pub fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.canvas
    }
}
