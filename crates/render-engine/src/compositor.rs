//! Mark compositor: draws watermark marks onto a render target.
//!
//! Marks are drawn in scene order. Every layer is blended with the mark's
//! opacity using the Porter-Duff "over" operator and clipped to the target.

use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;

use wmark_common::{WmarkError, WmarkResult};
use wmark_scene_model::{Color, ImageMark, Mark, Rect, TextMark};

use crate::fonts::FontLibrary;
use crate::raster::decode_rgba;
use crate::target::RenderTarget;

/// Largest side of any intermediate layer (glyph mask or blurred shadow).
pub const MAX_LAYER_SIDE: u32 = 1 << 15;

/// Largest pixel count of any intermediate layer.
pub const MAX_LAYER_PIXELS: u64 = 1 << 26;

pub struct Compositor<'a> {
    fonts: &'a FontLibrary,
}

impl<'a> Compositor<'a> {
    pub fn new(fonts: &'a FontLibrary) -> Self {
        Self { fonts }
    }

    /// Draw every mark onto the target, bottom-most first.
    pub fn draw<'m>(
        &self,
        target: &mut RenderTarget,
        marks: impl IntoIterator<Item = &'m Mark>,
    ) -> WmarkResult<()> {
        for mark in marks {
            match mark {
                Mark::Image(image) => self.draw_image(target.image_mut(), image)?,
                Mark::Text(text) => self.draw_text(target.image_mut(), text)?,
            }
        }
        Ok(())
    }

    fn draw_image(&self, canvas: &mut RgbaImage, mark: &ImageMark) -> WmarkResult<()> {
        let wrapped = Mark::Image(mark.clone());
        let bounds = wrapped.bounds();
        if ![bounds.x, bounds.y, bounds.w, bounds.h].iter().all(|v| v.is_finite()) {
            return Err(WmarkError::render("Image mark has non-finite geometry"));
        }
        if bounds.w.round() < 1.0 || bounds.h.round() < 1.0 {
            return Ok(());
        }

        let decoded = decode_rgba(&mark.source.data)?;
        let (canvas_w, canvas_h) = canvas.dimensions();
        let fits = bounds.w <= 2.0 * canvas_w as f64 && bounds.h <= 2.0 * canvas_h as f64;
        if !fits {
            // Oversized layers are sampled straight onto the canvas.
            blend_sampled(canvas, &decoded, bounds, mark.opacity);
            return Ok(());
        }

        let (width, height) = (bounds.w.round() as u32, bounds.h.round() as u32);
        let layer = if decoded.dimensions() == (width, height) {
            decoded
        } else {
            imageops::resize(&decoded, width, height, imageops::FilterType::Triangle)
        };
        blend_image(
            canvas,
            &layer,
            bounds.x.round() as i64,
            bounds.y.round() as i64,
            mark.opacity,
        );
        Ok(())
    }

    fn draw_text(&self, canvas: &mut RgbaImage, mark: &TextMark) -> WmarkResult<()> {
        let fill = Color::parse(&mark.fill)
            .map_err(|e| WmarkError::render(format!("Text fill: {e}")))?;
        let Some(mask) = self.fonts.rasterize(&mark.content, mark.font_size * mark.scale)? else {
            return Ok(());
        };

        // Place by anchor against the drawn size, not the stored one, so
        // marks measured with other metrics still line up on their anchor.
        let (w, h) = (mask.width() as f64, mask.height() as f64);
        let left = mark.position.x - mark.anchor.x.factor() * w;
        let top = mark.position.y - mark.anchor.y.factor() * h;

        if let Some(shadow) = &mark.shadow {
            let color = Color::parse(&shadow.color)
                .map_err(|e| WmarkError::render(format!("Shadow color: {e}")))?;
            let sigma = (shadow.blur * mark.scale / 2.0) as f32;
            let (shadow_mask, pad) = blurred(&mask, sigma)?;
            blend_mask(
                canvas,
                &shadow_mask,
                color,
                (left + shadow.offset_x * mark.scale).round() as i64 - pad,
                (top + shadow.offset_y * mark.scale).round() as i64 - pad,
                mark.opacity,
            );
        }

        blend_mask(
            canvas,
            &mask,
            fill,
            left.round() as i64,
            top.round() as i64,
            mark.opacity,
        );
        Ok(())
    }
}

/// Pad the mask so the blur has room to spread, then blur it. Returns the
/// padding that was added on each side.
fn blurred(mask: &GrayImage, sigma: f32) -> WmarkResult<(GrayImage, i64)> {
    if sigma.is_nan() || sigma <= 0.0 {
        return Ok((mask.clone(), 0));
    }
    let pad = (sigma as f64 * 3.0).ceil();
    let width = mask.width() as f64 + 2.0 * pad;
    let height = mask.height() as f64 + 2.0 * pad;
    if width > MAX_LAYER_SIDE as f64
        || height > MAX_LAYER_SIDE as f64
        || width * height > MAX_LAYER_PIXELS as f64
    {
        return Err(WmarkError::render(format!(
            "Shadow blur {sigma} is too large to render"
        )));
    }
    let pad = pad as u32;
    let mut padded = GrayImage::new(mask.width() + 2 * pad, mask.height() + 2 * pad);
    imageops::replace(&mut padded, mask, pad as i64, pad as i64);
    Ok((gaussian_blur_f32(&padded, sigma), pad as i64))
}

/// Blend an RGBA layer with its top-left corner at `(x, y)`.
pub fn blend_image(canvas: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64, opacity: f64) {
    for_each_overlap(canvas, layer.width(), layer.height(), x, y, |canvas, cx, cy, lx, ly| {
        let fg = *layer.get_pixel(lx, ly);
        let bg = *canvas.get_pixel(cx, cy);
        canvas.put_pixel(cx, cy, blend_pixels(bg, fg, opacity as f32));
    });
}

/// Blend `source` stretched over `bounds`, sampling the nearest source pixel
/// for each covered canvas pixel. Nothing is allocated for the layer.
fn blend_sampled(canvas: &mut RgbaImage, source: &RgbaImage, bounds: Rect, opacity: f64) {
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return;
    }
    let x_start = bounds.x.max(0.0).floor() as u32;
    let y_start = bounds.y.max(0.0).floor() as u32;
    let x_end = (bounds.x + bounds.w).ceil().clamp(0.0, canvas.width() as f64) as u32;
    let y_end = (bounds.y + bounds.h).ceil().clamp(0.0, canvas.height() as f64) as u32;

    for cy in y_start..y_end {
        let v = (cy as f64 + 0.5 - bounds.y) / bounds.h;
        if !(0.0..1.0).contains(&v) {
            continue;
        }
        let ly = ((v * src_h as f64) as u32).min(src_h - 1);
        for cx in x_start..x_end {
            let u = (cx as f64 + 0.5 - bounds.x) / bounds.w;
            if !(0.0..1.0).contains(&u) {
                continue;
            }
            let lx = ((u * src_w as f64) as u32).min(src_w - 1);
            let fg = *source.get_pixel(lx, ly);
            let bg = *canvas.get_pixel(cx, cy);
            canvas.put_pixel(cx, cy, blend_pixels(bg, fg, opacity as f32));
        }
    }
}

/// Blend a solid color through a coverage mask.
pub fn blend_mask(
    canvas: &mut RgbaImage,
    mask: &GrayImage,
    color: Color,
    x: i64,
    y: i64,
    opacity: f64,
) {
    let [r, g, b, a] = color.to_rgba8(1.0);
    for_each_overlap(canvas, mask.width(), mask.height(), x, y, |canvas, cx, cy, lx, ly| {
        let Luma([coverage]) = *mask.get_pixel(lx, ly);
        if coverage == 0 {
            return;
        }
        let alpha = (coverage as u32 * a as u32 / 255) as u8;
        let bg = *canvas.get_pixel(cx, cy);
        canvas.put_pixel(cx, cy, blend_pixels(bg, Rgba([r, g, b, alpha]), opacity as f32));
    });
}

/// Visit the part of a `w x h` layer at `(x, y)` that lands on the canvas.
fn for_each_overlap(
    canvas: &mut RgbaImage,
    w: u32,
    h: u32,
    x: i64,
    y: i64,
    mut visit: impl FnMut(&mut RgbaImage, u32, u32, u32, u32),
) {
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + w as i64).min(canvas.width() as i64);
    let y_end = (y + h as i64).min(canvas.height() as i64);

    for cy in y_start..y_end {
        for cx in x_start..x_end {
            visit(canvas, cx as u32, cy as u32, (cx - x) as u32, (cy - y) as u32);
        }
    }
}

/// Porter-Duff "over" with an extra opacity factor on the foreground.
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |fg: u8, bg: u8| -> u8 {
        let fg = fg as f32 / 255.0;
        let bg = bg as f32 / 255.0;
        let result = (fg * fg_alpha + bg * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(foreground[0], background[0]),
        channel(foreground[1], background[1]),
        channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
