//! Raster decoding for backgrounds and logos.

use image::{DynamicImage, ImageFormat, RgbaImage};

use wmark_common::{WmarkError, WmarkResult};
use wmark_editor::SourceDecoder;
use wmark_scene_model::{BackgroundImage, RasterSource};

/// Decode any supported format into RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> WmarkResult<RgbaImage> {
    decode_dynamic(bytes).map(DynamicImage::into_rgba8)
}

fn decode_dynamic(bytes: &[u8]) -> WmarkResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(WmarkError::decode("empty file"));
    }
    image::load_from_memory(bytes).map_err(|e| WmarkError::decode(e.to_string()))
}

/// Validate a background image and record its native size.
pub fn decode_background(name: &str, bytes: Vec<u8>) -> WmarkResult<BackgroundImage> {
    if bytes.is_empty() {
        return Err(WmarkError::decode(format!("{name}: empty file")));
    }
    let image = image::load_from_memory(&bytes)
        .map_err(|e| WmarkError::decode(format!("{name}: {e}")))?;
    Ok(BackgroundImage::new(name, image.width(), image.height(), bytes))
}

/// Validate a logo and record its mime type and natural size.
pub fn decode_raster_source(bytes: Vec<u8>) -> WmarkResult<RasterSource> {
    let format = image::guess_format(&bytes).map_err(|e| WmarkError::decode(e.to_string()))?;
    let image = decode_dynamic(&bytes)?;
    Ok(RasterSource::new(
        mime_for(format),
        image.width(),
        image.height(),
        bytes,
    ))
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}

/// [`SourceDecoder`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl SourceDecoder for ImageDecoder {
    fn decode_background(&self, name: &str, bytes: Vec<u8>) -> WmarkResult<BackgroundImage> {
        decode_background(name, bytes)
    }

    fn decode_raster(&self, bytes: Vec<u8>) -> WmarkResult<RasterSource> {
        decode_raster_source(bytes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let image: RgbaImage = ImageBuffer::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_background_dimensions() {
        let background = decode_background("a.png", png_bytes(30, 20, [1, 2, 3, 255])).unwrap();
        assert_eq!((background.width, background.height), (30, 20));
        assert_eq!(background.name, "a.png");
    }

    #[test]
    fn test_logo_mime_sniffed() {
        let source = decode_raster_source(png_bytes(4, 8, [0, 0, 0, 0])).unwrap();
        assert_eq!(source.mime, "image/png");
        assert_eq!((source.width, source.height), (4, 8));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode_background("broken.jpg", b"definitely not an image".to_vec()).unwrap_err();
        assert!(matches!(err, WmarkError::Decode { .. }));
        assert!(err.to_string().contains("broken.jpg"));
        assert!(matches!(decode_rgba(&[]), Err(WmarkError::Decode { .. })));
    }
}
