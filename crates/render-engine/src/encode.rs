//! Raster encoders for the supported export formats.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use wmark_common::{WmarkError, WmarkResult};
use wmark_scene_model::{ExportFormat, ExportSettings};

/// Encode a rendered image with the given format and quality.
///
/// PNG and WebP (lossless) ignore quality. JPEG drops the alpha channel and
/// maps quality onto `1..=100`.
pub fn encode(image: &RgbaImage, settings: ExportSettings) -> WmarkResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    let mut output = Cursor::new(Vec::new());

    let result = match settings.format {
        ExportFormat::Png => {
            PngEncoder::new(&mut output).write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
        }
        ExportFormat::Jpeg => {
            let rgb = rgba_to_rgb(image.as_raw());
            JpegEncoder::new_with_quality(&mut output, settings.quality().clamp(1, 100))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        }
        ExportFormat::Webp => WebPEncoder::new_lossless(&mut output).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };

    result.map_err(|e| WmarkError::encode(format!("{}: {e}", settings.format.extension())))?;
    Ok(output.into_inner())
}

fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_pixel(16, 9, Rgba([200, 100, 50, 255]))
    }

    #[test]
    fn test_each_format_decodes_back_at_same_size() {
        for format in ExportFormat::ALL {
            let bytes = encode(&sample(), ExportSettings::new(format, 80)).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (16, 9), "{format}");
        }
    }

    #[test]
    fn test_png_signature() {
        let bytes = encode(&sample(), ExportSettings::default()).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_jpeg_quality_changes_size() {
        let mut noisy = RgbaImage::new(64, 64);
        for (x, y, pixel) in noisy.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x ^ y) * 13 % 256) as u8, 255]);
        }
        let low = encode(&noisy, ExportSettings::new(ExportFormat::Jpeg, 10)).unwrap();
        let high = encode(&noisy, ExportSettings::new(ExportFormat::Jpeg, 95)).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_rgba_to_rgb() {
        assert_eq!(rgba_to_rgb(&[1, 2, 3, 4, 5, 6, 7, 8]), vec![1, 2, 3, 5, 6, 7]);
    }
}
