//! Text measurement seam.
//!
//! The scene stores an intrinsic size for every text mark. Who measures is
//! injected: the render engine measures with the real font, the model ships
//! a font-free approximation.

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.16;

/// Measures the unscaled box of a run of text.
pub trait TextMetrics: Send + Sync {
    /// Width and height in pixels of `content` at `font_size`, at scale 1.
    fn measure(&self, content: &str, font_family: &str, font_size: f64) -> (f64, f64);
}

/// Font-free metrics: 0.6 em per character, [`LINE_HEIGHT`] per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateMetrics;

impl ApproximateMetrics {
    const ADVANCE_EM: f64 = 0.6;
}

impl TextMetrics for ApproximateMetrics {
    fn measure(&self, content: &str, _font_family: &str, font_size: f64) -> (f64, f64) {
        let lines: Vec<&str> = content.split('\n').collect();
        let widest = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        (
            widest as f64 * font_size * Self::ADVANCE_EM,
            lines.len() as f64 * font_size * LINE_HEIGHT,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let (w, h) = ApproximateMetrics.measure("abcd", "Inter", 10.0);
        assert!((w - 24.0).abs() < 1e-9);
        assert!((h - 11.6).abs() < 1e-9);
    }

    #[test]
    fn test_multi_line_uses_widest() {
        let (w, h) = ApproximateMetrics.measure("ab\nabcdef", "Inter", 10.0);
        assert!((w - 36.0).abs() < 1e-9);
        assert!((h - 23.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let (w, h) = ApproximateMetrics.measure("", "Inter", 20.0);
        assert_eq!(w, 0.0);
        assert!((h - 23.2).abs() < 1e-9);
    }
}
