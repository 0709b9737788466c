//! Export settings: output raster format and quality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ExportFormat {
    #[default]
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Png, Self::Jpeg, Self::Webp];

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    /// Whether the format keeps an alpha channel.
    pub fn supports_transparency(self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Error for unrecognized format names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown export format `{0}` (use png, jpeg or webp)")]
pub struct UnknownFormat(pub String);

impl FromStr for ExportFormat {
    type Err = UnknownFormat;

    /// Accepts mime types (`image/png`) and short names (`png`, `jpg`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let short = lowered.strip_prefix("image/").unwrap_or(&lowered);
        match short {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Format plus quality for one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Quality in `0..=100`.
    quality: u8,
}

impl ExportSettings {
    pub fn new(format: ExportFormat, quality: u8) -> Self {
        Self {
            format,
            quality: quality.min(100),
        }
    }

    /// Quality as entered (`0..=100`).
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Quality mapped to `0.0..=1.0`.
    pub fn quality_ratio(&self) -> f64 {
        self.quality as f64 / 100.0
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::new(ExportFormat::Png, 92)
    }
}

/// Name an exported file is saved under.
pub fn watermarked_name(original: &str) -> String {
    format!("watermarked_{original}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_mimes() {
        assert_eq!("image/png".parse::<ExportFormat>(), Ok(ExportFormat::Png));
        assert_eq!("JPG".parse::<ExportFormat>(), Ok(ExportFormat::Jpeg));
        assert_eq!("image/webp".parse::<ExportFormat>(), Ok(ExportFormat::Webp));
        assert!("image/tiff".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_quality_is_clamped_and_mapped() {
        let settings = ExportSettings::new(ExportFormat::Jpeg, 250);
        assert_eq!(settings.quality(), 100);
        let settings = ExportSettings::new(ExportFormat::Jpeg, 85);
        assert!((settings.quality_ratio() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_format_serializes_as_mime() {
        let json = serde_json::to_string(&ExportFormat::Jpeg).unwrap();
        assert_eq!(json, "\"image/jpeg\"");
    }

    #[test]
    fn test_watermarked_name() {
        assert_eq!(watermarked_name("cat.jpg"), "watermarked_cat.jpg");
    }
}
