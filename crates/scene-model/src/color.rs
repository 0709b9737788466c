//! CSS-style color strings used by fills and shadows.

/// An sRGB color with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha in `[0.0, 1.0]`.
    pub a: f64,
}

/// Errors from [`Color::parse`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ColorError {
    #[error("Empty color string")]
    Empty,

    #[error("Unrecognized color `{0}`")]
    Malformed(String),
}

impl Color {
    pub const WHITE: Color = Color::opaque(255, 255, 255);
    pub const BLACK: Color = Color::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ColorError::Empty);
        }
        let malformed = || ColorError::Malformed(s.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            let digit = |i: usize, len: usize| {
                hex.get(i..i + len)
                    .and_then(|d| u8::from_str_radix(d, 16).ok())
                    .ok_or_else(malformed)
            };
            return match hex.len() {
                3 => Ok(Self::opaque(
                    digit(0, 1)? * 17,
                    digit(1, 1)? * 17,
                    digit(2, 1)? * 17,
                )),
                6 => Ok(Self::opaque(digit(0, 2)?, digit(2, 2)?, digit(4, 2)?)),
                8 => Ok(Self {
                    r: digit(0, 2)?,
                    g: digit(2, 2)?,
                    b: digit(4, 2)?,
                    a: digit(6, 2)? as f64 / 255.0,
                }),
                _ => Err(malformed()),
            };
        }

        let (args, expect_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return Err(malformed());
        };
        let args = args.strip_suffix(')').ok_or_else(malformed)?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();

        let channel = |p: &str| p.parse::<u8>().map_err(|_| malformed());
        match (parts.as_slice(), expect_alpha) {
            ([r, g, b], false) => Ok(Self::opaque(channel(*r)?, channel(*g)?, channel(*b)?)),
            ([r, g, b, a], true) => {
                let a = a.parse::<f64>().map_err(|_| malformed())?;
                if !(0.0..=1.0).contains(&a) {
                    return Err(malformed());
                }
                Ok(Self {
                    r: channel(*r)?,
                    g: channel(*g)?,
                    b: channel(*b)?,
                    a,
                })
            }
            _ => Err(malformed()),
        }
    }

    /// Color as RGBA8 with `opacity` folded into the alpha channel.
    pub fn to_rgba8(&self, opacity: f64) -> [u8; 4] {
        let alpha = (self.a * opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        [self.r, self.g, self.b, alpha]
    }
}
