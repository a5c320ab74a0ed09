use crate::foundation::error::{ViewerError, ViewerResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Pixel dimensions of a drawing surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Build a canvas, rejecting empty or oversized surfaces.
    pub fn new(width: u32, height: u32) -> ViewerResult<Self> {
        if width == 0 || height == 0 {
            return Err(ViewerError::validation("canvas width/height must be > 0"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(ViewerError::validation(
                "canvas width/height must fit in u16",
            ));
        }
        Ok(Self { width, height })
    }
}

impl Default for Canvas {
    /// 3:2 surface, the aspect the viewer keeps when fitting its box.
    fn default() -> Self {
        Self {
            width: 960,
            height: 640,
        }
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque color from RGB channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color from RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(s: &str) -> ViewerResult<Self> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ViewerError::validation(format!("color '{s}' must start with '#'")))?;
        if !hex.is_ascii() {
            return Err(ViewerError::validation(format!("color '{s}' is not hex")));
        }

        let nibble = |c: u8| -> ViewerResult<u8> {
            (c as char)
                .to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| ViewerError::validation(format!("color '{s}' is not hex")))
        };
        let bytes = hex.as_bytes();
        let mut ch = [0u8, 0, 0, 255];
        match bytes.len() {
            3 | 4 => {
                for (i, &c) in bytes.iter().enumerate() {
                    let v = nibble(c)?;
                    ch[i] = v * 17;
                }
            }
            6 | 8 => {
                for (i, pair) in bytes.chunks_exact(2).enumerate() {
                    ch[i] = nibble(pair[0])? * 16 + nibble(pair[1])?;
                }
            }
            _ => {
                return Err(ViewerError::validation(format!(
                    "color '{s}' must have 3, 4, 6 or 8 hex digits"
                )));
            }
        }
        Ok(Self::rgba(ch[0], ch[1], ch[2], ch[3]))
    }

    /// CSS-style `rgb(r,g,b)` text, alpha ignored.
    pub fn css_rgb(self) -> String {
        format!("rgb({},{},{})", self.r, self.g, self.b)
    }
}

impl serde::Serialize for Rgba8 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        };
        serializer.serialize_str(&s)
    }
}

impl<'de> serde::Deserialize<'de> for Rgba8 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Round half away from zero, then clamp into a color channel.
pub fn channel_from_f64(v: f64) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    // f64::round already rounds half away from zero.
    v.round().clamp(0.0, 255.0) as u8
}
