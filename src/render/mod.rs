use std::path::PathBuf;

use crate::{
    foundation::{
        core::Canvas,
        error::{ViewerError, ViewerResult},
    },
    scene::theme::Theme,
};

pub mod cpu;
pub mod text;

/// Rendered frame pixels, row-major RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Straight-alpha copy, suitable for PNG/GIF writers.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Opaque copy composited over `bg`; every alpha byte becomes 255.
    pub fn flatten_over(&self, bg: [u8; 4]) -> ViewerResult<Vec<u8>> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(ViewerError::validation(format!(
                "frame holds {} bytes, {}x{} needs {expected}",
                self.data.len(),
                self.width,
                self.height
            )));
        }

        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 255 {
                continue;
            }
            let under = 255 - a;
            for (c, b) in px[..3].iter_mut().zip(bg) {
                let fg = if self.premultiplied {
                    u32::from(*c)
                } else {
                    div255(u32::from(*c) * a)
                };
                *c = (fg + div255(u32::from(b) * under)).min(255) as u8;
            }
            px[3] = 255;
        }
        Ok(out)
    }
}

fn div255(x: u32) -> u32 {
    (x + 127) / 255
}

/// Surface, palette and font choice for a renderer.
#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    pub canvas: Canvas,
    pub theme: Theme,
    /// Explicit label font; falls back to `WAREPLAY_FONT`, then system fonts.
    pub font: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpremultiply_restores_straight_color() {
        let f = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![128, 0, 0, 128, 10, 20, 30, 255],
            premultiplied: true,
        };
        assert_eq!(f.to_straight_rgba8(), vec![255, 0, 0, 128, 10, 20, 30, 255]);
    }

    #[test]
    fn flatten_fills_translucent_pixels_from_the_background() {
        let premul = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![0, 0, 0, 128, 10, 20, 30, 255],
            premultiplied: true,
        };
        assert_eq!(
            premul.flatten_over([255, 255, 255, 255]).unwrap(),
            vec![127, 127, 127, 255, 10, 20, 30, 255]
        );

        let straight = FrameRGBA {
            premultiplied: false,
            data: vec![255, 0, 0, 0, 0, 0, 0, 0],
            ..premul
        };
        assert_eq!(
            straight.flatten_over([0, 0, 255, 255]).unwrap(),
            vec![0, 0, 255, 255, 0, 0, 255, 255]
        );
    }

    #[test]
    fn flatten_rejects_short_buffers() {
        let f = FrameRGBA {
            width: 2,
            height: 2,
            data: vec![0; 4],
            premultiplied: true,
        };
        assert!(f.flatten_over([0, 0, 0, 255]).is_err());
    }
}
