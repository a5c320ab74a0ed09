use std::{fs::File, io::BufWriter, path::Path};

use anyhow::Context as _;
use image::codecs::gif::{GifEncoder, Repeat};

use crate::{
    encode::ensure_parent_dir,
    foundation::error::{ViewerError, ViewerResult},
    render::FrameRGBA,
};

/// Looping animated GIF writer; every frame is shown for `1000/fps` ms.
pub struct GifWriter {
    encoder: GifEncoder<BufWriter<File>>,
    delay: image::Delay,
    bg_rgba: [u8; 4],
    size: Option<(u32, u32)>,
    frames: usize,
}

impl GifWriter {
    pub fn create(path: &Path, fps: u32, bg_rgba: [u8; 4]) -> ViewerResult<Self> {
        if fps == 0 {
            return Err(ViewerError::validation("gif fps must be non-zero"));
        }
        ensure_parent_dir(path)?;
        let file =
            File::create(path).with_context(|| format!("create gif '{}'", path.display()))?;

        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| ViewerError::encode(format!("gif repeat: {e}")))?;

        Ok(Self {
            encoder,
            delay: image::Delay::from_numer_denom_ms(1000, fps),
            bg_rgba,
            size: None,
            frames: 0,
        })
    }

    pub fn push(&mut self, frame: &FrameRGBA) -> ViewerResult<()> {
        let size = (frame.width, frame.height);
        match self.size {
            Some(expected) if expected != size => {
                return Err(ViewerError::validation(format!(
                    "frame size mismatch: got {}x{}, expected {}x{}",
                    size.0, size.1, expected.0, expected.1
                )));
            }
            _ => self.size = Some(size),
        }

        let rgba = frame.flatten_over(self.bg_rgba)?;
        let buffer = image::RgbaImage::from_raw(frame.width, frame.height, rgba)
            .ok_or_else(|| ViewerError::encode("frame buffer does not match its dimensions"))?;

        self.encoder
            .encode_frame(image::Frame::from_parts(buffer, 0, 0, self.delay))
            .map_err(|e| ViewerError::encode(format!("gif frame {}: {e}", self.frames)))?;
        self.frames += 1;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames(&self) -> usize {
        self.frames
    }
}
