use std::time::Duration;

use crate::foundation::error::PlaybackError;

/// Auto-play rate in frames per second, 1..=10.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrameRate(u32);

impl FrameRate {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 10;

    pub fn new(fps: u32) -> Result<Self, PlaybackError> {
        if !(Self::MIN..=Self::MAX).contains(&fps) {
            return Err(PlaybackError::FrameRate(fps));
        }
        Ok(Self(fps))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Timer period: `1000 / fps` milliseconds.
    pub fn interval(self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.0))
    }

    /// Options offered by a frame-rate selector.
    pub fn choices() -> impl Iterator<Item = FrameRate> {
        (Self::MIN..=Self::MAX).map(FrameRate)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(2)
    }
}

/// Everything the player knows about "now". All mutation goes through these methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerState {
    current: usize,
    playing: bool,
    fps: FrameRate,
    frame_count: usize,
}

impl ViewerState {
    /// Paused at frame 0 with the default rate.
    pub fn new(frame_count: usize) -> Self {
        Self {
            current: 0,
            playing: false,
            fps: FrameRate::default(),
            frame_count,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn fps(&self) -> FrameRate {
        self.fps
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Move to `index`, clamped into `[0, frame_count-1]`.
    pub fn seek(&mut self, index: i64) -> Result<usize, PlaybackError> {
        if self.frame_count == 0 {
            return Err(PlaybackError::NotLoaded);
        }
        let last = self.frame_count - 1;
        self.current = if index <= 0 {
            0
        } else {
            usize::try_from(index).map_or(last, |i| i.min(last))
        };
        Ok(self.current)
    }

    /// `seek(current + delta)`.
    pub fn step(&mut self, delta: i64) -> Result<usize, PlaybackError> {
        let base = i64::try_from(self.current).unwrap_or(i64::MAX);
        self.seek(base.saturating_add(delta))
    }

    /// Flip play/pause; returns the new playing flag.
    pub fn toggle_play(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    pub fn set_fps(&mut self, fps: FrameRate) {
        self.fps = fps;
    }
}
