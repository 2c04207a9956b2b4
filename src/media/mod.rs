//! Normalized playback content and the ingestion path that produces it.
//!
//! ```text
//!  bytes + name ──► decode ──► Content (Static | Animation) ──► [split] ──► PanelStore
//!                     │
//!                     ├─ still image ─► resize (Lanczos3)
//!                     ├─ gif ─────────► per-frame delay, 100 ms default
//!                     └─ video ───────► ffmpeg-frames, capped at 150 frames
//! ```

use std::io::Cursor;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage};

use crate::error::PanelError;

pub mod compositor;
pub mod decode;
#[cfg(test)]
pub(crate) mod test_support;

/// Width and height of one physical panel.
pub const PANEL_WIDTH: u32 = 64;
pub const PANEL_HEIGHT: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// One panel.
    pub const PANEL: FrameSize = FrameSize {
        width: PANEL_WIDTH,
        height: PANEL_HEIGHT,
    };
    /// A source spanning both panels side by side.
    pub const SPLIT: FrameSize = FrameSize {
        width: PANEL_WIDTH * 2,
        height: PANEL_HEIGHT,
    };

    pub fn double_width(self) -> Self {
        Self {
            width: self.width * 2,
            height: self.height,
        }
    }

    pub fn matches(self, image: &RgbImage) -> bool {
        image.dimensions() == (self.width, self.height)
    }
}

/// A looping sequence of frames. `frames` and `durations` always have the same,
/// non-zero length.
#[derive(Debug, Clone)]
pub struct Animation {
    frames: Vec<RgbImage>,
    durations: Vec<Duration>,
    start_time: Instant,
}

impl Animation {
    pub fn new(
        frames: Vec<RgbImage>,
        durations: Vec<Duration>,
        start_time: Instant,
    ) -> Result<Self, PanelError> {
        if frames.is_empty() {
            return Err(PanelError::UnsupportedOrCorruptMedia(
                "animation has no frames".to_string(),
            ));
        }
        if frames.len() != durations.len() {
            return Err(PanelError::UnsupportedOrCorruptMedia(format!(
                "{} frames but {} durations",
                frames.len(),
                durations.len()
            )));
        }
        Ok(Self {
            frames,
            durations,
            start_time,
        })
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn durations(&self) -> &[Duration] {
        &self.durations
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn total(&self) -> Duration {
        self.durations.iter().sum()
    }

    /// Builds two animations with this one's length and timing by splitting every frame.
    pub fn split_frames<F>(&self, mut f: F, start_time: Instant) -> (Animation, Animation)
    where
        F: FnMut(&RgbImage) -> (RgbImage, RgbImage),
    {
        let (left, right): (Vec<RgbImage>, Vec<RgbImage>) =
            self.frames.iter().map(&mut f).unzip();
        let half = |frames: Vec<RgbImage>| Animation {
            frames,
            durations: self.durations.clone(),
            start_time,
        };
        (half(left), half(right))
    }
}

#[derive(Debug, Clone)]
pub enum Content {
    Static { image: RgbImage },
    Animation(Animation),
}

impl Content {
    /// Solid black still frame.
    pub fn blank(size: FrameSize) -> Self {
        Content::Static {
            image: RgbImage::new(size.width, size.height),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Content::Static { .. } => "static",
            Content::Animation(_) => "animation",
        }
    }

    pub fn frame_count(&self) -> usize {
        match self {
            Content::Static { .. } => 1,
            Content::Animation(animation) => animation.frames.len(),
        }
    }

    /// Restarts an animation's loop at `now`. Still content is unaffected.
    pub fn restart(&mut self, now: Instant) {
        if let Content::Animation(animation) = self {
            animation.start_time = now;
        }
    }
}

pub fn encode_png(frame: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    frame.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
