//! Frame sampling on top of ffmpeg: open a container, decode its best video
//! stream and hand back every frame scaled to a fixed size as packed RGB24.

/// Registers FFmpeg components. Call once at startup before sampling.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))
}

pub mod decoder;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod frame;
pub mod input;
pub mod sampler;
pub mod scaler;
pub mod stream;

pub use frame::RgbFrame;
pub use sampler::{FrameLimit, SampleOptions, SampledVideo, sample};
