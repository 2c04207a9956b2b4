use std::path::Path;

use crate::{decoder::Decoder, frame::RgbFrame, input::AvInput, scaler::Scaler};

/// Caps how many frames a single sampling run may keep.
///
/// Hitting the cap is not an error: the run just stops reading the source.
#[derive(Debug, Clone)]
pub struct FrameLimit {
    cap: usize,
    taken: usize,
}

impl FrameLimit {
    pub fn new(cap: usize) -> Self {
        Self { cap, taken: 0 }
    }

    /// Claims a slot for one more frame. Returns `false` once the cap is used up.
    pub fn admit(&mut self) -> bool {
        if self.taken >= self.cap {
            return false;
        }
        self.taken += 1;
        true
    }

    pub fn is_reached(&self) -> bool {
        self.taken >= self.cap
    }

    pub fn taken(&self) -> usize {
        self.taken
    }
}

#[derive(Debug, Clone)]
pub struct SampleOptions {
    pub width: u32,
    pub height: u32,
    pub max_frames: usize,
}

#[derive(Debug, Clone)]
pub struct SampledVideo {
    pub frames: Vec<RgbFrame>,
    /// Container frame rate, `None` when the container does not report one.
    pub fps: Option<f64>,
    /// True when the stream had frames past the cap that were not kept.
    pub truncated: bool,
}

struct Sampler<'a> {
    decoder: Decoder,
    scaler: Option<Scaler>,
    limit: FrameLimit,
    options: &'a SampleOptions,
    frames: Vec<RgbFrame>,
}

impl Sampler<'_> {
    /// Pulls every frame the decoder has ready. Returns `false` when a frame had
    /// to be refused because the limit is used up, i.e. the source is longer.
    fn drain(&mut self) -> anyhow::Result<bool> {
        while let Some(frame) = self.decoder.receive_frame()? {
            if !self.limit.admit() {
                return Ok(false);
            }
            let rgb = self.scale(&frame)?;
            self.frames.push(rgb);
        }
        Ok(true)
    }

    fn scale(&mut self, frame: &ffmpeg_next::frame::Video) -> anyhow::Result<RgbFrame> {
        let scaler = match self.scaler.take() {
            Some(scaler) if scaler.accepts(frame) => scaler,
            _ => Scaler::new(
                frame.format(),
                frame.width(),
                frame.height(),
                self.options.width,
                self.options.height,
            )?,
        };
        let scaler = self.scaler.insert(scaler);

        let mut dst = ffmpeg_next::frame::Video::empty();
        scaler.run(frame, &mut dst)?;
        dst.set_pts(frame.pts());
        RgbFrame::from_rgb24(&dst)
    }
}

/// Decodes the best video stream of `path` into RGB frames of `options.width` x
/// `options.height`, keeping at most `options.max_frames` of them.
pub fn sample(path: &Path, options: &SampleOptions) -> anyhow::Result<SampledVideo> {
    if options.width == 0 || options.height == 0 {
        anyhow::bail!("invalid target size {}x{}", options.width, options.height);
    }

    let mut input = AvInput::new(path)?;
    let stream = input
        .best_video_stream()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no video stream in {}", path.display()))?;
    let fps = stream.fps();

    let mut sampler = Sampler {
        decoder: Decoder::new(&stream)?,
        scaler: None,
        limit: FrameLimit::new(options.max_frames),
        options,
        frames: Vec::new(),
    };

    let mut truncated = false;
    while let Some((index, packet)) = input.read_packet() {
        if index != sampler.decoder.stream_index() {
            continue;
        }
        if let Err(e) = sampler.decoder.send_packet(&packet) {
            log::warn!("send packet error: {}", e);
            continue;
        }
        if !sampler.drain()? {
            truncated = true;
            break;
        }
    }

    if !truncated {
        if let Err(e) = sampler.decoder.send_eof() {
            log::warn!("decoder send eof error: {}", e);
        }
        truncated = !sampler.drain()?;
    }

    if sampler.frames.is_empty() {
        anyhow::bail!("video stream in {} produced no frames", path.display());
    }

    log::debug!(
        "sampled {} frames from {} (fps: {:?}, truncated: {})",
        sampler.frames.len(),
        path.display(),
        fps,
        truncated
    );

    Ok(SampledVideo {
        frames: sampler.frames,
        fps,
        truncated,
    })
}


#[cfg(test)]
#[path = "sampler_test.rs"]
mod sampler_test;
