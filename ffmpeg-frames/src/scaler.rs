use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context, Flags};

/// Converts decoded frames of one source geometry into packed RGB24 at a fixed size.
pub struct Scaler {
    context: Context,
    source: (Pixel, u32, u32),
}

impl Scaler {
    pub fn new(
        format: Pixel,
        width: u32,
        height: u32,
        dst_width: u32,
        dst_height: u32,
    ) -> anyhow::Result<Self> {
        let context = Context::get(
            format,
            width,
            height,
            Pixel::RGB24,
            dst_width,
            dst_height,
            Flags::LANCZOS,
        )?;
        Ok(Self {
            context,
            source: (format, width, height),
        })
    }

    /// Whether `frame` has the geometry this scaler was built for.
    pub fn accepts(&self, frame: &ffmpeg_next::frame::Video) -> bool {
        self.source == (frame.format(), frame.width(), frame.height())
    }

    pub fn run(
        &mut self,
        frame: &ffmpeg_next::frame::Video,
        dst: &mut ffmpeg_next::frame::Video,
    ) -> anyhow::Result<()> {
        self.context.run(frame, dst).map_err(|e| e.into())
    }
}

unsafe impl Send for Scaler {}
