use crate::stream::AvStream;

pub struct Decoder {
    stream_index: usize,
    inner: ffmpeg_next::codec::decoder::Video,
}

impl Decoder {
    pub fn new(stream: &AvStream) -> anyhow::Result<Self> {
        if !stream.is_video() {
            return Err(anyhow::anyhow!("unsupported stream type"));
        }

        let mut decoder_ctx = ffmpeg_next::codec::Context::new();
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
        }
        decoder_ctx.set_parameters(stream.parameters().clone())?;

        let video_decoder = decoder_ctx.decoder().video()?;
        if video_decoder.format() == ffmpeg_next::format::Pixel::None
            || video_decoder.width() == 0
            || video_decoder.height() == 0
        {
            return Err(anyhow::anyhow!("missing codec parameters"));
        }

        Ok(Self {
            stream_index: stream.index(),
            inner: video_decoder,
        })
    }

    pub fn send_packet(&mut self, packet: &ffmpeg_next::Packet) -> anyhow::Result<()> {
        self.inner.send_packet(packet)?;
        Ok(())
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    /// Pulls one decoded frame. `Ok(None)` means the decoder needs more input or is drained.
    pub fn receive_frame(&mut self) -> anyhow::Result<Option<ffmpeg_next::frame::Video>> {
        let mut frame = ffmpeg_next::frame::Video::empty();
        match self.inner.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }
}
