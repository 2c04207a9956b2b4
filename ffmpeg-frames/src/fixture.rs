//! Synthetic clips for tests that need real encoded video.

use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::{Rational, codec, encoder, format, frame};

/// Encodes `frames` solid-colored MPEG-4 frames of `width` x `height` at `fps`
/// into `path`. The container is picked from the file extension.
pub fn write_test_video(
    path: &Path,
    frames: usize,
    width: u32,
    height: u32,
    fps: i32,
) -> anyhow::Result<()> {
    let mut octx = format::output(path)?;
    let mpeg4 = encoder::find(codec::Id::MPEG4)
        .ok_or_else(|| anyhow::anyhow!("mpeg4 encoder not available"))?;
    let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

    let time_base = Rational::new(1, fps);
    let (stream_index, mut video) = {
        let mut stream = octx.add_stream(mpeg4)?;
        let mut builder = codec::context::Context::new_with_codec(mpeg4)
            .encoder()
            .video()?;
        builder.set_width(width);
        builder.set_height(height);
        builder.set_format(Pixel::YUV420P);
        builder.set_time_base(time_base);
        builder.set_frame_rate(Some(Rational::new(fps, 1)));
        if global_header {
            builder.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let opened = builder.open_as(mpeg4)?;
        stream.set_parameters(&opened);
        stream.set_time_base(time_base);
        (stream.index(), opened)
    };

    octx.write_header()?;
    let stream_time_base = octx
        .stream(stream_index)
        .map(|s| s.time_base())
        .ok_or_else(|| anyhow::anyhow!("output stream missing"))?;

    let mut target = Target {
        octx,
        stream_index,
        encoder_time_base: time_base,
        stream_time_base,
    };

    for i in 0..frames {
        let mut picture = frame::Video::new(Pixel::YUV420P, width, height);
        let luma = (i * 29 % 220 + 16) as u8;
        picture.data_mut(0).fill(luma);
        picture.data_mut(1).fill(128);
        picture.data_mut(2).fill(128);
        picture.set_pts(Some(i as i64));
        video.send_frame(&picture)?;
        target.write_ready(&mut video)?;
    }
    video.send_eof()?;
    target.write_ready(&mut video)?;
    target.octx.write_trailer()?;
    Ok(())
}

struct Target {
    octx: format::context::Output,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
}

impl Target {
    /// Moves every packet the encoder has ready into the container.
    fn write_ready(&mut self, video: &mut encoder::Video) -> anyhow::Result<()> {
        let mut packet = ffmpeg_next::Packet::empty();
        while video.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.set_duration(1);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}
