use std::collections::HashMap;
use std::path::Path;

use crate::stream::AvStream;

/// Demuxer over a media file on disk.
pub struct AvInput {
    inner: ffmpeg_next::format::context::Input,
    streams: HashMap<usize, AvStream>,
    best_video: Option<usize>,
}

impl AvInput {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let input = ffmpeg_next::format::input(&path)
            .map_err(|e| anyhow::anyhow!("open input {}: {}", path.display(), e))?;

        let mut streams = HashMap::new();
        for stream in input.streams() {
            streams.insert(stream.index(), AvStream::from(stream));
        }
        let best_video = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .map(|s| s.index());

        Ok(Self {
            inner: input,
            streams,
            best_video,
        })
    }

    pub fn streams(&self) -> &HashMap<usize, AvStream> {
        &self.streams
    }

    /// The stream ffmpeg ranks best among the video streams, if the container has any.
    pub fn best_video_stream(&self) -> Option<&AvStream> {
        self.best_video.and_then(|index| self.streams.get(&index))
    }

    /// Next demuxed packet with the index of the stream it belongs to; `None` at end of stream.
    pub fn read_packet(&mut self) -> Option<(usize, ffmpeg_next::Packet)> {
        self.inner
            .packets()
            .next()
            .map(|(stream, packet)| (stream.index(), packet))
    }
}
