use std::io::{Cursor, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use bytes::Bytes;
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat, RgbImage};

use super::{Animation, Content, FrameSize};
use crate::error::PanelError;

/// Upper bound on frames kept from one video.
pub const MAX_VIDEO_FRAMES: usize = 150;
/// Used when the container does not report a frame rate.
pub const DEFAULT_VIDEO_FPS: f64 = 30.0;
/// Used for gif frames that carry no delay.
pub const DEFAULT_GIF_DELAY: Duration = Duration::from_millis(100);

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "mpg", "mpeg", "ts", "flv", "wmv",
];

fn corrupt(err: impl std::fmt::Display) -> PanelError {
    PanelError::UnsupportedOrCorruptMedia(err.to_string())
}

/// Turns raw media bytes into content normalized to `size`.
///
/// The codec path is picked by sniffing the bytes; `filename` only matters for
/// containers image sniffing does not know, which go to the video path when the
/// extension looks like video.
pub fn decode(bytes: &[u8], filename: &str, size: FrameSize) -> Result<Content, PanelError> {
    if bytes.is_empty() {
        return Err(corrupt("empty input"));
    }

    match image::guess_format(bytes) {
        Ok(ImageFormat::Gif) => decode_gif(bytes, size),
        Ok(format) => decode_still(bytes, format, size),
        Err(_) if is_video_name(filename) => decode_video(bytes, filename, size),
        Err(_) => Err(corrupt(format!("unrecognized media format ({})", filename))),
    }
}

/// [`decode`] on the blocking pool, for use from request handlers.
pub async fn decode_owned(bytes: Bytes, filename: String, size: FrameSize) -> anyhow::Result<Content> {
    let content = tokio::task::spawn_blocking(move || decode(&bytes, &filename, size)).await??;
    Ok(content)
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_video_name(filename: &str) -> bool {
    extension(filename).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// Converts to RGB and resizes to `size` unless it already matches.
pub fn normalize(image: DynamicImage, size: FrameSize) -> RgbImage {
    let rgb = image.to_rgb8();
    resize_to(rgb, size)
}

pub fn resize_to(rgb: RgbImage, size: FrameSize) -> RgbImage {
    if size.matches(&rgb) {
        return rgb;
    }
    image::imageops::resize(&rgb, size.width, size.height, FilterType::Lanczos3)
}

fn decode_still(bytes: &[u8], format: ImageFormat, size: FrameSize) -> Result<Content, PanelError> {
    let image = image::load_from_memory_with_format(bytes, format).map_err(corrupt)?;
    Ok(Content::Static {
        image: normalize(image, size),
    })
}

fn gif_delay(frame: &image::Frame) -> Duration {
    let (numer, denom) = frame.delay().numer_denom_ms();
    if numer == 0 || denom == 0 {
        return DEFAULT_GIF_DELAY;
    }
    Duration::from_nanos(numer as u64 * 1_000_000 / denom as u64)
}

fn decode_gif(bytes: &[u8], size: FrameSize) -> Result<Content, PanelError> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(corrupt)?;
    let frames = decoder.into_frames().collect_frames().map_err(corrupt)?;

    match frames.len() {
        0 => Err(corrupt("gif has no frames")),
        1 => {
            let buffer = frames.into_iter().next().map(|f| f.into_buffer());
            let buffer = buffer.ok_or_else(|| corrupt("gif has no frames"))?;
            Ok(Content::Static {
                image: normalize(DynamicImage::ImageRgba8(buffer), size),
            })
        }
        _ => {
            let durations = frames.iter().map(gif_delay).collect();
            let images = frames
                .into_iter()
                .map(|f| normalize(DynamicImage::ImageRgba8(f.into_buffer()), size))
                .collect();
            let animation = Animation::new(images, durations, Instant::now())?;
            Ok(Content::Animation(animation))
        }
    }
}

fn decode_video(bytes: &[u8], filename: &str, size: FrameSize) -> Result<Content, PanelError> {
    let suffix = extension(filename)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    // Removed when dropped, on every return path.
    let mut file = tempfile::Builder::new()
        .prefix("matrix-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| PanelError::UnsupportedOrCorruptMedia(format!("temp file: {}", e)))?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .map_err(|e| PanelError::UnsupportedOrCorruptMedia(format!("temp file: {}", e)))?;

    let options = ffmpeg_frames::SampleOptions {
        width: size.width,
        height: size.height,
        max_frames: MAX_VIDEO_FRAMES,
    };
    let video = ffmpeg_frames::sample(file.path(), &options)
        .map_err(|e| PanelError::UnsupportedOrCorruptMedia(format!("{:#}", e)))?;

    let fps = video
        .fps
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .unwrap_or(DEFAULT_VIDEO_FPS);
    if video.truncated {
        log::info!(
            "video {} truncated to {} frames",
            filename,
            video.frames.len()
        );
    }

    let mut frames = Vec::with_capacity(video.frames.len());
    for frame in video.frames {
        let (width, height) = (frame.width, frame.height);
        let image = RgbImage::from_raw(width, height, frame.into_vec())
            .ok_or_else(|| corrupt(format!("short frame buffer for {}x{}", width, height)))?;
        frames.push(resize_to(image, size));
    }
    let durations = vec![Duration::from_secs_f64(1.0 / fps); frames.len()];

    Ok(Content::Animation(Animation::new(frames, durations, Instant::now())?))
}
