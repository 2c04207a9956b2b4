use std::io::Cursor;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// An 8x8 looping gif with one solid-colored frame per delay.
pub(crate) fn gif_bytes(delays_ms: &[u32]) -> Vec<u8> {
    let colors = [
        [255, 0, 0, 255],
        [0, 255, 0, 255],
        [0, 0, 255, 255],
        [255, 255, 255, 255],
    ];
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder.set_repeat(Repeat::Infinite).unwrap();
        let frames = delays_ms.iter().enumerate().map(|(i, ms)| {
            let image = RgbaImage::from_pixel(8, 8, Rgba(colors[i % colors.len()]));
            Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(*ms, 1))
        });
        encoder.encode_frames(frames).unwrap();
    }
    buf
}
