use std::time::Instant;

use image::RgbImage;

use super::decode::resize_to;
use super::{Content, FrameSize};

/// Halves of one frame resized to twice the panel width.
fn split_frame(frame: &RgbImage, panel: FrameSize) -> (RgbImage, RgbImage) {
    let wide = resize_to(frame.clone(), panel.double_width());
    let left = image::imageops::crop_imm(&wide, 0, 0, panel.width, panel.height).to_image();
    let right =
        image::imageops::crop_imm(&wide, panel.width, 0, panel.width, panel.height).to_image();
    (left, right)
}

/// Splits content spanning both panels into a left and a right half.
///
/// Animations keep their frame count and per-frame durations; both halves start
/// their loop at `now`, in phase with each other.
pub fn split(content: &Content, panel: FrameSize, now: Instant) -> (Content, Content) {
    match content {
        Content::Static { image } => {
            let (left, right) = split_frame(image, panel);
            (Content::Static { image: left }, Content::Static { image: right })
        }
        Content::Animation(animation) => {
            let (left, right) = animation.split_frames(|frame| split_frame(frame, panel), now);
            (Content::Animation(left), Content::Animation(right))
        }
    }
}
