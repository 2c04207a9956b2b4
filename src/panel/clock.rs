//! Which frame of a piece of content is visible at a given instant.
//!
//! Stateless: every read recomputes the frame from the animation's start time,
//! so two reads at the same instant always agree.

use std::time::{Duration, Instant};

use image::RgbImage;

use crate::media::Content;

/// Index of the frame showing `elapsed` after the loop started.
///
/// Frame `i` covers `[sum(durations[..i]), sum(durations[..=i]))` of each loop
/// period. A loop whose durations sum to zero always shows frame 0.
pub fn frame_index(durations: &[Duration], elapsed: Duration) -> usize {
    let total: u128 = durations.iter().map(Duration::as_nanos).sum();
    if total == 0 {
        return 0;
    }

    let loop_time = elapsed.as_nanos() % total;
    let mut cursor = 0u128;
    for (i, duration) in durations.iter().enumerate() {
        cursor += duration.as_nanos();
        if cursor > loop_time {
            return i;
        }
    }
    0
}

pub fn current_frame(content: &Content, now: Instant) -> &RgbImage {
    match content {
        Content::Static { image } => image,
        Content::Animation(animation) => {
            let elapsed = now.saturating_duration_since(animation.start_time());
            &animation.frames()[frame_index(animation.durations(), elapsed)]
        }
    }
}
