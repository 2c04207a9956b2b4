use std::io::Write;

use crate::fixture::write_test_video;
use crate::sampler::{SampleOptions, sample};

fn clip(frames: usize) -> anyhow::Result<tempfile::NamedTempFile> {
    crate::init()?;
    let file = tempfile::Builder::new().suffix(".mp4").tempfile()?;
    write_test_video(file.path(), frames, 48, 32, 10)?;
    Ok(file)
}

#[test]
fn test_sample_full_clip() -> anyhow::Result<()> {
    let file = clip(20)?;
    let options = SampleOptions {
        width: 64,
        height: 64,
        max_frames: 150,
    };
    let video = sample(file.path(), &options)?;

    assert_eq!(video.frames.len(), 20);
    assert!(!video.truncated);
    for frame in &video.frames {
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 64);
        assert_eq!(frame.data.len(), 64 * 64 * 3);
    }
    let fps = video.fps.expect("container reports a rate");
    assert!((fps - 10.0).abs() < 1.0, "fps {}", fps);
    Ok(())
}

#[test]
fn test_sample_truncates_at_cap() -> anyhow::Result<()> {
    let file = clip(12)?;
    let options = SampleOptions {
        width: 32,
        height: 16,
        max_frames: 5,
    };
    let video = sample(file.path(), &options)?;

    assert_eq!(video.frames.len(), 5);
    assert!(video.truncated);
    assert_eq!(video.frames[0].data.len(), 32 * 16 * 3);
    Ok(())
}

#[test]
fn test_sample_exactly_at_cap_is_not_truncated() -> anyhow::Result<()> {
    let file = clip(5)?;
    let options = SampleOptions {
        width: 16,
        height: 16,
        max_frames: 5,
    };
    let video = sample(file.path(), &options)?;

    assert_eq!(video.frames.len(), 5);
    assert!(!video.truncated);
    Ok(())
}

#[test]
fn test_sample_rejects_garbage() -> anyhow::Result<()> {
    crate::init()?;
    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile()?;
    file.write_all(b"definitely not a video container")?;
    file.flush()?;

    let options = SampleOptions {
        width: 64,
        height: 64,
        max_frames: 150,
    };
    assert!(sample(file.path(), &options).is_err());
    Ok(())
}
