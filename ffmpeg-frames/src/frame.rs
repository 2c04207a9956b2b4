use std::fmt::{Display, Formatter};

use bytes::Bytes;

/// A tightly packed RGB24 picture (`width * height * 3` bytes, no row padding).
#[derive(Debug, Clone, Default)]
pub struct RgbFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub pts: Option<i64>,
}

impl RgbFrame {
    /// Copies plane 0 of an RGB24 ffmpeg frame, dropping the per-row stride padding.
    pub fn from_rgb24(frame: &ffmpeg_next::frame::Video) -> anyhow::Result<Self> {
        if frame.format() != ffmpeg_next::format::Pixel::RGB24 {
            anyhow::bail!("expected rgb24 frame, got {:?}", frame.format());
        }
        let width = frame.width();
        let height = frame.height();
        let data = pack_rows(frame.data(0), frame.stride(0), width as usize * 3, height as usize)?;
        Ok(Self {
            data: Bytes::from(data),
            width,
            height,
            pts: frame.pts(),
        })
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data.to_vec()
    }
}

fn pack_rows(plane: &[u8], stride: usize, row_len: usize, rows: usize) -> anyhow::Result<Vec<u8>> {
    if stride < row_len || plane.len() < stride * rows.saturating_sub(1) + row_len {
        anyhow::bail!(
            "plane too small: {} bytes for {} rows of {} (stride {})",
            plane.len(),
            rows,
            row_len,
            stride
        );
    }
    let mut out = Vec::with_capacity(row_len * rows);
    for row in 0..rows {
        let start = row * stride;
        out.extend_from_slice(&plane[start..start + row_len]);
    }
    Ok(out)
}

impl Display for RgbFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "RgbFrame {}x{}, data_len: {}, pts: {:?}",
            self.width,
            self.height,
            self.data.len(),
            self.pts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_rows_drops_padding() {
        // 2x2 rgb24 with stride 8 (2 bytes padding per row)
        let plane = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        let packed = pack_rows(&plane, 8, 6, 2).unwrap();
        assert_eq!(packed, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn test_pack_rows_rejects_short_plane() {
        let plane = [0u8; 10];
        assert!(pack_rows(&plane, 8, 6, 2).is_err());
    }
}
