// indexed frame -> RGBA raster
use thiserror::Error;

use super::{
    palette::{Color, Palette},
    FRAME_LEN, RASTER_LEN,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has {actual} pixels, expected {}", FRAME_LEN)]
    WrongLength { actual: usize },
    #[error("raster has {actual} bytes, expected {}", RASTER_LEN)]
    RasterSize { actual: usize },
    #[error("palette index {value} at pixel {offset} is out of range")]
    IndexOutOfRange { offset: usize, value: u8 },
}

/// Writes `palette[indices[i]]` into `raster[i * 4..i * 4 + 4]` for every pixel.
///
/// The frame is validated before the first byte is written, so a rejected
/// frame leaves the previous image in `raster` untouched.
pub fn decode_frame(
    indices: &[u8],
    palette: &Palette,
    raster: &mut [u8],
) -> Result<(), FrameError> {
    if indices.len() != FRAME_LEN {
        return Err(FrameError::WrongLength {
            actual: indices.len(),
        });
    }
    if raster.len() != RASTER_LEN {
        return Err(FrameError::RasterSize {
            actual: raster.len(),
        });
    }
    if let Some(offset) = indices.iter().position(|&i| i > 3) {
        return Err(FrameError::IndexOutOfRange {
            offset,
            value: indices[offset],
        });
    }

    let colors = palette.colors().map(Color::rgba);
    for (pixel, &index) in raster.chunks_exact_mut(4).zip(indices) {
        pixel.copy_from_slice(&colors[index as usize]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Theme, WIDTH};

    #[test]
    fn all_zero_frame_is_first_color() {
        let palette = Palette::for_theme(Theme::Gray);
        let mut raster = vec![0xAB; RASTER_LEN];
        decode_frame(&[0; FRAME_LEN], &palette, &mut raster).unwrap();

        let first = palette.color(0).unwrap().rgba();
        assert!(raster.chunks_exact(4).all(|px| px == first));
    }

    #[test]
    fn pixels_land_row_major() {
        let palette = Palette::for_theme(Theme::Green);
        let mut frame = vec![0u8; FRAME_LEN];
        frame[WIDTH + 2] = 3;
        frame[FRAME_LEN - 1] = 1;
        let mut raster = vec![0; RASTER_LEN];
        decode_frame(&frame, &palette, &mut raster).unwrap();

        let at = |i: usize| &raster[i * 4..i * 4 + 4];
        assert_eq!(at(WIDTH + 2), palette.color(3).unwrap().rgba());
        assert_eq!(at(FRAME_LEN - 1), palette.color(1).unwrap().rgba());
        assert_eq!(at(0), palette.color(0).unwrap().rgba());
    }

    #[test]
    fn custom_palette_is_copied_verbatim() {
        let palette = Palette::new([
            Color(1, 2, 3, 4),
            Color(5, 6, 7, 8),
            Color(9, 10, 11, 12),
            Color(13, 14, 15, 0),
        ]);
        let frame: Vec<u8> = (0..FRAME_LEN).map(|i| (i % 4) as u8).collect();
        let mut raster = vec![0xFF; RASTER_LEN];
        decode_frame(&frame, &palette, &mut raster).unwrap();

        let expected: [u8; 16] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0];
        assert_eq!(raster[..16], expected);
        assert_eq!(raster[RASTER_LEN - 4..], [13u8, 14, 15, 0]);
    }

    #[test]
    fn index_four_is_a_fault() {
        let palette = Palette::default();
        let mut frame = vec![2u8; FRAME_LEN];
        frame[500] = 4;
        let mut raster = vec![7; RASTER_LEN];

        let err = decode_frame(&frame, &palette, &mut raster).unwrap_err();
        let expected = FrameError::IndexOutOfRange {
            offset: 500,
            value: 4,
        };
        assert_eq!(err, expected);
        assert!(raster.iter().all(|&b| b == 7));
    }

    #[test]
    fn wrong_sizes_are_faults() {
        let palette = Palette::default();
        let mut raster = vec![0; RASTER_LEN];
        assert_eq!(
            decode_frame(&[0; 100], &palette, &mut raster),
            Err(FrameError::WrongLength { actual: 100 })
        );

        let mut small = vec![0; 16];
        assert_eq!(
            decode_frame(&[0; FRAME_LEN], &palette, &mut small),
            Err(FrameError::RasterSize { actual: 16 })
        );
    }
}
