//! Frame sequences and static-pixel detection.
//!
//! A `FrameSequence` is the decoded animation for one radar download,
//! oldest frame first, including the duplicated "now" frames the source
//! appends at the end. It is validated once on construction so the rest of
//! the engine can index frames without bounds surprises.

use image::{Rgb, RgbImage};

use crate::analysis::color::classify;
use crate::model::{Category, SourceError};

/// Ordered, non-empty, equal-dimension radar frames.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<RgbImage>,
    width: u32,
    height: u32,
}

impl FrameSequence {
    /// Builds a sequence, rejecting empty input and mismatched dimensions.
    pub fn new(frames: Vec<RgbImage>) -> Result<Self, SourceError> {
        let first = frames.first().ok_or(SourceError::Empty)?;
        let (width, height) = first.dimensions();
        for (index, frame) in frames.iter().enumerate().skip(1) {
            if frame.dimensions() != (width, height) {
                return Err(SourceError::InconsistentFrames {
                    expected: (width, height),
                    found: frame.dimensions(),
                    index,
                });
            }
        }
        Ok(FrameSequence { frames, width, height })
    }

    /// Number of frames; never zero.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame(&self, index: usize) -> &RgbImage {
        &self.frames[index]
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// Computes the static-pixel mask for this sequence.
    pub fn static_mask(&self) -> StaticMask {
        let mut fixed = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                fixed.push(is_fixed_pixel(&self.frames, x, y));
            }
        }
        StaticMask {
            fixed,
            width: self.width,
        }
    }
}

/// A coloured pixel that never changes is map background (borders, labels,
/// the radar site marker), not weather.
fn is_fixed_pixel(frames: &[RgbImage], x: u32, y: u32) -> bool {
    let first: Rgb<u8> = *frames[0].get_pixel(x, y);
    if classify(first) == Category::None {
        return false;
    }
    frames.iter().all(|frame| *frame.get_pixel(x, y) == first)
}

/// Per-pixel "fixed" flags for one frame sequence, row-major.
#[derive(Debug, Clone)]
pub struct StaticMask {
    fixed: Vec<bool>,
    width: u32,
}

impl StaticMask {
    /// Caller guarantees `(x, y)` is inside the raster.
    pub fn is_fixed(&self, x: u32, y: u32) -> bool {
        self.fixed[y as usize * self.width as usize + x as usize]
    }

    pub fn fixed_count(&self) -> usize {
        self.fixed.iter().filter(|f| **f).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAIN: Rgb<u8> = Rgb([0, 0, 255]);
    const STORM: Rgb<u8> = Rgb([255, 0, 0]);
    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    fn uniform(width: u32, height: u32, color: Rgb<u8>, count: usize) -> Vec<RgbImage> {
        (0..count).map(|_| RgbImage::from_pixel(width, height, color)).collect()
    }

    #[test]
    fn test_empty_sequence_is_rejected() {
        assert_eq!(FrameSequence::new(Vec::new()).unwrap_err(), SourceError::Empty);
    }

    #[test]
    fn test_mismatched_dimensions_are_rejected() {
        let mut frames = uniform(8, 8, GRAY, 3);
        frames.push(RgbImage::from_pixel(8, 7, GRAY));
        let err = FrameSequence::new(frames).unwrap_err();
        assert_eq!(
            err,
            SourceError::InconsistentFrames { expected: (8, 8), found: (8, 7), index: 3 }
        );
    }

    #[test]
    fn test_constant_colored_pixel_is_fixed() {
        let seq = FrameSequence::new(uniform(4, 4, RAIN, 5)).unwrap();
        let mask = seq.static_mask();
        assert!(mask.is_fixed(2, 3));
        assert_eq!(mask.fixed_count(), 16);
    }

    #[test]
    fn test_constant_none_pixel_is_not_fixed() {
        let seq = FrameSequence::new(uniform(4, 4, GRAY, 5)).unwrap();
        assert_eq!(seq.static_mask().fixed_count(), 0);
    }

    #[test]
    fn test_change_in_any_single_frame_unfixes_pixel() {
        for changed in 0..5 {
            let mut frames = uniform(4, 4, RAIN, 5);
            frames[changed].put_pixel(1, 1, STORM);
            let mask = FrameSequence::new(frames).unwrap().static_mask();
            assert!(!mask.is_fixed(1, 1), "change in frame {} should unfix", changed);
            assert!(mask.is_fixed(0, 0));
        }
    }

    #[test]
    fn test_contains_bounds() {
        let seq = FrameSequence::new(uniform(5, 3, GRAY, 1)).unwrap();
        assert_eq!(seq.frame_count(), 1);
        assert!(seq.contains(0, 0));
        assert!(seq.contains(4, 2));
        assert!(!seq.contains(5, 2));
        assert!(!seq.contains(-1, 0));
        assert!(!seq.contains(0, 3));
    }
}
