//! Radial ray sampling.
//!
//! From a monitored center, each ray walks outward at a fixed angle through
//! every frame of the considered window and records where the target
//! category starts (onset) and where the precipitation stops again (end).
//! The per-frame distances are then handed to the regressor.

use std::f64::consts::TAU;
use std::ops::Range as IndexRange;

use crate::analysis::color::classify;
use crate::analysis::frames::{FrameSequence, StaticMask};
use crate::analysis::regression::event_range;
use crate::config::EngineConfig;
use crate::model::{Category, CenterPoint, Range};

/// What one frame shows along one ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaySample {
    /// Frame offset relative to the newest considered frame (0 = now).
    pub offset: i64,
    /// First pixel index showing the target category.
    pub onset: Option<u32>,
    /// First pixel index after the onset showing no precipitation.
    pub end: Option<u32>,
}

/// Frame indices fed to the sampler: the `frames_considered` frames that
/// precede the trailing duplicated "now" frames.
///
/// Animations shorter than the trailing offset are used as-is.
pub fn frame_window(frame_count: usize, config: &EngineConfig) -> IndexRange<usize> {
    let end = if frame_count > config.trailing_frames {
        frame_count - config.trailing_frames
    } else {
        frame_count
    };
    end.saturating_sub(config.frames_considered)..end
}

/// Angle of direction `index` out of `count` evenly spaced directions.
pub fn direction_angle(index: u32, count: u32) -> f64 {
    TAU * f64::from(index) / f64::from(count)
}

/// Walks a single frame along one ray.
fn walk_frame(
    frames: &FrameSequence,
    mask: &StaticMask,
    frame_index: usize,
    center: &CenterPoint,
    (cos, sin): (f64, f64),
    target: Category,
    radius: u32,
) -> (Option<u32>, Option<u32>) {
    let frame = frames.frame(frame_index);
    let mut onset = None;
    for i in 0..radius {
        let step = f64::from(i);
        let x = i64::from(center.x) + (step * cos) as i64;
        let y = i64::from(center.y) + (step * sin) as i64;
        if !frames.contains(x, y) {
            break;
        }
        let (x, y) = (x as u32, y as u32);
        if mask.is_fixed(x, y) {
            continue;
        }
        let category = classify(*frame.get_pixel(x, y));
        match onset {
            None if category == target => onset = Some(i),
            Some(_) if category == Category::None => return (onset, Some(i)),
            _ => {}
        }
    }
    (onset, None)
}

/// Samples every considered frame along the ray at `angle`, oldest first.
pub fn sample_ray(
    frames: &FrameSequence,
    mask: &StaticMask,
    center: &CenterPoint,
    angle: f64,
    target: Category,
    config: &EngineConfig,
) -> Vec<RaySample> {
    let window = frame_window(frames.frame_count(), config);
    let newest = window.end as i64 - 1;
    let direction = (angle.cos(), angle.sin());
    window
        .map(|frame_index| {
            let (onset, end) = walk_frame(
                frames,
                mask,
                frame_index,
                center,
                direction,
                target,
                config.max_radius,
            );
            RaySample {
                offset: frame_index as i64 - newest,
                onset,
                end,
            }
        })
        .collect()
}

/// Regression inputs for one ray: onset and end points, with the most
/// recent samples counted twice so the fit leans towards the latest frames.
fn regression_inputs(samples: &[RaySample], recent: usize) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let recent_cutoff = -(recent as i64);
    let mut onsets = Vec::new();
    let mut ends = Vec::new();
    for sample in samples {
        let copies = if sample.offset > recent_cutoff { 2 } else { 1 };
        for _ in 0..copies {
            if let Some(onset) = sample.onset {
                onsets.push((sample.offset as f64, f64::from(onset)));
            }
            if let Some(end) = sample.end {
                ends.push((sample.offset as f64, f64::from(end)));
            }
        }
    }
    (onsets, ends)
}

/// Forecast window for `target` along one ray, or `None` when the ray does
/// not show a clear approaching edge.
pub fn ray_range(
    frames: &FrameSequence,
    mask: &StaticMask,
    center: &CenterPoint,
    angle: f64,
    target: Category,
    config: &EngineConfig,
) -> Option<Range> {
    let samples = sample_ray(frames, mask, center, angle, target, config);
    let considered = samples.len();
    let onset_frames = samples.iter().filter(|s| s.onset.is_some()).count();
    if considered == 0 || (onset_frames as f64) < config.onset_coverage * considered as f64 {
        return None;
    }
    let end_frames = samples.iter().filter(|s| s.end.is_some()).count();
    let (onsets, ends) = regression_inputs(&samples, config.recent_duplicates);
    event_range(&onsets, &ends, end_frames, considered, config)
}
