//! Multi-point analysis entry point.
//!
//! A pure function of (frames, points, configuration): no I/O, no logging,
//! no state kept between calls. Every point, every category and every
//! direction is computed independently and folded with `range::merge`.

use std::collections::BTreeMap;

use crate::analysis::frames::{FrameSequence, StaticMask};
use crate::analysis::range::merge_all;
use crate::analysis::ray::{direction_angle, ray_range};
use crate::analysis::status::resolve_status;
use crate::config::EngineConfig;
use crate::model::{Category, CenterPoint, Range, Status};

/// Forecast per point key; `None` means no significant precipitation.
pub type Forecast = BTreeMap<String, Option<Status>>;

/// Merged window for one category around one point, over all directions.
pub fn category_range(
    frames: &FrameSequence,
    mask: &StaticMask,
    center: &CenterPoint,
    category: Category,
    config: &EngineConfig,
) -> Option<Range> {
    merge_all((0..config.direction_count).map(|d| {
        let angle = direction_angle(d, config.direction_count);
        ray_range(frames, mask, center, angle, category, config)
    }))
}

/// Full pipeline for a single point.
pub fn analyze_point(
    frames: &FrameSequence,
    mask: &StaticMask,
    center: &CenterPoint,
    config: &EngineConfig,
) -> Option<Status> {
    let ranges: Vec<(Category, Option<Range>)> = Category::SIGNIFICANT
        .iter()
        .map(|&category| (category, category_range(frames, mask, center, category, config)))
        .collect();
    resolve_status(&ranges, config)
}

/// Analyzes every monitored point against the same frame sequence.
pub fn analyze(frames: &FrameSequence, points: &[CenterPoint], config: &EngineConfig) -> Forecast {
    let mask = frames.static_mask();
    points
        .iter()
        .map(|point| (point.key.clone(), analyze_point(frames, &mask, point, config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_clear_sky_gives_no_forecast_for_every_point() {
        let frames = FrameSequence::new(
            (0..15).map(|_| RgbImage::from_pixel(64, 64, Rgb([200, 200, 200]))).collect(),
        )
        .unwrap();
        let points = vec![CenterPoint::new("a", 10, 10), CenterPoint::new("b", 40, 50)];
        let forecast = analyze(&frames, &points, &EngineConfig::default());
        assert_eq!(forecast.len(), 2);
        assert!(forecast.values().all(Option::is_none));
    }

    #[test]
    fn test_static_rain_colored_background_is_ignored() {
        // Rain-colored everywhere and never changing: all pixels are fixed.
        let frames = FrameSequence::new(
            (0..15).map(|_| RgbImage::from_pixel(64, 64, Rgb([0, 0, 255]))).collect(),
        )
        .unwrap();
        let points = vec![CenterPoint::new("a", 32, 32)];
        let forecast = analyze(&frames, &points, &EngineConfig::default());
        assert_eq!(forecast["a"], None);
    }

    #[test]
    fn test_point_outside_raster_has_no_forecast() {
        let frames = FrameSequence::new(vec![RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))]).unwrap();
        let points = vec![CenterPoint::new("far", 500, 500)];
        let forecast = analyze(&frames, &points, &EngineConfig::default());
        assert_eq!(forecast["far"], None);
    }

    #[test]
    fn test_points_on_raster_border_use_remaining_directions() {
        // A 5 px high strip: most rays leave the raster within a few steps.
        // The band's leading edge moves from x = 44 towards x = 0 at 4 px per frame.
        let config = EngineConfig { trailing_frames: 0, ..EngineConfig::default() };
        let frames = FrameSequence::new(
            (0..9u32)
                .map(|k| {
                    RgbImage::from_fn(100, 5, |x, _| {
                        if x >= 44 - 4 * k && x < 64 - 4 * k {
                            Rgb([0, 0, 255])
                        } else {
                            Rgb([128, 128, 128])
                        }
                    })
                })
                .collect(),
        )
        .unwrap();
        let points = vec![CenterPoint::new("west", 0, 2), CenterPoint::new("east", 99, 2)];
        let forecast = analyze(&frames, &points, &config);

        let west = forecast["west"].expect("band approaching the west edge");
        assert_eq!(west.category, Category::Rain);
        assert_eq!(west.start, 30);
        assert!(west.end >= 80, "end = {}", west.end);

        // Seen from the east edge the band only recedes.
        assert_eq!(forecast["east"], None);
    }
}
