//! Arrival-time extrapolation.
//!
//! Each ray gives, per frame, the pixel distance at which a category starts
//! (onset) and stops (end). A precipitation field moving towards the center
//! shows up as distances shrinking linearly with time, so an ordinary
//! least-squares line through (frame offset, distance) crosses zero at the
//! moment the edge reaches the center.
//!
//! Frame offsets are relative to the newest considered frame (0), older
//! frames being negative, so the zero crossing `-b/k` is directly a number
//! of frame periods from now.

use crate::config::EngineConfig;
use crate::model::Range;

/// A fitted `index = slope * offset + intercept` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub correlation: f64,
}

impl LineFit {
    /// Offset (in frame periods) at which the line reaches index 0.
    pub fn zero_crossing(&self) -> f64 {
        -self.intercept / self.slope
    }
}

/// Plain OLS fit with Pearson correlation.
///
/// Returns `None` when either coordinate has no variance, since neither the
/// slope nor the correlation is defined then.
pub fn least_squares(points: &[(f64, f64)]) -> Option<LineFit> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    Some(LineFit {
        slope,
        intercept: mean_y - slope * mean_x,
        correlation: sxy / (sxx * syy).sqrt(),
    })
}

fn distinct_count(points: &[(f64, f64)]) -> usize {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();
    sorted.len()
}

/// Fits a line and keeps it only if it describes a clear inbound trend:
/// at least 3 distinct points, correlation below the configured threshold,
/// and a slope of at least `min_slope` pixels per frame period.
pub fn fit_inbound_trend(points: &[(f64, f64)], config: &EngineConfig) -> Option<LineFit> {
    if distinct_count(points) < 3 {
        return None;
    }
    let fit = least_squares(points)?;
    if !(fit.correlation < config.correlation_threshold) {
        return None;
    }
    if fit.slope.abs() < config.min_slope {
        return None;
    }
    Some(fit)
}

/// Minutes from now until the tracked edge reaches the center.
pub fn minutes_to_contact(points: &[(f64, f64)], config: &EngineConfig) -> Option<f64> {
    let fit = fit_inbound_trend(points, config)?;
    Some(fit.zero_crossing() * config.minutes_per_frame)
}

/// Turns one ray's onset and end samples into a forecast window.
///
/// `end_frames` is the number of considered frames that produced an end
/// sample and `considered` the number of frames in the window. An end that
/// is too sparsely observed, or that does not fit an inbound trend, is
/// reported as the unbounded sentinel.
pub fn event_range(
    onsets: &[(f64, f64)],
    ends: &[(f64, f64)],
    end_frames: usize,
    considered: usize,
    config: &EngineConfig,
) -> Option<Range> {
    let period = config.minutes_per_frame;
    let start = minutes_to_contact(onsets, config)?;
    if start < -period || start > config.horizon_minutes {
        return None;
    }

    let end_observed = considered > 0 && end_frames as f64 >= config.end_coverage * considered as f64;
    let end = if end_observed {
        minutes_to_contact(ends, config).unwrap_or(config.unbounded_end_minutes)
    } else {
        config.unbounded_end_minutes
    };
    if end < start - period {
        return None;
    }
    Some(Range::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(slope: f64, intercept: f64) -> Vec<(f64, f64)> {
        (-8..=0)
            .map(|o| (o as f64, slope * o as f64 + intercept))
            .collect()
    }

    #[test]
    fn test_constant_slope_ray_arrives_now() {
        // Offsets -8..0, indices 16, 14, ..., 0.
        let points = linear(-2.0, 0.0);
        assert_eq!(points.first(), Some(&(-8.0, 16.0)));
        let fit = least_squares(&points).expect("well-conditioned input");
        assert!((fit.correlation + 1.0).abs() < 1e-12, "r = {}", fit.correlation);
        assert!((fit.slope + 2.0).abs() < 1e-12, "k = {}", fit.slope);

        let minutes = minutes_to_contact(&points, &EngineConfig::default())
            .expect("perfect inbound trend should be accepted");
        assert!(minutes.abs() < 1e-9, "arrival = {}", minutes);
    }

    #[test]
    fn test_arrival_scales_with_frame_period() {
        // Edge at 12 px now, closing 4 px per frame: 3 periods away.
        let points = linear(-4.0, 12.0);
        let config = EngineConfig::default();
        let minutes = minutes_to_contact(&points, &config).unwrap();
        assert!((minutes - 30.0).abs() < 1e-9);

        let slow_frames = EngineConfig { minutes_per_frame: 5.0, ..config };
        let minutes = minutes_to_contact(&points, &slow_frames).unwrap();
        assert!((minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_fewer_than_three_distinct_points_rejected() {
        let config = EngineConfig::default();
        assert!(minutes_to_contact(&[(-1.0, 10.0), (0.0, 8.0)], &config).is_none());
        // Duplicates do not count as extra points.
        let duplicated = [(-1.0, 10.0), (0.0, 8.0), (0.0, 8.0), (-1.0, 10.0)];
        assert!(minutes_to_contact(&duplicated, &config).is_none());
    }

    #[test]
    fn test_zero_variance_indices_rejected() {
        let flat = linear(0.0, 5.0);
        assert!(least_squares(&flat).is_none());
        assert!(minutes_to_contact(&flat, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_single_offset_rejected() {
        // Three distinct points, but all in the same frame: no time axis.
        let same_frame = [(0.0, 1.0), (0.0, 2.0), (0.0, 3.0)];
        assert!(least_squares(&same_frame).is_none());
        assert!(minutes_to_contact(&same_frame, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_outbound_trend_rejected() {
        let receding = linear(3.0, 40.0);
        assert!(minutes_to_contact(&receding, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_slow_trend_rejected() {
        let crawling = linear(-0.5, 10.0);
        assert!(minutes_to_contact(&crawling, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_noisy_trend_rejected() {
        let noisy = vec![
            (-4.0, 30.0),
            (-3.0, 10.0),
            (-2.0, 28.0),
            (-1.0, 8.0),
            (0.0, 20.0),
        ];
        let fit = least_squares(&noisy).unwrap();
        assert!(fit.correlation > -0.93);
        assert!(minutes_to_contact(&noisy, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_event_range_with_observed_end() {
        let onsets = linear(-4.0, 12.0);
        let ends = linear(-4.0, 32.0);
        let range = event_range(&onsets, &ends, 9, 9, &EngineConfig::default()).unwrap();
        assert!((range.start - 30.0).abs() < 1e-9);
        assert!((range.end - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_end_is_unbounded() {
        let config = EngineConfig::default();
        let onsets = linear(-4.0, 12.0);
        let ends = linear(-4.0, 32.0);
        // 4 of 9 frames is below the 50% end coverage.
        let range = event_range(&onsets, &ends[..4], 4, 9, &config).unwrap();
        assert_eq!(range.end, config.unbounded_end_minutes);
    }

    #[test]
    fn test_well_covered_end_without_trend_is_unbounded() {
        let config = EngineConfig::default();
        let onsets = linear(-4.0, 12.0);
        // Every frame shows an end, but it never moves.
        let ends = linear(0.0, 50.0);
        let range = event_range(&onsets, &ends, 9, 9, &config).unwrap();
        assert!((range.start - 30.0).abs() < 1e-9);
        assert_eq!(range.end, config.unbounded_end_minutes);
    }

    #[test]
    fn test_start_beyond_horizon_discarded() {
        // 10 periods away = 100 minutes > 90.
        let onsets = linear(-4.0, 40.0);
        assert!(event_range(&onsets, &[], 0, 9, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_start_already_elapsed_discarded() {
        // Zero crossing 2 periods ago: -20 minutes < -10.
        let onsets = linear(-4.0, -8.0);
        assert!(event_range(&onsets, &[], 0, 9, &EngineConfig::default()).is_none());
    }

    #[test]
    fn test_end_before_start_discarded() {
        let onsets = linear(-4.0, 32.0);
        let ends = linear(-4.0, 4.0);
        assert!(event_range(&onsets, &ends, 9, 9, &EngineConfig::default()).is_none());
    }
}
