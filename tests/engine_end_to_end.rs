/// End-to-end tests of the nowcasting engine on synthetic radar animations.
///
/// Each animation is built the way the real source looks: 9 frames one
/// period apart followed by 6 duplicated "now" frames. Precipitation is a
/// ring around the monitored point whose inner radius shrinks at a constant
/// speed, so the true time-to-contact is known exactly.
///
/// Run with: cargo test --test engine_end_to_end

use image::{Rgb, RgbImage};
use stormwatch_service::analysis::{analyze, FrameSequence};
use stormwatch_service::config::EngineConfig;
use stormwatch_service::model::{Category, CenterPoint};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const SIZE: u32 = 160;
const CENTER: u32 = 80;
const REAL_FRAMES: u32 = 9;
const NOW_DUPLICATES: usize = 6;

const CLEAR: Rgb<u8> = Rgb([220, 220, 220]);
const RAIN: Rgb<u8> = Rgb([30, 60, 230]);
const STORM: Rgb<u8> = Rgb([230, 40, 30]);

/// One ring layer: `color` from `inner` to `inner + width` pixels out.
struct Layer {
    offset: f64,
    width: f64,
    color: Rgb<u8>,
}

/// Renders an animation whose rings start at `start_radius` and move
/// `speed` pixels per frame (positive = inbound).
fn ring_animation(start_radius: f64, speed: f64, layers: &[Layer]) -> FrameSequence {
    let mut frames = Vec::new();
    for k in 0..REAL_FRAMES {
        let inner = start_radius - speed * f64::from(k);
        frames.push(RgbImage::from_fn(SIZE, SIZE, |x, y| {
            let dx = f64::from(x) - f64::from(CENTER);
            let dy = f64::from(y) - f64::from(CENTER);
            let d = (dx * dx + dy * dy).sqrt();
            layers
                .iter()
                .find(|l| d >= inner + l.offset && d < inner + l.offset + l.width)
                .map(|l| l.color)
                .unwrap_or(CLEAR)
        }));
    }
    let now = frames.last().cloned().expect("at least one frame");
    frames.extend(std::iter::repeat(now).take(NOW_DUPLICATES));
    FrameSequence::new(frames).expect("synthetic frames share dimensions")
}

fn center() -> Vec<CenterPoint> {
    vec![CenterPoint::new("home", CENTER, CENTER)]
}

fn rain_ring() -> Vec<Layer> {
    vec![Layer { offset: 0.0, width: 20.0, color: RAIN }]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_contracting_rain_ring_predicts_arrival() {
    // Inner edge at 12 px in the newest frame, closing 4 px per frame:
    // contact in 3 periods = 30 minutes.
    let config = EngineConfig::default();
    let frames = ring_animation(44.0, 4.0, &rain_ring());
    let forecast = analyze(&frames, &center(), &config);

    let status = forecast["home"].expect("approaching rain should be forecast");
    assert_eq!(status.category, Category::Rain);
    assert!(
        (status.start - 30).abs() <= config.minutes_per_frame as i64,
        "predicted start {} should be within one period of 30",
        status.start
    );
    // Trailing edge at 32 px now: departure around 80 minutes.
    assert!(
        status.end > status.start && status.end <= 100,
        "predicted end {} should follow the trailing edge",
        status.end
    );
}

#[test]
fn test_storm_core_escalates_category() {
    let config = EngineConfig::default();
    let layers = vec![
        Layer { offset: 0.0, width: 8.0, color: STORM },
        Layer { offset: 8.0, width: 12.0, color: RAIN },
    ];
    let frames = ring_animation(44.0, 4.0, &layers);
    let forecast = analyze(&frames, &center(), &config);

    let status = forecast["home"].expect("approaching storm should be forecast");
    assert_eq!(status.category, Category::Storm);
    assert!((status.start - 30).abs() <= 10, "start {}", status.start);
}

#[test]
fn test_stationary_ring_gives_no_forecast() {
    let frames = ring_animation(30.0, 0.0, &rain_ring());
    let forecast = analyze(&frames, &center(), &EngineConfig::default());
    assert_eq!(forecast["home"], None);
}

#[test]
fn test_receding_ring_gives_no_forecast() {
    let frames = ring_animation(12.0, -4.0, &rain_ring());
    let forecast = analyze(&frames, &center(), &EngineConfig::default());
    assert_eq!(forecast["home"], None);
}

#[test]
fn test_far_ring_is_beyond_horizon() {
    // Contact in 12 periods = 120 minutes, past the 90 minute horizon.
    let frames = ring_animation(80.0, 4.0, &rain_ring());
    let forecast = analyze(&frames, &center(), &EngineConfig::default());
    assert_eq!(forecast["home"], None);
}

#[test]
fn test_points_are_analyzed_independently() {
    let frames = ring_animation(44.0, 4.0, &rain_ring());
    let points = vec![
        CenterPoint::new("home", CENTER, CENTER),
        CenterPoint::new("corner", 2, 2),
    ];
    let together = analyze(&frames, &points, &EngineConfig::default());
    let alone = analyze(&frames, &center(), &EngineConfig::default());
    assert_eq!(together["home"], alone["home"]);
    assert_eq!(together.len(), 2);

    let mut reversed = points.clone();
    reversed.reverse();
    assert_eq!(analyze(&frames, &reversed, &EngineConfig::default()), together);
}
