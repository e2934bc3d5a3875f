/// Radar nowcasting engine.
///
/// Turns an animated radar composite into per-point precipitation forecasts
/// using pixel-color thresholds and per-direction linear regression. Pure
/// computation: callers own fetching, persistence and notification.
///
/// Submodules, leaf to root:
/// - `color`      — pixel color → severity category.
/// - `frames`     — validated frame sequence and static-pixel mask.
/// - `ray`        — radial sampling of onset/end distances per frame.
/// - `regression` — arrival/departure extrapolation from those distances.
/// - `range`      — outer-bound union of forecast windows.
/// - `status`     — per-point clustering into a single forecast.
/// - `engine`     — multi-point entry point.

pub mod color;
pub mod engine;
pub mod frames;
pub mod range;
pub mod ray;
pub mod regression;
pub mod status;

pub use engine::{analyze, analyze_point, Forecast};
pub use frames::{FrameSequence, StaticMask};
