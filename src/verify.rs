//! Point Verification Module
//!
//! Checks the configured points against an actual radar animation to find
//! out which of them the engine can analyze properly: a point outside the
//! raster is useless, a point near the edge loses directions, and a point
//! sitting on a map label or border is blind in its own pixel.
//!
//! Run this (`--verify`) after adding points or when the radar product
//! changes its map projection.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::{FrameSequence, StaticMask};
use crate::config::EngineConfig;
use crate::model::CenterPoint;

/// Points with more than this share of fixed pixels around them are only
/// partially usable.
pub const MAX_FIXED_FRACTION: f64 = 0.25;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub fixed_pixels: usize,
    pub results: Vec<PointVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointVerification {
    pub key: String,
    pub name: String,
    pub status: VerificationStatus,
    pub within_raster: bool,
    pub radius_fits: bool,
    pub center_fixed: bool,
    /// Share of fixed pixels inside the analysis radius (in-bounds only).
    pub fixed_fraction: f64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Point Verification
// ============================================================================

fn fixed_fraction(frames: &FrameSequence, mask: &StaticMask, point: &CenterPoint, radius: i64) -> f64 {
    let (cx, cy) = (point.x as i64, point.y as i64);
    let mut inside = 0usize;
    let mut fixed = 0usize;

    for y in (cy - radius)..=(cy + radius) {
        for x in (cx - radius)..=(cx + radius) {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy > radius * radius || !frames.contains(x, y) {
                continue;
            }
            inside += 1;
            if mask.is_fixed(x as u32, y as u32) {
                fixed += 1;
            }
        }
    }

    if inside == 0 {
        0.0
    } else {
        fixed as f64 / inside as f64
    }
}

pub fn verify_point(
    frames: &FrameSequence,
    mask: &StaticMask,
    point: &CenterPoint,
    config: &EngineConfig,
) -> PointVerification {
    let mut result = PointVerification {
        key: point.key.clone(),
        name: point.display_name().to_string(),
        status: VerificationStatus::Failed,
        within_raster: false,
        radius_fits: false,
        center_fixed: false,
        fixed_fraction: 0.0,
        error_message: None,
    };

    let (x, y) = (point.x as i64, point.y as i64);
    if !frames.contains(x, y) {
        result.error_message = Some(format!(
            "({}, {}) is outside the {}x{} raster",
            point.x,
            point.y,
            frames.width(),
            frames.height()
        ));
        return result;
    }
    result.within_raster = true;

    let radius = config.max_radius as i64;
    result.radius_fits = frames.contains(x - radius, y - radius)
        && frames.contains(x + radius, y + radius);
    result.center_fixed = mask.is_fixed(point.x, point.y);
    result.fixed_fraction = fixed_fraction(frames, mask, point, radius);

    let mut problems = Vec::new();
    if !result.radius_fits {
        problems.push(format!("radius {} crosses the raster edge", radius));
    }
    if result.center_fixed {
        problems.push("center pixel never changes (map overlay?)".to_string());
    }
    if result.fixed_fraction > MAX_FIXED_FRACTION {
        problems.push(format!("{:.0}% of nearby pixels are fixed", result.fixed_fraction * 100.0));
    }

    if problems.is_empty() {
        result.status = VerificationStatus::Success;
    } else {
        result.status = VerificationStatus::PartialSuccess;
        result.error_message = Some(problems.join("; "));
    }

    result
}

// ============================================================================
// Report
// ============================================================================

/// Verifies every configured point against one decoded animation.
pub fn verify_points(
    frames: &FrameSequence,
    points: &[CenterPoint],
    config: &EngineConfig,
) -> VerificationReport {
    let mask = frames.static_mask();
    let results: Vec<PointVerification> = points
        .iter()
        .map(|point| verify_point(frames, &mask, point, config))
        .collect();

    let count = |status: VerificationStatus| results.iter().filter(|r| r.status == status).count();
    let summary = VerificationSummary {
        total: results.len(),
        working: count(VerificationStatus::Success),
        partial: count(VerificationStatus::PartialSuccess),
        failed: count(VerificationStatus::Failed),
    };

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        frame_count: frames.frame_count(),
        width: frames.width(),
        height: frames.height(),
        fixed_pixels: mask.fixed_count(),
        results,
        summary,
    }
}

/// Prints a human-readable summary to stdout.
pub fn print_report(report: &VerificationReport) {
    println!("\n{}", "=".repeat(72));
    println!("POINT VERIFICATION REPORT");
    println!("{}", "=".repeat(72));
    println!("Generated: {}", report.timestamp);
    println!(
        "Animation: {} frames, {}x{}, {} fixed pixels",
        report.frame_count, report.width, report.height, report.fixed_pixels
    );
    println!(
        "Points: {}/{} working, {} partial, {} failed\n",
        report.summary.working, report.summary.total, report.summary.partial, report.summary.failed
    );

    for r in &report.results {
        let icon = match r.status {
            VerificationStatus::Success => "✓",
            VerificationStatus::PartialSuccess => "⚠",
            VerificationStatus::Failed => "✗",
        };
        println!("{} {} ({}) fixed {:.1}%", icon, r.key, r.name, r.fixed_fraction * 100.0);
        if let Some(msg) = &r.error_message {
            println!("    {}", msg);
        }
    }
}
