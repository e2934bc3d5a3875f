//! Radar palette classification.
//!
//! Maps one pixel color to a severity category with fixed-priority
//! channel-ratio rules. The fractional factors are applied by
//! cross-multiplying in `i32`, so the rules are exact and cannot overflow.

use image::Rgb;

use crate::model::Category;

/// Blue-dominant pixels.
fn is_rain(r: i32, g: i32, b: i32) -> bool {
    b > 2 * g && b > 2 * r
}

/// Red-dominant pixels: r > 1.3·g and r > 2·b.
fn is_storm(r: i32, g: i32, b: i32) -> bool {
    10 * r > 13 * g && r > 2 * b
}

/// Greens, or violets (red and blue both well above green and within a
/// factor of two of each other).
fn is_hail(r: i32, g: i32, b: i32) -> bool {
    let green = g > 2 * r && g > 2 * b;
    let violet = r > 3 * g && b > 3 * g && 2 * r > b && 2 * b > r;
    green || violet
}

/// Classifies a single pixel. First matching rule wins: rain, storm, hail.
pub fn classify(pixel: Rgb<u8>) -> Category {
    let [r, g, b] = pixel.0.map(i32::from);
    if is_rain(r, g, b) {
        Category::Rain
    } else if is_storm(r, g, b) {
        Category::Storm
    } else if is_hail(r, g, b) {
        Category::Hail
    } else {
        Category::None
    }
}
