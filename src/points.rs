/// Monitored point registry.
///
/// Points are configured in the `[[points]]` tables of the service
/// configuration, in raster pixel coordinates. This is the single source of
/// truth for point keys: the state store and subscriber records reference
/// points only by key.

use std::collections::HashSet;

use crate::model::{CenterPoint, ConfigError};

/// Rejects an empty list, blank keys, and duplicate keys.
pub fn validate_points(points: &[CenterPoint]) -> Result<(), ConfigError> {
    if points.is_empty() {
        return Err(ConfigError::Invalid("at least one [[points]] entry is required".into()));
    }
    let mut seen = HashSet::new();
    for point in points {
        if point.key.trim().is_empty() {
            return Err(ConfigError::Invalid("point key must not be empty".into()));
        }
        if point.key.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "point key '{}' must not contain whitespace",
                point.key
            )));
        }
        if !seen.insert(point.key.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate point key '{}'", point.key)));
        }
    }
    Ok(())
}

/// Looks up a point by key. Returns `None` if not configured.
pub fn find_point<'a>(points: &'a [CenterPoint], key: &str) -> Option<&'a CenterPoint> {
    points.iter().find(|p| p.key == key)
}

/// Returns every configured key, in configuration order.
pub fn all_point_keys(points: &[CenterPoint]) -> Vec<&str> {
    points.iter().map(|p| p.key.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
