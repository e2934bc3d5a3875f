//! Per-point forecast resolution.
//!
//! Combines the per-category windows of one point into a single forecast:
//! overlapping (or nearly touching) windows are clustered, the cluster takes
//! the most severe category it contains, and only the earliest cluster is
//! reported.

use crate::config::EngineConfig;
use crate::model::{Category, Range, Status};

/// Resolves per-category windows into one forecast.
///
/// Windows whose start lies within one frame period of the running cluster
/// end are absorbed into the cluster. Later, separate clusters are dropped:
/// only the nearest event is reported per cycle.
pub fn resolve_status(ranges: &[(Category, Option<Range>)], config: &EngineConfig) -> Option<Status> {
    let mut present: Vec<(Range, Category)> = ranges
        .iter()
        .filter_map(|(category, range)| range.map(|r| (r, *category)))
        .collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.0.start.total_cmp(&b.0.start).then(a.1.cmp(&b.1)));

    let mut entries = present.into_iter();
    let (mut cluster, mut category) = entries.next()?;
    for (range, next_category) in entries {
        if range.start > cluster.end + config.minutes_per_frame {
            break;
        }
        cluster.end = cluster.end.max(range.end);
        category = category.max(next_category);
    }

    if cluster.start > config.horizon_minutes {
        return None;
    }
    if cluster.duration() < config.min_event_minutes {
        return None;
    }
    Some(Status {
        start: cluster.start.round() as i64,
        end: cluster.end.round() as i64,
        category,
    })
}
