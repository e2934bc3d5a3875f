//! Forecast anchoring and the "substantial change" policy.
//!
//! The engine reports minutes relative to the analysis; subscribers care
//! about wall-clock times, and should only hear about a new forecast when it
//! differs enough from the one they already got.
//!
//! # Clock injection
//! Every function takes `now: DateTime<Utc>` instead of calling `Utc::now()`
//! so the policy is deterministic in tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::analysis::Forecast;
use crate::model::{AnchoredStatus, Status};

/// A start time moving by more than this is worth a new message.
pub const MIN_START_SHIFT_MINUTES: i64 = 20;

/// An "all clear" is only sent if the cancelled event would have lasted at
/// least this much longer.
pub const MIN_REMAINING_MINUTES: i64 = 10;

/// `now` shifted by `minutes`, saturating at the representable range.
fn offset(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    Duration::try_minutes(minutes)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(if minutes < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Anchors a relative status at `now`.
pub fn anchor(status: &Status, now: DateTime<Utc>) -> AnchoredStatus {
    AnchoredStatus {
        start: offset(now, status.start),
        end: offset(now, status.end),
        category: status.category,
    }
}

/// A stored status whose event is over no longer describes anything.
pub fn unexpired(status: Option<&AnchoredStatus>, now: DateTime<Utc>) -> Option<&AnchoredStatus> {
    status.filter(|s| s.end > now)
}

/// Anchors a whole forecast at `now`.
pub fn anchor_forecast(
    forecast: &Forecast,
    now: DateTime<Utc>,
) -> BTreeMap<String, Option<AnchoredStatus>> {
    forecast
        .iter()
        .map(|(key, status)| (key.clone(), status.as_ref().map(|s| anchor(s, now))))
        .collect()
}

/// Decides whether `new` differs enough from `old` to notify subscribers.
///
/// - nothing before, nothing now: no
/// - something before, nothing now: only if the old event had more than
///   `MIN_REMAINING_MINUTES` left to run
/// - nothing before, something now: yes
/// - category changed: yes
/// - otherwise: only if the start moved by more than `MIN_START_SHIFT_MINUTES`
pub fn substantial_change(
    old: Option<&AnchoredStatus>,
    new: Option<&AnchoredStatus>,
    now: DateTime<Utc>,
) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(old), None) => old.end > now + Duration::minutes(MIN_REMAINING_MINUTES),
        (None, Some(_)) => true,
        (Some(old), Some(new)) => {
            if old.category != new.category {
                return true;
            }
            (old.start - new.start).num_minutes().abs() > MIN_START_SHIFT_MINUTES
        }
    }
}
