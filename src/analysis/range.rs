//! Outer-bound union of forecast windows.

use crate::model::Range;

/// Merges two optional windows. `None` is the identity; two present windows
/// combine into the earliest start and the latest end.
pub fn merge(a: Option<Range>, b: Option<Range>) -> Option<Range> {
    match (a, b) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) => Some(Range::new(a.start.min(b.start), a.end.max(b.end))),
    }
}

/// Folds `merge` over any number of optional windows.
pub fn merge_all<I>(ranges: I) -> Option<Range>
where
    I: IntoIterator<Item = Option<Range>>,
{
    ranges.into_iter().fold(None, merge)
}
