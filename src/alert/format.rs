//! Human-readable forecast messages.

use chrono::{DateTime, Utc};

use crate::model::{AnchoredStatus, Category};

/// Reply to `/start`.
pub const HELP: &str = "I watch the weather radar and warn you when heavy rain, \
a thunderstorm or hail is about to reach your area (up to about 1.5 hours ahead).\n\
\n\
Commands:\n\
/point <key> - follow another location\n\
/stop - unsubscribe\n\
Any other message - show the current forecast";

fn describe(category: Category) -> &'static str {
    match category {
        Category::Rain => "heavy rain",
        Category::Storm => "a thunderstorm",
        Category::Hail => "hail",
        Category::None => "no precipitation",
    }
}

/// Formats a forecast for one location.
///
/// Events whose end lies beyond `horizon_minutes` from now are open-ended
/// (their end could not be estimated), so no duration is shown for them.
pub fn format_status(
    place: &str,
    status: Option<&AnchoredStatus>,
    now: DateTime<Utc>,
    horizon_minutes: f64,
) -> String {
    let Some(status) = status else {
        return format!("{}: no significant precipitation expected in the near future.", place);
    };

    let mut text = if status.start <= now {
        format!("{}: {} expected shortly", place, describe(status.category))
    } else {
        format!(
            "{}: {} expected in {} minutes",
            place,
            describe(status.category),
            (status.start - now).num_minutes()
        )
    };

    let until_end = (status.end - now).num_minutes();
    if (until_end as f64) < horizon_minutes {
        text.push_str(&format!(", lasting {} minutes", (status.end - status.start).num_minutes()));
    }
    text.push('.');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::change::anchor;
    use crate::model::Status;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap()
    }

    fn status(start: i64, end: i64, category: Category) -> AnchoredStatus {
        anchor(&Status { start, end, category }, fixed_now())
    }

    #[test]
    fn test_no_status_message() {
        let text = format_status("Home", None, fixed_now(), 90.0);
        assert_eq!(text, "Home: no significant precipitation expected in the near future.");
    }

    #[test]
    fn test_upcoming_event_with_duration() {
        let s = status(25, 65, Category::Storm);
        let text = format_status("Home", Some(&s), fixed_now(), 90.0);
        assert_eq!(text, "Home: a thunderstorm expected in 25 minutes, lasting 40 minutes.");
    }

    #[test]
    fn test_ongoing_event_says_shortly() {
        let s = status(-5, 30, Category::Rain);
        let text = format_status("Home", Some(&s), fixed_now(), 90.0);
        assert_eq!(text, "Home: heavy rain expected shortly, lasting 35 minutes.");
    }

    #[test]
    fn test_open_ended_event_omits_duration() {
        let s = status(40, 1000, Category::Hail);
        let text = format_status("Home", Some(&s), fixed_now(), 90.0);
        assert_eq!(text, "Home: hail expected in 40 minutes.");
    }

    #[test]
    fn test_help_lists_commands() {
        assert!(HELP.contains("/stop"));
        assert!(HELP.contains("/point"));
    }
}
