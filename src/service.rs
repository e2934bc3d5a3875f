/// Forecast cycle and subscriber command handling.
///
/// Ties the pieces together: download the radar animation, analyze it,
/// compare against the last forecast each point's subscribers received,
/// and message them when the change is substantial. Chat commands are
/// answered from the same stored state.
///
/// Store and notifier are passed in as trait objects so the whole flow runs
/// against `MemoryStore` and a recording notifier in tests.

use chrono::{DateTime, Utc};

use crate::alert::change::{anchor_forecast, substantial_change, unexpired};
use crate::alert::format::{format_status, HELP};
use crate::alert::telegram::{parse_command, Command, Notifier};
use crate::analysis::{analyze, Forecast, FrameSequence};
use crate::config::AppConfig;
use crate::db::{StateStore, StoreError};
use crate::ingest::radar;
use crate::logging::{self, Subsystem};
use crate::points::{all_point_keys, find_point};

// ---------------------------------------------------------------------------
// Forecast cycle
// ---------------------------------------------------------------------------

/// Counts from one applied forecast, for the cycle summary log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub points: usize,
    pub forecasts: usize,
    pub changed: usize,
    pub notified: usize,
}

/// Runs one polling cycle against the configured radar source.
///
/// Returns `Ok(None)` when the source has not changed since the last cycle
/// or could not be read; source failures are logged and leave the stored
/// state untouched so the next cycle retries.
pub fn update_forecast(
    store: &mut dyn StateStore,
    notifier: &dyn Notifier,
    http: &reqwest::blocking::Client,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<Option<CycleReport>, StoreError> {
    let last_checksum = store.get_checksum()?;

    let download = match radar::fetch_if_changed(http, &config.source.url, last_checksum.as_deref()) {
        Ok(Some(download)) => download,
        Ok(None) => {
            logging::debug(Subsystem::Radar, None, "Source not changed since last cycle");
            return Ok(None);
        }
        Err(e) => {
            logging::log_source_failure("Radar download", &e);
            return Ok(None);
        }
    };

    logging::info(
        Subsystem::Radar,
        None,
        &format!("New radar animation ({} bytes, sha256 {})", download.bytes.len(), download.checksum),
    );

    let frames = match radar::decode_frames(&download.bytes) {
        Ok(frames) => frames,
        Err(e) => {
            logging::log_source_failure("Radar decode", &e);
            return Ok(None);
        }
    };

    let report = analyze_and_apply(store, notifier, &frames, &download.checksum, config, now)?;
    Ok(Some(report))
}

/// Analyzes decoded frames and applies the result.
pub fn analyze_and_apply(
    store: &mut dyn StateStore,
    notifier: &dyn Notifier,
    frames: &FrameSequence,
    checksum: &str,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<CycleReport, StoreError> {
    let forecast = analyze(frames, &config.points, &config.engine);
    for (key, status) in &forecast {
        if let Some(status) = status {
            logging::debug(
                Subsystem::Engine,
                Some(key.as_str()),
                &format!("{} from +{} to +{} min", status.category, status.start, status.end),
            );
        }
    }
    apply_forecast(store, notifier, &forecast, checksum, config, now)
}

/// Compares a fresh forecast with the stored one and notifies subscribers.
///
/// Per point, the stored status is replaced only on a substantial change;
/// otherwise the previously sent forecast stays the reference for the next
/// comparison. A stored event that has already ended counts as no forecast
/// and is dropped. The checksum is stored either way.
pub fn apply_forecast(
    store: &mut dyn StateStore,
    notifier: &dyn Notifier,
    forecast: &Forecast,
    checksum: &str,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<CycleReport, StoreError> {
    let anchored = anchor_forecast(forecast, now);
    let stored = store.get_statuses()?;
    let subscribers = store.list_subscribers()?;

    let mut report = CycleReport {
        points: forecast.len(),
        forecasts: forecast.values().filter(|s| s.is_some()).count(),
        ..CycleReport::default()
    };

    for (key, new_status) in &anchored {
        let old_status = unexpired(stored.get(key), now);
        if !substantial_change(old_status, new_status.as_ref(), now) {
            if old_status.is_none() && stored.contains_key(key) && new_status.is_none() {
                store.clear_status(key)?;
            }
            continue;
        }
        report.changed += 1;

        match new_status {
            Some(status) => store.set_status(key, status)?,
            None => store.clear_status(key)?,
        }

        let place = find_point(&config.points, key)
            .map(|p| p.display_name())
            .unwrap_or(key.as_str());
        let text = format_status(place, new_status.as_ref(), now, config.engine.horizon_minutes);
        logging::info(Subsystem::Notify, Some(key.as_str()), &format!("Substantial change: {}", text));

        for subscriber in subscribers.iter().filter(|s| &s.point_key == key) {
            match notifier.send(subscriber.chat_id, &text) {
                Ok(()) => report.notified += 1,
                Err(e) => logging::log_notify_failure(subscriber.chat_id, &e),
            }
        }
    }

    store.set_checksum(checksum)?;
    logging::log_cycle_summary(report.points, report.forecasts, report.changed, report.notified);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Chat commands
// ---------------------------------------------------------------------------

/// Handles one incoming chat message and sends the reply.
///
/// Every message except `/stop` subscribes the chat; a chat that is not yet
/// subscribed follows the default point.
pub fn handle_command(
    store: &mut dyn StateStore,
    notifier: &dyn Notifier,
    chat_id: i64,
    text: &str,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let reply = match parse_command(text) {
        Command::Stop => {
            store.remove_subscriber(chat_id)?;
            "You have been unsubscribed.".to_string()
        }
        Command::Start => {
            subscribe_default(store, chat_id, config)?;
            HELP.to_string()
        }
        Command::Point(key) => match find_point(&config.points, &key) {
            Some(point) => {
                store.add_subscriber(chat_id, &point.key)?;
                format!(
                    "Now following {}.\n{}",
                    point.display_name(),
                    current_status_text(store, &point.key, config, now)?
                )
            }
            None => format!(
                "Unknown point '{}'. Available: {}",
                key,
                all_point_keys(&config.points).join(", ")
            ),
        },
        Command::Status => {
            let point_key = subscribe_default(store, chat_id, config)?;
            current_status_text(store, &point_key, config, now)?
        }
    };

    if let Err(e) = notifier.send(chat_id, &reply) {
        logging::log_notify_failure(chat_id, &e);
    }
    Ok(())
}

/// Makes sure the chat is subscribed and returns the point it follows.
fn subscribe_default(
    store: &mut dyn StateStore,
    chat_id: i64,
    config: &AppConfig,
) -> Result<String, StoreError> {
    if let Some(existing) = store.subscriber_point(chat_id)? {
        if find_point(&config.points, &existing).is_some() {
            return Ok(existing);
        }
    }
    let key = config.default_point_key().to_string();
    store.add_subscriber(chat_id, &key)?;
    logging::info(Subsystem::Store, Some(key.as_str()), &format!("Subscribed chat {}", chat_id));
    Ok(key)
}

fn current_status_text(
    store: &mut dyn StateStore,
    point_key: &str,
    config: &AppConfig,
    now: DateTime<Utc>,
) -> Result<String, StoreError> {
    let statuses = store.get_statuses()?;
    let place = find_point(&config.points, point_key)
        .map(|p| p.display_name())
        .unwrap_or(point_key);
    let status = unexpired(statuses.get(point_key), now);
    Ok(format_status(place, status, now, config.engine.horizon_minutes))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
