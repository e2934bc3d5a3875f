/// Structured logging for the nowcasting service
///
/// Provides context-rich logging with subsystem tags, point keys,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for daemon operations.
///
/// The analysis engine never logs; only the daemon around it does.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl LogLevel {
    /// Parses `debug`, `info`, `warn`/`warning`, `error` (case-insensitive).
    pub fn from_name(name: &str) -> Option<LogLevel> {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Subsystems
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Radar,
    Engine,
    Store,
    Notify,
    System,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Radar => write!(f, "RADAR"),
            Subsystem::Engine => write!(f, "ENGINE"),
            Subsystem::Store => write!(f, "DB"),
            Subsystem::Notify => write!(f, "NOTIFY"),
            Subsystem::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - radar server between publications, brief outages
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    /// Format one log line (without console decoration)
    fn format_entry(level: LogLevel, subsystem: Subsystem, point: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let point_part = point.map(|p| format!(" [{}]", p)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, subsystem, point_part, message)
    }

    fn log(&self, level: LogLevel, subsystem: Subsystem, point: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, subsystem, point, message);
        let point_part = point.map(|p| format!(" [{}]", p)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error => eprintln!("{}", log_entry),
                LogLevel::Warning => eprintln!("   {}", log_entry),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", subsystem, point_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", subsystem, point_part, message),
                LogLevel::Info => println!("   {}", message),
                LogLevel::Debug => {}  // Skip debug in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn with_logger(level: LogLevel, subsystem: Subsystem, point: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, subsystem, point, message);
        }
    }
}

/// Log a general informational message
pub fn info(subsystem: Subsystem, point: Option<&str>, message: &str) {
    with_logger(LogLevel::Info, subsystem, point, message);
}

/// Log a warning message
pub fn warn(subsystem: Subsystem, point: Option<&str>, message: &str) {
    with_logger(LogLevel::Warning, subsystem, point, message);
}

/// Log an error message
pub fn error(subsystem: Subsystem, point: Option<&str>, message: &str) {
    with_logger(LogLevel::Error, subsystem, point, message);
}

/// Log a debug message
pub fn debug(subsystem: Subsystem, point: Option<&str>, message: &str) {
    with_logger(LogLevel::Debug, subsystem, point, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a radar source failure based on its message
pub fn classify_source_failure(error_message: &str) -> FailureType {
    // Radar servers routinely answer 404/503 while a new composite is being
    // published; a single miss is not worth an alarm
    if error_message.contains("HTTP error: 404") || error_message.contains("HTTP error: 503") {
        FailureType::Expected
    }
    // Timeouts and connection resets
    else if error_message.contains("Transport error") {
        FailureType::Unknown
    }
    // A payload that does not decode means the source format changed
    else if error_message.contains("unreadable") {
        FailureType::Unexpected
    }
    else if error_message.contains("HTTP error") {
        FailureType::Unexpected
    }
    else {
        FailureType::Unknown
    }
}

/// Classify a Telegram delivery failure
pub fn classify_notify_failure(error_message: &str) -> FailureType {
    // 403: the user blocked the bot; nothing to fix on our side
    if error_message.contains("403") {
        FailureType::Expected
    }
    // Telegram itself failing or unreachable (timeouts, resets)
    else if error_message.contains("HTTP error") || error_message.contains("Transport error") {
        FailureType::Unexpected
    }
    else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn log_classified(subsystem: Subsystem, point: Option<&str>, failure_type: FailureType, message: &str) {
    match failure_type {
        FailureType::Expected => debug(subsystem, point, message),
        FailureType::Unexpected => error(subsystem, point, message),
        FailureType::Unknown => warn(subsystem, point, message),
    }
}

/// Log a radar source failure with automatic classification
pub fn log_source_failure(operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_source_failure(&error_msg);
    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);
    log_classified(Subsystem::Radar, None, failure_type, &message);
}

/// Log a notification failure for one recipient
pub fn log_notify_failure(chat_id: i64, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_notify_failure(&error_msg);
    let message = format!("delivery to chat {} failed [{}]: {}", chat_id, failure_type, error_msg);
    log_classified(Subsystem::Notify, None, failure_type, &message);
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one forecast cycle
pub fn log_cycle_summary(points: usize, forecasts: usize, changed: usize, notified: usize) {
    let message = format!(
        "Cycle complete: {}/{} points with precipitation, {} substantial changes, {} messages sent",
        forecasts,
        points,
        changed,
        notified
    );
    info(Subsystem::Engine, None, &message);
}
