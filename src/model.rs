/// Core data types for the radar precipitation nowcasting service.
///
/// This module defines the shared domain model imported by all other modules:
/// severity categories, forecast windows, monitored points, and the error
/// types that cross module boundaries. It contains no analysis logic and no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Precipitation severity derived from a radar pixel color.
///
/// Declaration order is the severity order: `None < Rain < Storm < Hail`.
/// Comparisons go through the derived `Ord`, never through numeric casts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    None,
    Rain,
    Storm,
    Hail,
}

impl Category {
    /// Categories that can produce a forecast, in ascending severity.
    pub const SIGNIFICANT: [Category; 3] = [Category::Rain, Category::Storm, Category::Hail];

    /// Stable lowercase name, used for persistence and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::None => "none",
            Category::Rain => "rain",
            Category::Storm => "storm",
            Category::Hail => "hail",
        }
    }

    /// Inverse of `as_str`. Returns `None` for unrecognized names.
    pub fn from_name(name: &str) -> Option<Category> {
        match name {
            "none" => Some(Category::None),
            "rain" => Some(Category::Rain),
            "storm" => Some(Category::Storm),
            "hail" => Some(Category::Hail),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

// ---------------------------------------------------------------------------
// Monitored points
// ---------------------------------------------------------------------------

/// A monitored location, expressed in raster pixel coordinates.
///
/// `key` is the stable identifier used in the state store and in
/// subscriber records; `name` is only for human-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterPoint {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub x: u32,
    pub y: u32,
}

impl CenterPoint {
    pub fn new(key: &str, x: u32, y: u32) -> Self {
        CenterPoint {
            key: key.to_string(),
            name: key.to_string(),
            x,
            y,
        }
    }

    /// Name for messages, falling back to the key when none was configured.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.key } else { &self.name }
    }
}

// ---------------------------------------------------------------------------
// Forecast windows
// ---------------------------------------------------------------------------

/// A forecast window for one category, in minutes relative to analysis time.
///
/// `end` may be the configured "unbounded" sentinel, meaning the event is
/// ongoing past anything the frames can tell us.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub start: f64,
    pub end: f64,
}

impl Range {
    pub fn new(start: f64, end: f64) -> Self {
        Range { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// The resolved forecast for one point: whole minutes relative to the
/// analysis time, plus the dominant severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub start: i64,
    pub end: i64,
    pub category: Category,
}

/// A `Status` anchored to wall-clock time by the caller.
///
/// This is what gets persisted and compared across polling cycles; the
/// engine itself never sees absolute time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredStatus {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub category: Category,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that make a radar source unusable for a cycle.
///
/// Any of these means the cycle is skipped and the previously stored
/// forecast stays authoritative.
#[derive(Debug, PartialEq)]
pub enum SourceError {
    /// Non-2xx HTTP response from the radar server.
    Http(u16),
    /// The request never produced a response (DNS, TLS, timeout, ...).
    Transport(String),
    /// The payload could not be decoded as an animated raster.
    Unreadable(String),
    /// Decoding succeeded but produced no frames.
    Empty,
    /// Frames disagree on dimensions.
    InconsistentFrames {
        expected: (u32, u32),
        found: (u32, u32),
        index: usize,
    },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Http(code) => write!(f, "HTTP error: {}", code),
            SourceError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SourceError::Unreadable(msg) => write!(f, "Source unreadable: {}", msg),
            SourceError::Empty => write!(f, "Source unreadable: no frames decoded"),
            SourceError::InconsistentFrames { expected, found, index } => write!(
                f,
                "Source unreadable: frame {} is {}x{}, expected {}x{}",
                index, found.0, found.1, expected.0, expected.1
            ),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Http(status.as_u16()),
            None => SourceError::Transport(err.to_string()),
        }
    }
}

impl From<image::ImageError> for SourceError {
    fn from(err: image::ImageError) -> Self {
        SourceError::Unreadable(err.to_string())
    }
}

/// Startup configuration problems. Fatal; never raised during a cycle.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(String),
    /// The file was read but is not valid TOML for our schema.
    Parse(String),
    /// The file parsed but describes an unusable setup.
    Invalid(String),
    /// A required environment variable is missing.
    MissingEnv(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config read error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::MissingEnv(var) => write!(f, "Environment variable {} must be set", var),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
