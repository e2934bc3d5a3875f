/// Service configuration.
///
/// Everything tunable lives in a single TOML file (default
/// `stormwatch.toml`, overridable through `STORMWATCH_CONFIG`). Secrets such
/// as `DATABASE_URL` and `TELEGRAM_BOT_TOKEN` stay in the environment and are
/// loaded through `dotenv` by the binary.
///
/// The analysis engine only ever sees an immutable `EngineConfig`; nothing in
/// here is mutated after startup.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::model::{CenterPoint, ConfigError};

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "STORMWATCH_CONFIG";

/// Configuration file used when `STORMWATCH_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "./stormwatch.toml";

/// Upper bound for the open-ended event sentinel; anchored ends must stay
/// representable as timestamps.
pub const MAX_UNBOUNDED_END_MINUTES: f64 = 7.0 * 24.0 * 60.0;

// ---------------------------------------------------------------------------
// Engine constants
// ---------------------------------------------------------------------------

/// Tunable constants of the analysis engine.
///
/// Every field has a default, so an `[engine]` table only needs to list the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest ray walked from a center, in pixels.
    pub max_radius: u32,
    /// Number of evenly spaced ray directions over a full turn.
    pub direction_count: u32,
    /// Trailing duplicated "now" frames at the end of the animation to skip.
    pub trailing_frames: usize,
    /// Number of frames (before the trailing ones) fed into the regression.
    pub frames_considered: usize,
    /// Real time between two consecutive frames, in minutes.
    pub minutes_per_frame: f64,
    /// Forecasts starting later than this are dropped, in minutes.
    pub horizon_minutes: f64,
    /// End value used for events whose end cannot be estimated.
    pub unbounded_end_minutes: f64,
    /// Events shorter than this are dropped, in minutes.
    pub min_event_minutes: f64,
    /// Pearson correlation must be strictly below this (inbound trend).
    pub correlation_threshold: f64,
    /// Minimum absolute slope, in pixels per frame period.
    pub min_slope: f64,
    /// How many of the most recent frame samples are counted twice.
    pub recent_duplicates: usize,
    /// Minimum share of considered frames that must show an onset.
    pub onset_coverage: f64,
    /// Minimum share of considered frames that must show an end.
    pub end_coverage: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_radius: 96,
            direction_count: 96,
            trailing_frames: 6,
            frames_considered: 9,
            minutes_per_frame: 10.0,
            horizon_minutes: 90.0,
            unbounded_end_minutes: 1000.0,
            min_event_minutes: 3.0,
            correlation_threshold: -0.93,
            min_slope: 1.0,
            recent_duplicates: 4,
            onset_coverage: 0.7,
            end_coverage: 0.5,
        }
    }
}

impl EngineConfig {
    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.direction_count == 0 || self.direction_count % 8 != 0 {
            return Err(ConfigError::Invalid(format!(
                "direction_count must be a positive multiple of 8, got {}",
                self.direction_count
            )));
        }
        if self.max_radius == 0 {
            return Err(ConfigError::Invalid("max_radius must be positive".into()));
        }
        if self.frames_considered == 0 {
            return Err(ConfigError::Invalid("frames_considered must be positive".into()));
        }
        if !(self.minutes_per_frame > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "minutes_per_frame must be positive, got {}",
                self.minutes_per_frame
            )));
        }
        if !(self.horizon_minutes > 0.0) {
            return Err(ConfigError::Invalid("horizon_minutes must be positive".into()));
        }
        if self.unbounded_end_minutes <= self.horizon_minutes {
            return Err(ConfigError::Invalid(format!(
                "unbounded_end_minutes ({}) must exceed horizon_minutes ({})",
                self.unbounded_end_minutes, self.horizon_minutes
            )));
        }
        if self.unbounded_end_minutes > MAX_UNBOUNDED_END_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "unbounded_end_minutes ({}) must not exceed {} (one week)",
                self.unbounded_end_minutes, MAX_UNBOUNDED_END_MINUTES
            )));
        }
        if !(-1.0..=0.0).contains(&self.correlation_threshold) {
            return Err(ConfigError::Invalid(format!(
                "correlation_threshold must lie in [-1, 0], got {}",
                self.correlation_threshold
            )));
        }
        for (name, share) in [("onset_coverage", self.onset_coverage), ("end_coverage", self.end_coverage)] {
            if !(0.0..=1.0).contains(&share) {
                return Err(ConfigError::Invalid(format!("{} must lie in [0, 1], got {}", name, share)));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service sections
// ---------------------------------------------------------------------------

/// Where the radar animation comes from.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Daemon behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Seconds between two forecast cycles.
    pub poll_interval_secs: u64,
    /// Seconds between two checks for bot commands.
    pub command_poll_secs: u64,
    /// Point assigned to new subscribers; the first configured point if unset.
    pub default_point: Option<String>,
    /// Optional append-only log file.
    pub log_file: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            poll_interval_secs: 120,
            command_poll_secs: 5,
            default_point: None,
            log_file: None,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub points: Vec<CenterPoint>,
}

impl AppConfig {
    /// Key of the point new subscribers are attached to.
    pub fn default_point_key(&self) -> &str {
        match &self.service.default_point {
            Some(key) => key,
            None => self.points.first().map(|p| p.key.as_str()).unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        crate::points::validate_points(&self.points)?;
        if let Some(key) = &self.service.default_point {
            if crate::points::find_point(&self.points, key).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "default_point '{}' is not a configured point",
                    key
                )));
            }
        }
        if self.service.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parses and validates configuration text.
pub fn parse_config(text: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    parse_config(&text)
}

/// Resolves the configuration path from the environment.
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Reads a required environment variable.
pub fn require_env(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingEnv(var))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [source]
        url = "https://radar.example.org/composite.gif"

        [[points]]
        key = "nnov"
        name = "Nizhny Novgorod"
        x = 612
        y = 448
    "#;

    #[test]
    fn test_minimal_config_uses_engine_defaults() {
        let config = parse_config(MINIMAL).expect("minimal config should parse");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.service.poll_interval_secs, 120);
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.points.len(), 1);
        assert_eq!(config.default_point_key(), "nnov");
    }

    #[test]
    fn test_engine_overrides_are_partial() {
        let text = format!("{}\n[engine]\nmax_radius = 64\nhorizon_minutes = 60.0\n", MINIMAL);
        let config = parse_config(&text).expect("override config should parse");
        assert_eq!(config.engine.max_radius, 64);
        assert_eq!(config.engine.horizon_minutes, 60.0);
        assert_eq!(config.engine.direction_count, 96);
    }

    #[test]
    fn test_direction_count_must_be_multiple_of_eight() {
        let text = format!("{}\n[engine]\ndirection_count = 30\n", MINIMAL);
        let err = parse_config(&text).expect_err("30 directions should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)), "got {:?}", err);
    }

    #[test]
    fn test_unbounded_end_sentinel_is_capped() {
        let text = format!("{}\n[engine]\nunbounded_end_minutes = 1e13\n", MINIMAL);
        let err = parse_config(&text).expect_err("an end 1e13 minutes away should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)), "got {:?}", err);

        let text = format!("{}\n[engine]\nunbounded_end_minutes = 10080.0\n", MINIMAL);
        assert!(parse_config(&text).is_ok(), "one week is still allowed");
    }

    #[test]
    fn test_missing_points_is_invalid() {
        let text = r#"
            [source]
            url = "https://radar.example.org/composite.gif"
        "#;
        let err = parse_config(text).expect_err("empty point list should be rejected");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_default_point_is_invalid() {
        let text = format!("{}\n[service]\ndefault_point = \"moscow\"\n", MINIMAL);
        assert!(parse_config(&text).is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = parse_config("[source\nurl = ").expect_err("broken TOML should fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let err = load_config("/nonexistent/stormwatch.toml").expect_err("missing file");
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(MINIMAL.as_bytes()).expect("write config");
        let config = load_config(file.path()).expect("config file should load");
        assert_eq!(config.points[0].x, 612);
    }
}
