/// Development mode utilities for replaying saved radar animations
///
/// When the live radar source is unavailable (or uninteresting because the
/// sky is clear), use this module to run the engine against a GIF saved
/// during a past storm, optionally pretending it is still that moment.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::analysis::{analyze, Forecast, FrameSequence};
use crate::alert::change::anchor_forecast;
use crate::alert::format::format_status;
use crate::config::AppConfig;
use crate::ingest::radar;
use crate::model::SourceError;

/// Configuration for replaying a local radar animation
pub struct ReplayMode {
    /// Saved animation to analyze instead of downloading
    pub path: PathBuf,
    /// Pretend the analysis runs at this time (when the file was captured)
    pub simulated_now: Option<DateTime<Utc>>,
}

impl ReplayMode {
    /// Create a replay of `path` anchored at the real current time
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            simulated_now: None,
        }
    }

    /// Anchor the replay at a fixed moment
    pub fn at(mut self, simulated_now: DateTime<Utc>) -> Self {
        self.simulated_now = Some(simulated_now);
        self
    }

    /// The moment forecasts are anchored at
    pub fn now(&self) -> DateTime<Utc> {
        self.simulated_now.unwrap_or_else(Utc::now)
    }

    /// Read and decode the saved animation
    pub fn load_frames(&self) -> Result<FrameSequence, SourceError> {
        let bytes = fs::read(&self.path)
            .map_err(|e| SourceError::Unreadable(format!("{}: {}", self.path.display(), e)))?;
        radar::decode_frames(&bytes)
    }

    /// Analyze the saved animation for every configured point
    pub fn forecast(&self, config: &AppConfig) -> Result<Forecast, SourceError> {
        let frames = self.load_frames()?;
        Ok(analyze(&frames, &config.points, &config.engine))
    }

    /// Analyze and render one line per point, as subscribers would read it
    pub fn run(&self, config: &AppConfig) -> Result<Vec<String>, SourceError> {
        let now = self.now();
        let anchored = anchor_forecast(&self.forecast(config)?, now);

        Ok(config
            .points
            .iter()
            .map(|point| {
                let status = anchored.get(&point.key).and_then(|s| s.as_ref());
                format_status(point.display_name(), status, now, config.engine.horizon_minutes)
            })
            .collect())
    }
}
