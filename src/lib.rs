//! Radar precipitation nowcasting service.
//!
//! Downloads an animated weather-radar composite, tracks how precipitation
//! fronts move toward each configured point, and warns Telegram subscribers
//! when heavy rain, a thunderstorm or hail is about to arrive.
//!
//! The pure forecasting engine lives in `analysis`; everything else is the
//! service around it.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod db;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod points;
pub mod service;
pub mod verify;
