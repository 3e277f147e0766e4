//! Logic Module - Analytics Engine
//!
//! - `analytics/` - Event recorder, persistence, delivery, tracking
//! - `config` - Recorder configuration

pub mod analytics;
pub mod config;
