//! Landing Page Client - Event Analytics Recorder

pub mod constants;
pub mod logic;

pub use logic::analytics;
pub use logic::config::{AnalyticsConfig, RuntimeMode};
