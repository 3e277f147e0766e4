//! Analytics Configuration
//!
//! `AnalyticsConfig::default()` reads every field from the environment
//! (see `constants.rs`), falling back to the built-in defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Runtime flavour of the host application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Deliveries are bypassed and only logged
    Development,
    /// Deliveries go to the configured sink
    Production,
}

impl RuntimeMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Production => "production",
        }
    }
}

/// Recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Key of the persisted event buffer
    pub storage_key: String,
    /// Capacity of the persisted buffer
    pub max_stored_events: usize,
    /// Development bypasses delivery
    pub mode: RuntimeMode,
    /// Delivery endpoint (production only)
    pub endpoint: Option<String>,
    /// Request timeout for the HTTP sink
    pub delivery_timeout_secs: u64,
    /// Minimum gap between pointer movement reports
    pub pointer_flush_interval_ms: i64,
    /// Whether `emit` records anything at start
    pub enabled: bool,
    /// Directory used by the file-backed store
    pub storage_dir: PathBuf,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            storage_key: constants::get_storage_key(),
            max_stored_events: constants::get_max_stored_events(),
            mode: RuntimeMode::parse(&constants::get_runtime_env()),
            endpoint: constants::get_endpoint(),
            delivery_timeout_secs: constants::get_delivery_timeout(),
            pointer_flush_interval_ms: constants::DEFAULT_POINTER_FLUSH_INTERVAL_MS,
            enabled: constants::is_analytics_enabled(),
            storage_dir: constants::get_storage_dir(),
        }
    }
}

impl AnalyticsConfig {
    /// Built-in defaults, ignoring the process environment
    pub fn builtin() -> Self {
        Self {
            storage_key: constants::DEFAULT_STORAGE_KEY.to_string(),
            max_stored_events: constants::DEFAULT_MAX_STORED_EVENTS,
            mode: RuntimeMode::Development,
            endpoint: None,
            delivery_timeout_secs: constants::DEFAULT_DELIVERY_TIMEOUT,
            pointer_flush_interval_ms: constants::DEFAULT_POINTER_FLUSH_INTERVAL_MS,
            enabled: true,
            storage_dir: PathBuf::from(constants::STORAGE_DIR_NAME),
        }
    }

    pub fn is_production(&self) -> bool {
        self.mode == RuntimeMode::Production
    }

    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_storage_key(mut self, key: &str) -> Self {
        self.storage_key = key.to_string();
        self
    }

    pub fn with_max_stored_events(mut self, max: usize) -> Self {
        self.max_stored_events = max.max(1);
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_storage_dir(mut self, dir: PathBuf) -> Self {
        self.storage_dir = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_mode_parse() {
        assert_eq!(RuntimeMode::parse("production"), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse(" PROD "), RuntimeMode::Production);
        assert_eq!(RuntimeMode::parse("development"), RuntimeMode::Development);
        assert_eq!(RuntimeMode::parse("staging"), RuntimeMode::Development);
    }

    #[test]
    fn test_builtin_defaults() {
        let config = AnalyticsConfig::builtin();
        assert_eq!(config.storage_key, "landingPageEvents");
        assert_eq!(config.max_stored_events, 100);
        assert_eq!(config.pointer_flush_interval_ms, 5_000);
        assert!(config.enabled);
        assert!(!config.is_production());
    }

    #[test]
    fn test_capacity_never_zero() {
        let config = AnalyticsConfig::builtin().with_max_stored_events(0);
        assert_eq!(config.max_stored_events, 1);
    }
}
