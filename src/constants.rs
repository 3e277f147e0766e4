//! Central Configuration Constants
//!
//! Single source of truth for all analytics defaults.
//! Every value can be overridden through an environment variable.

/// Local storage key holding the persisted event buffer
pub const DEFAULT_STORAGE_KEY: &str = "landingPageEvents";

/// Maximum number of events kept in the persisted buffer
pub const DEFAULT_MAX_STORED_EVENTS: usize = 100;

/// Interval between pointer movement reports (milliseconds)
pub const DEFAULT_POINTER_FLUSH_INTERVAL_MS: i64 = 5_000;

/// Timeout for a single delivery request (seconds)
pub const DEFAULT_DELIVERY_TIMEOUT: u64 = 10;

/// Directory name under the platform data dir used by the file store
pub const STORAGE_DIR_NAME: &str = "landing-analytics";

/// Sentinel reported for unavailable device descriptors
pub const UNKNOWN: &str = "unknown";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get the persisted buffer key from environment or use default
pub fn get_storage_key() -> String {
    std::env::var("ANALYTICS_STORAGE_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string())
}

/// Get the persisted buffer capacity from environment or use default
pub fn get_max_stored_events() -> usize {
    std::env::var("ANALYTICS_MAX_STORED_EVENTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(DEFAULT_MAX_STORED_EVENTS)
}

/// Get the runtime environment name ("development" unless set)
pub fn get_runtime_env() -> String {
    std::env::var("ANALYTICS_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Get the delivery endpoint, if any
pub fn get_endpoint() -> Option<String> {
    std::env::var("ANALYTICS_ENDPOINT")
        .ok()
        .filter(|s| !s.trim().is_empty())
}

/// Get delivery timeout from environment or use default
pub fn get_delivery_timeout() -> u64 {
    std::env::var("ANALYTICS_DELIVERY_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_DELIVERY_TIMEOUT)
}

/// Check if analytics emission is enabled
pub fn is_analytics_enabled() -> bool {
    std::env::var("ANALYTICS_ENABLED")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}

/// Get the file store directory from environment or the platform data dir
pub fn get_storage_dir() -> std::path::PathBuf {
    std::env::var("ANALYTICS_STORAGE_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join(STORAGE_DIR_NAME)
        })
}
