//! Analytics error types.
//!
//! None of these ever reach the UI layer: the recorder logs and swallows them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded for '{key}': need {needed} bytes, limit {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Delivery dispatcher is closed")]
    DispatcherClosed,
}

pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;
