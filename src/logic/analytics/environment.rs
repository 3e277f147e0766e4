//! Environment Context
//!
//! Everything the recorder would otherwise read from browser globals:
//! clock, viewport, location, referrer, device descriptors and storage.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStore, MemoryStore};
use crate::constants;

/// Visible viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Injectable environment context. `None` means the descriptor is unavailable.
pub trait Environment: Send + Sync {
    /// Milliseconds since Unix epoch
    fn now_ms(&self) -> i64;
    fn user_agent(&self) -> Option<String>;
    fn viewport(&self) -> Option<Viewport>;
    fn current_url(&self) -> Option<String>;
    fn referrer(&self) -> Option<String>;
    fn touch_capable(&self) -> Option<bool>;
    /// Effective network type, e.g. "4g"
    fn connection_type(&self) -> Option<String>;
    fn storage(&self) -> &dyn KeyValueStore;
}

// ============================================================================
// SYSTEM ENVIRONMENT
// ============================================================================

/// Native host: real wall clock, static page descriptors
pub struct SystemEnvironment {
    storage: Arc<dyn KeyValueStore>,
    user_agent: String,
    viewport: Option<Viewport>,
    url: Option<String>,
    referrer: Option<String>,
}

impl SystemEnvironment {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            user_agent: format!(
                "{}/{} ({}; {})",
                constants::APP_NAME,
                constants::APP_VERSION,
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            viewport: None,
            url: None,
            referrer: None,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_referrer(mut self, referrer: &str) -> Self {
        self.referrer = Some(referrer.to_string());
        self
    }
}

impl Environment for SystemEnvironment {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn user_agent(&self) -> Option<String> {
        Some(self.user_agent.clone())
    }

    fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn current_url(&self) -> Option<String> {
        self.url.clone()
    }

    fn referrer(&self) -> Option<String> {
        self.referrer.clone()
    }

    fn touch_capable(&self) -> Option<bool> {
        None
    }

    fn connection_type(&self) -> Option<String> {
        None
    }

    fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }
}

// ============================================================================
// MANUAL ENVIRONMENT
// ============================================================================

#[derive(Debug, Clone, Default)]
struct PageState {
    user_agent: Option<String>,
    viewport: Option<Viewport>,
    url: Option<String>,
    referrer: Option<String>,
    touch: Option<bool>,
    connection: Option<String>,
}

/// Fully settable environment for tests and headless hosts
pub struct ManualEnvironment {
    now: AtomicI64,
    page: RwLock<PageState>,
    storage: Arc<dyn KeyValueStore>,
}

impl ManualEnvironment {
    /// Clock at `now_ms`, empty in-memory storage, no descriptors
    pub fn new(now_ms: i64) -> Self {
        Self::with_storage(now_ms, Arc::new(MemoryStore::new()))
    }

    pub fn with_storage(now_ms: i64, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
            page: RwLock::new(PageState::default()),
            storage,
        }
    }

    /// A typical desktop browser page
    pub fn browser(now_ms: i64) -> Self {
        let env = Self::new(now_ms);
        {
            let mut page = env.page.write();
            page.user_agent = Some("Mozilla/5.0 (X11; Linux x86_64)".to_string());
            page.viewport = Some(Viewport::new(1280, 720));
            page.url = Some("https://example.com/".to_string());
            page.referrer = Some(String::new());
            page.touch = Some(false);
            page.connection = Some("4g".to_string());
        }
        env
    }

    pub fn set_now(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set_user_agent(&self, user_agent: Option<&str>) {
        self.page.write().user_agent = user_agent.map(str::to_string);
    }

    pub fn set_viewport(&self, viewport: Option<Viewport>) {
        self.page.write().viewport = viewport;
    }

    pub fn set_url(&self, url: Option<&str>) {
        self.page.write().url = url.map(str::to_string);
    }

    pub fn set_referrer(&self, referrer: Option<&str>) {
        self.page.write().referrer = referrer.map(str::to_string);
    }

    pub fn set_touch(&self, touch: Option<bool>) {
        self.page.write().touch = touch;
    }

    pub fn set_connection(&self, connection: Option<&str>) {
        self.page.write().connection = connection.map(str::to_string);
    }
}

impl Environment for ManualEnvironment {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn user_agent(&self) -> Option<String> {
        self.page.read().user_agent.clone()
    }

    fn viewport(&self) -> Option<Viewport> {
        self.page.read().viewport
    }

    fn current_url(&self) -> Option<String> {
        self.page.read().url.clone()
    }

    fn referrer(&self) -> Option<String> {
        self.page.read().referrer.clone()
    }

    fn touch_capable(&self) -> Option<bool> {
        self.page.read().touch
    }

    fn connection_type(&self) -> Option<String> {
        self.page.read().connection.clone()
    }

    fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let env = ManualEnvironment::new(100);
        assert_eq!(env.now_ms(), 100);
        env.advance(25);
        assert_eq!(env.now_ms(), 125);
        env.set_now(0);
        assert_eq!(env.now_ms(), 0);
    }

    #[test]
    fn test_manual_descriptors_default_unknown() {
        let env = ManualEnvironment::new(0);
        assert!(env.user_agent().is_none());
        assert!(env.viewport().is_none());
        assert!(env.connection_type().is_none());

        env.set_viewport(Some(Viewport::new(390, 844)));
        assert_eq!(env.viewport(), Some(Viewport::new(390, 844)));
    }

    #[test]
    fn test_system_environment_user_agent() {
        let env = SystemEnvironment::new(Arc::new(MemoryStore::new()));
        let ua = env.user_agent().unwrap();
        assert!(ua.starts_with("landing-analytics/"));
        assert!(env.now_ms() > 1_600_000_000_000);
    }
}
