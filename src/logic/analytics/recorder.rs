//! Analytics Event Recorder
//!
//! Owns the session and the in-memory event list, persists a capped tail
//! of events and hands each event to the delivery path.
//! Nothing here ever fails from the caller's point of view.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::buffer::PersistedBuffer;
use super::environment::{Environment, Viewport};
use super::event::{AnalyticsEvent, Properties, Session};
use super::sink::{Delivery, DispatcherStats};
use crate::constants::UNKNOWN;
use crate::logic::config::AnalyticsConfig;

// ============================================================================
// SUMMARY TYPES
// ============================================================================

/// Static device/browser descriptors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub viewport: Option<Viewport>,
    pub touch: bool,
    pub connection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub session_id: String,
    /// Milliseconds since the session started
    pub session_duration: i64,
    pub event_count: usize,
    /// Distinct event names, first-seen order
    pub event_types: Vec<String>,
    pub device_info: DeviceInfo,
}

/// Three independent views; they are not required to agree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsExport {
    pub summary: AnalyticsSummary,
    pub events: Vec<AnalyticsEvent>,
    pub stored_events: Vec<AnalyticsEvent>,
}

// ============================================================================
// RECORDER
// ============================================================================

struct RecorderState {
    session: Session,
    events: Vec<AnalyticsEvent>,
}

pub struct Recorder {
    env: Arc<dyn Environment>,
    buffer: PersistedBuffer,
    delivery: Delivery,
    state: Mutex<RecorderState>,
    enabled: AtomicBool,
    pointer_flush_interval_ms: i64,
}

impl Recorder {
    /// Construct once at application start and share by `Arc`
    pub fn new(config: &AnalyticsConfig, env: Arc<dyn Environment>, delivery: Delivery) -> Self {
        let session = Session::start(env.now_ms());
        log::info!("Analytics session started: {}", session.id);

        Self {
            buffer: PersistedBuffer::new(&config.storage_key, config.max_stored_events),
            delivery,
            state: Mutex::new(RecorderState {
                session,
                events: Vec::new(),
            }),
            enabled: AtomicBool::new(config.enabled),
            pointer_flush_interval_ms: config.pointer_flush_interval_ms,
            env,
        }
    }

    /// Record an event. Never fails; persistence and delivery faults are logged.
    pub fn emit(&self, name: &str, properties: Properties) {
        if !self.is_enabled() {
            log::debug!("Analytics disabled, dropping '{}'", name);
            return;
        }
        if name.trim().is_empty() {
            log::warn!("Ignoring analytics event with an empty name");
            return;
        }

        let timestamp = self.env.now_ms();
        let properties = self.with_context(properties);

        let event = {
            let mut state = self.state.lock();
            let event = AnalyticsEvent::new(&state.session, name, timestamp, properties);
            state.events.push(event.clone());
            event
        };

        self.persist(&event);
        self.delivery.forward(&event);

        log::debug!("Analytics event: {}", event.to_json());
    }

    /// Append to the capped persisted buffer. Failures are logged and ignored.
    pub fn persist(&self, event: &AnalyticsEvent) {
        if let Err(e) = self.buffer.append(self.env.storage(), event) {
            log::warn!("Failed to store analytics event: {}", e);
        }
    }

    /// Reserved context keys always overwrite caller-supplied values
    fn with_context(&self, mut properties: Properties) -> Properties {
        let viewport = match self.env.viewport() {
            Some(v) => json!({ "width": v.width, "height": v.height }),
            None => Value::Null,
        };

        properties.insert(
            "userAgent".to_string(),
            Value::String(self.env.user_agent().unwrap_or_else(|| UNKNOWN.to_string())),
        );
        properties.insert("viewport".to_string(), viewport);
        properties.insert(
            "url".to_string(),
            Value::String(self.env.current_url().unwrap_or_default()),
        );
        properties.insert(
            "referrer".to_string(),
            Value::String(self.env.referrer().unwrap_or_default()),
        );
        properties
    }

    pub fn summarize(&self) -> AnalyticsSummary {
        let now = self.env.now_ms();
        let state = self.state.lock();

        let mut seen = HashSet::new();
        let event_types = state
            .events
            .iter()
            .filter(|e| seen.insert(e.name.as_str()))
            .map(|e| e.name.clone())
            .collect();

        AnalyticsSummary {
            session_id: state.session.id.clone(),
            session_duration: state.session.elapsed(now),
            event_count: state.events.len(),
            event_types,
            device_info: self.device_info(),
        }
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            user_agent: self.env.user_agent().unwrap_or_else(|| UNKNOWN.to_string()),
            viewport: self.env.viewport(),
            touch: self.env.touch_capable().unwrap_or(false),
            connection: self.env.connection_type().unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }

    /// Summary, in-memory events and a fresh read of the persisted buffer
    pub fn export_all(&self) -> AnalyticsExport {
        AnalyticsExport {
            summary: self.summarize(),
            events: self.events(),
            stored_events: self.stored_events(),
        }
    }

    /// Drop all events, delete the persisted buffer and start a new session
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.events.clear();

        if let Err(e) = self.buffer.remove(self.env.storage()) {
            log::warn!("Failed to remove stored analytics events: {}", e);
        }

        let previous = std::mem::replace(&mut state.session, Session::start(self.env.now_ms()));
        log::info!("Analytics cleared, session {} -> {}", previous.id, state.session.id);
    }

    pub fn session(&self) -> Session {
        self.state.lock().session.clone()
    }

    pub fn session_id(&self) -> String {
        self.state.lock().session.id.clone()
    }

    /// Milliseconds since the current session started
    pub fn elapsed_ms(&self) -> i64 {
        let now = self.env.now_ms();
        self.state.lock().session.elapsed(now)
    }

    pub fn now_ms(&self) -> i64 {
        self.env.now_ms()
    }

    /// Snapshot of this session's events, in emission order
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.state.lock().events.clone()
    }

    pub fn event_count(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn stored_events(&self) -> Vec<AnalyticsEvent> {
        self.buffer.read(self.env.storage())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        log::info!("Analytics {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn pointer_flush_interval_ms(&self) -> i64 {
        self.pointer_flush_interval_ms
    }

    pub fn delivery_stats(&self) -> Option<DispatcherStats> {
        self.delivery.stats()
    }

    /// Stop background delivery, waiting up to `grace` for in-flight sends
    pub fn shutdown(self, grace: Duration) -> Option<DispatcherStats> {
        log::info!("Analytics recorder shutdown. Events this session: {}", self.event_count());
        self.delivery.shutdown(grace)
    }
}
