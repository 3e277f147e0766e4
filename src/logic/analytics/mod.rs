//! Analytics Module
//!
//! Client-side event analytics for the landing page.
//!
//! ## Structure
//! - `event.rs` - Event envelope, session, identifiers, canonical names
//! - `environment.rs` - Injectable clock/page/device/storage context
//! - `storage.rs` - Key-value stores (memory, file)
//! - `buffer.rs` - Capped persisted buffer (FIFO eviction)
//! - `sink.rs` - Delivery sinks + background dispatcher
//! - `recorder.rs` - Session state, emit/summarize/export/clear
//! - `emitters.rs` - Named emitter catalogue
//! - `tracking.rs` - Visibility, pointer and orientation trackers
//! - `exporter.rs` - Export to JSONL, JSON or CSV files
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use landing_analytics::logic::analytics::{self, Recorder, Delivery, ManualEnvironment};
//!
//! let config = AnalyticsConfig::default();
//! let env = Arc::new(ManualEnvironment::browser(0));
//! let recorder = Arc::new(Recorder::new(&config, env, Delivery::from_config(&config)));
//!
//! let bus = analytics::SignalBus::new();
//! let tracking = analytics::start_tracking(&recorder, &bus);
//! recorder.cta_clicked("play_now", Properties::new());
//! tracking.stop();
//! ```

pub mod buffer;
pub mod emitters;
pub mod environment;
pub mod error;
pub mod event;
pub mod exporter;
pub mod recorder;
pub mod sink;
pub mod storage;
pub mod tracking;

#[cfg(test)]
mod tests;

// Re-export main types and functions
pub use buffer::PersistedBuffer;

pub use environment::{Environment, ManualEnvironment, SystemEnvironment, Viewport};

pub use error::{AnalyticsError, AnalyticsResult};

pub use event::{
    generate_event_id,
    generate_session_id,
    AnalyticsEvent,
    EventName,
    Properties,
    Session,
    RESERVED_KEYS,
};

pub use exporter::{export_bundle, export_events, ExportFormat};

pub use recorder::{AnalyticsExport, AnalyticsSummary, DeviceInfo, Recorder};

pub use sink::{
    Delivery,
    DeliverySink,
    Dispatcher,
    DispatcherStats,
    HttpSink,
    LogSink,
    NoopSink,
};

pub use storage::{FileStore, KeyValueStore, MemoryStore};

pub use tracking::{
    start_tracking,
    track_orientation,
    track_pointer,
    track_visibility,
    ListenerHandle,
    Signal,
    SignalBus,
    SignalListener,
    TrackingSession,
};
