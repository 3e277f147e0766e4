//! Ambient Tracking
//!
//! The host publishes browser signals on a `SignalBus`; trackers turn them
//! into named emitter calls. Every subscription returns a `ListenerHandle`.
//! Removing the handle (explicitly or by dropping it) stops the listener and
//! runs its teardown, which may flush one final event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::event::Properties;
use super::recorder::Recorder;

/// Browser events relevant to ambient tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    VisibilityChanged { hidden: bool },
    PointerMoved,
    /// Screen angle in degrees
    OrientationChanged { angle: i32 },
}

pub trait SignalListener: Send {
    fn on_signal(&mut self, signal: &Signal);

    /// Called once when the listener is removed
    fn on_remove(&mut self) {}
}

// ============================================================================
// SIGNAL BUS
// ============================================================================

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Box<dyn SignalListener>)>>,
}

impl Drop for BusInner {
    fn drop(&mut self) {
        // Handles can no longer reach the listeners, so tear them down here.
        for (_, mut listener) in self.listeners.get_mut().drain(..) {
            listener.on_remove();
        }
    }
}

/// Listeners must not publish on the bus they are subscribed to, and must
/// not remove or drop a `ListenerHandle` of that bus from `on_signal`:
/// `publish` holds the listener lock while calling them.
#[derive(Clone, Default)]
pub struct SignalBus {
    inner: Arc<BusInner>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Box<dyn SignalListener>) -> ListenerHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.listeners.lock().push((id, listener));
        ListenerHandle {
            bus: Arc::downgrade(&self.inner),
            id,
            removed: false,
        }
    }

    /// Deliver `signal` to every listener in subscription order
    pub fn publish(&self, signal: Signal) {
        let mut listeners = self.inner.listeners.lock();
        for (_, listener) in listeners.iter_mut() {
            listener.on_signal(&signal);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

/// Deregistration handle; removal happens at most once
#[must_use = "dropping the handle removes the listener"]
pub struct ListenerHandle {
    bus: Weak<BusInner>,
    id: u64,
    removed: bool,
}

impl ListenerHandle {
    /// Stop listening and run the listener's teardown
    pub fn remove(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        let Some(bus) = self.bus.upgrade() else {
            return;
        };

        let listener = {
            let mut listeners = bus.listeners.lock();
            listeners
                .iter()
                .position(|(id, _)| *id == self.id)
                .map(|index| listeners.remove(index).1)
        };

        if let Some(mut listener) = listener {
            listener.on_remove();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

// ============================================================================
// TRACKERS
// ============================================================================

/// Reports how long the page stayed visible each time it is hidden
pub struct VisibilityTracker {
    recorder: Arc<Recorder>,
    visible_since: i64,
}

impl VisibilityTracker {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        let visible_since = recorder.now_ms();
        Self {
            recorder,
            visible_since,
        }
    }
}

impl SignalListener for VisibilityTracker {
    fn on_signal(&mut self, signal: &Signal) {
        if let Signal::VisibilityChanged { hidden } = signal {
            let now = self.recorder.now_ms();
            if *hidden {
                self.recorder
                    .time_spent("page_visible", now - self.visible_since, Properties::new());
            } else {
                self.visible_since = now;
            }
        }
    }
}

/// Counts pointer moves, reporting at most once per flush interval
pub struct PointerTracker {
    recorder: Arc<Recorder>,
    pending: u64,
    last_report: i64,
    interval_ms: i64,
}

impl PointerTracker {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        let last_report = recorder.now_ms();
        let interval_ms = recorder.pointer_flush_interval_ms();
        Self {
            recorder,
            pending: 0,
            last_report,
            interval_ms,
        }
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }
}

impl SignalListener for PointerTracker {
    fn on_signal(&mut self, signal: &Signal) {
        if *signal != Signal::PointerMoved {
            return;
        }

        self.pending += 1;

        let now = self.recorder.now_ms();
        if now - self.last_report > self.interval_ms {
            self.recorder.mouse_movement(self.pending, Properties::new());
            self.pending = 0;
            self.last_report = now;
        }
    }

    fn on_remove(&mut self) {
        if self.pending > 0 {
            self.recorder.mouse_movement(self.pending, Properties::new());
            self.pending = 0;
        }
    }
}

pub struct OrientationTracker {
    recorder: Arc<Recorder>,
}

impl OrientationTracker {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl SignalListener for OrientationTracker {
    fn on_signal(&mut self, signal: &Signal) {
        if let Signal::OrientationChanged { angle } = signal {
            self.recorder.device_orientation(*angle, Properties::new());
        }
    }
}

pub fn track_visibility(recorder: &Arc<Recorder>, bus: &SignalBus) -> ListenerHandle {
    bus.subscribe(Box::new(VisibilityTracker::new(recorder.clone())))
}

pub fn track_pointer(recorder: &Arc<Recorder>, bus: &SignalBus) -> ListenerHandle {
    bus.subscribe(Box::new(PointerTracker::new(recorder.clone())))
}

pub fn track_orientation(recorder: &Arc<Recorder>, bus: &SignalBus) -> ListenerHandle {
    bus.subscribe(Box::new(OrientationTracker::new(recorder.clone())))
}

// ============================================================================
// TRACKING SESSION
// ============================================================================

/// All ambient trackers of one page; stopping it removes every listener
#[must_use = "dropping the session stops tracking"]
pub struct TrackingSession {
    handles: Vec<ListenerHandle>,
}

impl TrackingSession {
    pub fn stop(self) {
        for handle in self.handles {
            handle.remove();
        }
    }
}

/// Record the initial page view, then start visibility, pointer and
/// orientation tracking
pub fn start_tracking(recorder: &Arc<Recorder>, bus: &SignalBus) -> TrackingSession {
    recorder.landing_page_view(Properties::new());

    TrackingSession {
        handles: vec![
            track_visibility(recorder, bus),
            track_pointer(recorder, bus),
            track_orientation(recorder, bus),
        ],
    }
}
