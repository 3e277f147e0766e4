//! Event Delivery
//!
//! Forwarding of emitted events to an external endpoint.
//! Deliveries are fire-and-forget: they run on a background executor with
//! no ordering between them, are never retried, and their errors are only
//! logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::error::{AnalyticsError, AnalyticsResult};
use super::event::AnalyticsEvent;
use crate::logic::config::AnalyticsConfig;

// ============================================================================
// SINKS
// ============================================================================

/// Destination for emitted events
pub trait DeliverySink: Send + Sync {
    fn deliver(&self, event: &AnalyticsEvent) -> AnalyticsResult<()>;

    fn name(&self) -> &'static str;
}

/// Logs instead of sending
pub struct LogSink;

impl DeliverySink for LogSink {
    fn deliver(&self, event: &AnalyticsEvent) -> AnalyticsResult<()> {
        log::debug!("Would send to analytics: {}", event.to_json());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Discards everything
pub struct NoopSink;

impl DeliverySink for NoopSink {
    fn deliver(&self, _event: &AnalyticsEvent) -> AnalyticsResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// JSON `POST` of each event to an HTTP endpoint
pub struct HttpSink {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(timeout_secs))
            .build();

        Self {
            endpoint: endpoint.to_string(),
            agent,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl DeliverySink for HttpSink {
    fn deliver(&self, event: &AnalyticsEvent) -> AnalyticsResult<()> {
        let body = serde_json::to_string(event)?;

        match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body)
        {
            Ok(resp) => {
                log::debug!("Delivered {} to {} ({})", event.id, self.endpoint, resp.status());
                Ok(())
            }
            Err(e) => Err(AnalyticsError::Delivery(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Delivery statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Background executor running each delivery as an independent task
pub struct Dispatcher {
    sender: Option<mpsc::UnboundedSender<AnalyticsEvent>>,
    worker: Option<JoinHandle<()>>,
    grace: Arc<Mutex<Duration>>,
    counters: Arc<Counters>,
    sink_name: &'static str,
}

impl Dispatcher {
    /// Start the worker thread for `sink`
    pub fn spawn(sink: Arc<dyn DeliverySink>) -> AnalyticsResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let grace = Arc::new(Mutex::new(Duration::ZERO));
        let counters = Arc::new(Counters::default());
        let sink_name = sink.name();

        let worker = {
            let grace = grace.clone();
            let counters = counters.clone();
            std::thread::Builder::new()
                .name("analytics-delivery".to_string())
                .spawn(move || run_worker(runtime, receiver, sink, grace, counters))?
        };

        log::info!("Analytics delivery started (sink: {})", sink_name);

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
            grace,
            counters,
            sink_name,
        })
    }

    /// Queue `event` for delivery. Never blocks.
    pub fn submit(&self, event: AnalyticsEvent) -> AnalyticsResult<()> {
        let sender = self.sender.as_ref().ok_or(AnalyticsError::DispatcherClosed)?;
        sender.send(event).map_err(|_| AnalyticsError::DispatcherClosed)?;
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink_name
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            submitted: self.counters.submitted.load(Ordering::SeqCst),
            delivered: self.counters.delivered.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Close the queue, then wait up to `grace` for in-flight deliveries.
    /// Deliveries still running after that are abandoned.
    pub fn shutdown(mut self, grace: Duration) -> DispatcherStats {
        *self.grace.lock() = grace;
        self.sender.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Analytics delivery worker panicked");
            }
        }

        let stats = self.stats();
        log::info!(
            "Analytics delivery stopped. Submitted: {}, delivered: {}, failed: {}",
            stats.submitted,
            stats.delivered,
            stats.failed
        );
        stats
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Closing the queue lets the worker exit on its own; nothing waits for it.
        self.sender.take();
    }
}

fn run_worker(
    runtime: tokio::runtime::Runtime,
    mut receiver: mpsc::UnboundedReceiver<AnalyticsEvent>,
    sink: Arc<dyn DeliverySink>,
    grace: Arc<Mutex<Duration>>,
    counters: Arc<Counters>,
) {
    runtime.block_on(async move {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(event) => {
                        let sink = sink.clone();
                        let counters = counters.clone();
                        in_flight.spawn_blocking(move || deliver_one(sink.as_ref(), &event, &counters));
                    }
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }

        let grace = *grace.lock();
        let drained = tokio::time::timeout(grace, drain(&mut in_flight)).await.is_ok();
        if !drained {
            log::warn!("Abandoning {} in-flight analytics deliveries", in_flight.len());
            in_flight.detach_all();
        }
    });

    runtime.shutdown_background();
}

async fn drain(in_flight: &mut JoinSet<()>) {
    while in_flight.join_next().await.is_some() {}
}

fn deliver_one(sink: &dyn DeliverySink, event: &AnalyticsEvent, counters: &Counters) {
    match sink.deliver(event) {
        Ok(()) => {
            counters.delivered.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::SeqCst);
            log::warn!("Failed to send analytics event {}: {}", event.id, e);
        }
    }
}

// ============================================================================
// DELIVERY
// ============================================================================

/// How the recorder forwards emitted events
pub enum Delivery {
    /// Bypass the sink entirely, log only
    LogOnly,
    /// Hand events to a background dispatcher
    Queue(Dispatcher),
}

impl Delivery {
    /// Log-only in development; otherwise HTTP when an endpoint is set, else no-op
    pub fn from_config(config: &AnalyticsConfig) -> Self {
        if !config.is_production() {
            return Delivery::LogOnly;
        }

        let sink: Arc<dyn DeliverySink> = match &config.endpoint {
            Some(endpoint) => Arc::new(HttpSink::new(endpoint, config.delivery_timeout_secs)),
            None => Arc::new(NoopSink),
        };

        match Dispatcher::spawn(sink) {
            Ok(dispatcher) => Delivery::Queue(dispatcher),
            Err(e) => {
                log::warn!("Analytics delivery unavailable, falling back to log-only: {}", e);
                Delivery::LogOnly
            }
        }
    }

    pub fn queue(sink: Arc<dyn DeliverySink>) -> AnalyticsResult<Self> {
        Ok(Delivery::Queue(Dispatcher::spawn(sink)?))
    }

    /// Best effort; failures are logged
    pub fn forward(&self, event: &AnalyticsEvent) {
        match self {
            Delivery::LogOnly => {
                log::debug!("Would send to analytics: {}", event.to_json());
            }
            Delivery::Queue(dispatcher) => {
                if let Err(e) = dispatcher.submit(event.clone()) {
                    log::warn!("Failed to send analytics event {}: {}", event.id, e);
                }
            }
        }
    }

    pub fn stats(&self) -> Option<DispatcherStats> {
        match self {
            Delivery::LogOnly => None,
            Delivery::Queue(dispatcher) => Some(dispatcher.stats()),
        }
    }

    /// Stop the dispatcher, if any
    pub fn shutdown(self, grace: Duration) -> Option<DispatcherStats> {
        match self {
            Delivery::LogOnly => None,
            Delivery::Queue(dispatcher) => Some(dispatcher.shutdown(grace)),
        }
    }
}
