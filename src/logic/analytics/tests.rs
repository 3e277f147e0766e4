use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;

use super::environment::{ManualEnvironment, Viewport};
use super::error::{AnalyticsError, AnalyticsResult};
use super::event::{AnalyticsEvent, Properties, RESERVED_KEYS};
use super::recorder::Recorder;
use super::sink::{Delivery, DeliverySink};
use super::storage::{KeyValueStore, MemoryStore};
use crate::logic::config::AnalyticsConfig;

fn props(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

fn recorder_with_store(store: Arc<MemoryStore>, config: AnalyticsConfig) -> (Arc<ManualEnvironment>, Recorder) {
    let env = Arc::new(ManualEnvironment::with_storage(0, store));
    env.set_user_agent(Some("TestAgent/1.0"));
    env.set_viewport(Some(Viewport::new(1280, 720)));
    env.set_url(Some("https://example.com/landing"));
    env.set_referrer(Some("https://search.example/"));
    let recorder = Recorder::new(&config, env.clone(), Delivery::LogOnly);
    (env, recorder)
}

fn setup() -> (Arc<ManualEnvironment>, Arc<MemoryStore>, Recorder) {
    let store = Arc::new(MemoryStore::new());
    let (env, recorder) = recorder_with_store(store.clone(), AnalyticsConfig::builtin());
    (env, store, recorder)
}

#[test]
fn test_every_emit_is_kept_in_memory() {
    let (env, _store, recorder) = setup();

    for i in 0..250 {
        env.advance(1);
        recorder.emit(&format!("custom_{}", i % 7), Properties::new());
    }

    assert_eq!(recorder.event_count(), 250);
    assert_eq!(recorder.summarize().event_count, 250);
    // The persisted tail is capped independently
    assert_eq!(recorder.stored_events().len(), 100);
}

#[test]
fn test_emit_then_clear_scenario() {
    let (env, _store, recorder) = setup();
    let session_before = recorder.session_id();

    env.set_now(10);
    recorder.emit("x", props(json!({ "a": 1 })));

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.name, "x");
    assert_eq!(event.timestamp, 10);
    assert_eq!(event.session_id, session_before);
    assert_eq!(event.property("a"), Some(&json!(1)));
    assert_eq!(event.property("userAgent"), Some(&json!("TestAgent/1.0")));
    assert_eq!(event.property("viewport"), Some(&json!({ "width": 1280, "height": 720 })));
    assert_eq!(event.property("url"), Some(&json!("https://example.com/landing")));
    assert_eq!(event.property("referrer"), Some(&json!("https://search.example/")));

    recorder.clear();
    let summary = recorder.summarize();
    assert_eq!(summary.event_count, 0);
    assert_ne!(summary.session_id, session_before);
}

#[test]
fn test_persist_overflow_evicts_oldest() {
    let (env, _store, recorder) = setup();
    let session = recorder.session();

    let pushed: Vec<AnalyticsEvent> = (0..101)
        .map(|i| {
            env.set_now(i);
            AnalyticsEvent::new(&session, "x", i, Properties::new())
        })
        .collect();
    for event in &pushed {
        recorder.persist(event);
    }

    let stored = recorder.stored_events();
    assert_eq!(stored.len(), 100);
    assert!(stored.iter().all(|e| e.id != pushed[0].id));

    let stored_ids: Vec<&str> = stored.iter().map(|e| e.id.as_str()).collect();
    let expected: Vec<&str> = pushed[1..].iter().map(|e| e.id.as_str()).collect();
    assert_eq!(stored_ids, expected);
}

#[test]
fn test_configured_capacity() {
    let store = Arc::new(MemoryStore::new());
    let config = AnalyticsConfig::builtin().with_max_stored_events(3);
    let (_env, recorder) = recorder_with_store(store, config);

    for name in ["a", "b", "c", "d", "e"] {
        recorder.emit(name, Properties::new());
    }

    let stored: Vec<String> = recorder.stored_events().into_iter().map(|e| e.name).collect();
    assert_eq!(stored, vec!["c", "d", "e"]);
    assert_eq!(recorder.event_count(), 5);
}

#[test]
fn test_corrupt_persisted_data_is_treated_as_empty() {
    let (_env, store, recorder) = setup();
    store.set("landingPageEvents", "definitely not json").unwrap();

    assert!(recorder.stored_events().is_empty());
    assert!(recorder.export_all().stored_events.is_empty());

    recorder.emit("x", Properties::new());
    assert_eq!(recorder.stored_events().len(), 1);
}

#[test]
fn test_quota_failure_keeps_memory_record() {
    let store = Arc::new(MemoryStore::with_quota(64));
    let (_env, recorder) = recorder_with_store(store.clone(), AnalyticsConfig::builtin());

    recorder.emit("x", Properties::new());
    recorder.emit("y", Properties::new());

    assert_eq!(recorder.event_count(), 2);
    assert!(recorder.stored_events().is_empty());
    assert!(!store.contains("landingPageEvents"));
}

#[test]
fn test_reserved_context_keys_cannot_be_spoofed() {
    let (_env, _store, recorder) = setup();

    recorder.emit(
        "x",
        props(json!({
            "userAgent": "spoofed",
            "viewport": { "width": 1, "height": 1 },
            "url": "https://evil.example/",
            "referrer": "spoofed",
            "kept": true,
        })),
    );

    let event = &recorder.events()[0];
    assert_eq!(event.property("userAgent"), Some(&json!("TestAgent/1.0")));
    assert_eq!(event.property("viewport"), Some(&json!({ "width": 1280, "height": 720 })));
    assert_eq!(event.property("url"), Some(&json!("https://example.com/landing")));
    assert_eq!(event.property("referrer"), Some(&json!("https://search.example/")));
    assert_eq!(event.property("kept"), Some(&json!(true)));
}

#[test]
fn test_unknown_context_defaults() {
    let env = Arc::new(ManualEnvironment::new(0));
    let recorder = Recorder::new(&AnalyticsConfig::builtin(), env, Delivery::LogOnly);

    recorder.emit("x", Properties::new());
    let event = &recorder.events()[0];
    for key in RESERVED_KEYS {
        assert!(event.property(key).is_some(), "missing {}", key);
    }
    assert_eq!(event.property("userAgent"), Some(&json!("unknown")));
    assert_eq!(event.property("viewport"), Some(&serde_json::Value::Null));
    assert_eq!(event.property("url"), Some(&json!("")));

    let device = recorder.summarize().device_info;
    assert_eq!(device.user_agent, "unknown");
    assert_eq!(device.connection, "unknown");
    assert_eq!(device.viewport, None);
    assert!(!device.touch);
}

#[test]
fn test_disabled_recorder_records_nothing() {
    let (_env, _store, recorder) = setup();
    recorder.set_enabled(false);
    recorder.emit("x", Properties::new());
    recorder.cta_clicked("play", Properties::new());
    assert_eq!(recorder.event_count(), 0);
    assert!(recorder.stored_events().is_empty());

    recorder.set_enabled(true);
    recorder.emit("x", Properties::new());
    assert_eq!(recorder.event_count(), 1);
}

#[test]
fn test_empty_name_is_ignored() {
    let (_env, _store, recorder) = setup();
    recorder.emit("", Properties::new());
    recorder.emit("   ", Properties::new());
    assert_eq!(recorder.event_count(), 0);
}

#[test]
fn test_intro_completed_attaches_completion_time() {
    let (env, _store, recorder) = setup();
    env.set_now(1_234);
    recorder.intro_completed(Properties::new());

    let event = &recorder.events()[0];
    assert_eq!(event.name, "intro_completed");
    assert_eq!(event.property("completionTime"), Some(&json!(1_234)));
}

#[test]
fn test_elapsed_is_relative_to_current_session() {
    let (env, _store, recorder) = setup();
    env.set_now(5_000);
    recorder.clear();
    env.set_now(5_300);
    recorder.intro_skipped(Properties::new());

    let event = &recorder.events()[0];
    assert_eq!(event.property("skipTime"), Some(&json!(300)));
    assert_eq!(event.session_id, recorder.session_id());
}

#[test]
fn test_item_scoped_emitters() {
    let (env, _store, recorder) = setup();
    env.set_now(700);

    recorder.cta_clicked("play_now", Properties::new());
    recorder.puzzle_piece_unlocked(3, props(json!({ "source": "drag" })));
    recorder.game_selected("memory-match", Properties::new());
    recorder.game_started("memory-match", Properties::new());
    recorder.error_occurred("audio", "context suspended", Properties::new());
    recorder.sound_toggled(false, Properties::new());
    recorder.puzzle_completed(Properties::new());
    recorder.interaction_started("drag", Properties::new());
    recorder.scroll_depth(0.5, Properties::new());

    let events = recorder.events();
    assert_eq!(events.len(), 9);
    assert_eq!(events[0].property("ctaType"), Some(&json!("play_now")));
    assert_eq!(events[0].property("clickTime"), Some(&json!(700)));

    assert_eq!(events[1].name, "puzzle_piece_unlocked");
    assert_eq!(events[1].property("pieceIndex"), Some(&json!(3)));
    assert_eq!(events[1].property("timestamp"), Some(&json!(700)));
    assert_eq!(events[1].property("source"), Some(&json!("drag")));

    assert_eq!(events[2].property("gameId"), Some(&json!("memory-match")));
    assert_eq!(events[2].property("selectionTime"), Some(&json!(700)));
    assert_eq!(events[3].property("startTime"), Some(&json!(700)));

    assert_eq!(events[4].property("errorType"), Some(&json!("audio")));
    assert_eq!(events[4].property("errorMessage"), Some(&json!("context suspended")));
    assert_eq!(events[5].property("isEnabled"), Some(&json!(false)));

    assert_eq!(events[6].name, "puzzle_completed");
    assert_eq!(events[6].property("completionTime"), Some(&json!(700)));
    assert_eq!(events[7].name, "interaction_started");
    assert_eq!(events[7].property("interactionType"), Some(&json!("drag")));
    assert_eq!(events[8].name, "scroll_depth");
    assert_eq!(events[8].property("depth"), Some(&json!(0.5)));
}

#[test]
fn test_summary_event_types_are_distinct() {
    let (env, _store, recorder) = setup();
    env.set_user_agent(Some("TestAgent/1.0"));
    env.set_touch(Some(true));
    env.set_connection(Some("4g"));

    recorder.intro_started(Properties::new());
    recorder.scroll_depth(0.5, Properties::new());
    recorder.intro_started(Properties::new());
    env.set_now(900);

    let summary = recorder.summarize();
    assert_eq!(summary.event_count, 3);
    assert_eq!(summary.event_types, vec!["intro_started", "scroll_depth"]);
    assert_eq!(summary.session_duration, 900);
    assert!(summary.device_info.touch);
    assert_eq!(summary.device_info.connection, "4g");
    assert_eq!(summary.device_info.viewport, Some(Viewport::new(1280, 720)));
}

#[test]
fn test_clear_removes_persisted_key() {
    let (_env, store, recorder) = setup();
    recorder.emit("x", Properties::new());
    assert!(store.contains("landingPageEvents"));

    recorder.clear();
    assert!(!store.contains("landingPageEvents"));
    assert!(recorder.events().is_empty());
}

#[test]
fn test_export_views_are_independent() {
    let store = Arc::new(MemoryStore::new());
    let (_env, first) = recorder_with_store(store.clone(), AnalyticsConfig::builtin());
    first.emit("a", Properties::new());
    first.emit("b", Properties::new());

    // A reload: new recorder, same store
    let (_env, second) = recorder_with_store(store, AnalyticsConfig::builtin());
    let export = second.export_all();

    assert_eq!(export.summary.event_count, 0);
    assert!(export.events.is_empty());
    assert_eq!(export.stored_events.len(), 2);
    assert_eq!(export.stored_events[0].session_id, first.session_id());

    let json = serde_json::to_value(&export).unwrap();
    assert!(json.get("storedEvents").is_some());
    assert!(json["summary"].get("eventTypes").is_some());
}

struct CapturingSink {
    seen: Mutex<Vec<String>>,
}

impl DeliverySink for CapturingSink {
    fn deliver(&self, event: &AnalyticsEvent) -> AnalyticsResult<()> {
        if event.name == "undeliverable" {
            return Err(AnalyticsError::Delivery("offline".to_string()));
        }
        self.seen.lock().push(event.name.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "capture"
    }
}

#[test]
fn test_emitted_events_are_delivered() {
    let sink = Arc::new(CapturingSink {
        seen: Mutex::new(Vec::new()),
    });
    let env = Arc::new(ManualEnvironment::browser(0));
    let recorder = Recorder::new(
        &AnalyticsConfig::builtin(),
        env,
        Delivery::queue(sink.clone()).unwrap(),
    );

    recorder.intro_started(Properties::new());
    recorder.emit("undeliverable", Properties::new());
    recorder.cta_clicked("signup", Properties::new());

    // Delivery failures never touch the in-memory record
    assert_eq!(recorder.event_count(), 3);

    let stats = recorder.shutdown(Duration::from_secs(5)).unwrap();
    assert_eq!(stats.submitted, 3);
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.failed, 1);

    let mut seen = sink.seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec!["cta_clicked", "intro_started"]);
}
