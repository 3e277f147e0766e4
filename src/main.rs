//! Landing Analytics - scripted session runner
//!
//! Plays a short landing-page visit through the recorder and prints the
//! exported analytics bundle. An optional path argument also writes the
//! session's events to a file (format picked from the extension).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use landing_analytics::analytics::{
    self, Delivery, ExportFormat, FileStore, KeyValueStore, MemoryStore, Properties, Recorder,
    Signal, SignalBus, SystemEnvironment, Viewport,
};
use landing_analytics::{constants, AnalyticsConfig};

fn open_store(config: &AnalyticsConfig) -> Arc<dyn KeyValueStore> {
    match FileStore::new(config.storage_dir.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::warn!("File store unavailable ({}), using in-memory storage", e);
            Arc::new(MemoryStore::new())
        }
    }
}

fn play_visit(recorder: &Arc<Recorder>, bus: &SignalBus) {
    let tracking = analytics::start_tracking(recorder, bus);

    recorder.intro_started(Properties::new());
    for _ in 0..12 {
        bus.publish(Signal::PointerMoved);
    }
    recorder.intro_completed(Properties::new());

    for piece in 0..4 {
        recorder.puzzle_piece_unlocked(piece, Properties::new());
    }
    recorder.puzzle_completed(Properties::new());

    recorder.sound_toggled(false, Properties::new());
    recorder.scroll_depth(0.75, Properties::new());
    bus.publish(Signal::OrientationChanged { angle: 90 });

    recorder.cta_clicked("play_now", Properties::new());
    recorder.game_selected("memory-match", Properties::new());
    recorder.game_started("memory-match", Properties::new());

    bus.publish(Signal::VisibilityChanged { hidden: true });
    tracking.stop();
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}...", constants::APP_NAME, constants::APP_VERSION);

    let config = AnalyticsConfig::default();
    log::info!(
        "Mode: {}, storage key: {}, capacity: {}",
        config.mode.as_str(),
        config.storage_key,
        config.max_stored_events
    );

    let env = SystemEnvironment::new(open_store(&config))
        .with_viewport(Viewport::new(1280, 720))
        .with_url("https://landing.example/")
        .with_referrer("");

    let recorder = Arc::new(Recorder::new(&config, Arc::new(env), Delivery::from_config(&config)));
    let bus = SignalBus::new();

    play_visit(&recorder, &bus);

    let export = recorder.export_all();
    match serde_json::to_string_pretty(&export) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize analytics export: {}", e),
    }

    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let format = ExportFormat::from_path(&path).unwrap_or(ExportFormat::JsonArray);
        if let Err(e) = analytics::export_events(&export.events, &path, format) {
            log::error!("Export to {:?} failed: {}", path, e);
        }
    }

    match Arc::try_unwrap(recorder) {
        Ok(recorder) => {
            recorder.shutdown(Duration::from_secs(2));
        }
        Err(_) => log::warn!("Recorder still shared at exit, skipping delivery shutdown"),
    }
}
