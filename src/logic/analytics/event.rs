//! Analytics Event Types
//!
//! Timestamped event envelopes and the session they belong to.
//! Field names serialize in camelCase so a persisted buffer stays readable
//! by the browser client.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open property mapping attached to every event
pub type Properties = Map<String, Value>;

/// Context keys always taken from the environment, never from callers
pub const RESERVED_KEYS: [&str; 4] = ["userAgent", "viewport", "url", "referrer"];

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// `<prefix>_<millis>_<9 base36 chars>`. Unique with high probability only.
fn generate_id(prefix: &str, now_ms: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, now_ms, suffix)
}

pub fn generate_session_id(now_ms: i64) -> String {
    generate_id("session", now_ms)
}

pub fn generate_event_id(now_ms: i64) -> String {
    generate_id("event", now_ms)
}

// ============================================================================
// SESSION
// ============================================================================

/// One recorder lifetime between construction (or `clear`) and the next `clear`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Milliseconds since Unix epoch
    pub started_at: i64,
}

impl Session {
    pub fn start(now_ms: i64) -> Self {
        Self {
            id: generate_session_id(now_ms),
            started_at: now_ms,
        }
    }

    /// Milliseconds since the session started
    pub fn elapsed(&self, now_ms: i64) -> i64 {
        now_ms - self.started_at
    }
}

// ============================================================================
// EVENT NAMES
// ============================================================================

/// Canonical names of the named-emitter catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    LandingPageView,
    IntroStarted,
    IntroCompleted,
    IntroSkipped,
    PuzzlePieceUnlocked,
    PuzzleCompleted,
    CtaClicked,
    InteractionStarted,
    SoundToggled,
    ErrorOccurred,
    TimeSpent,
    MouseMovement,
    ScrollDepth,
    DeviceOrientation,
    GameSelected,
    GameStarted,
}

impl EventName {
    pub const ALL: [EventName; 16] = [
        EventName::LandingPageView,
        EventName::IntroStarted,
        EventName::IntroCompleted,
        EventName::IntroSkipped,
        EventName::PuzzlePieceUnlocked,
        EventName::PuzzleCompleted,
        EventName::CtaClicked,
        EventName::InteractionStarted,
        EventName::SoundToggled,
        EventName::ErrorOccurred,
        EventName::TimeSpent,
        EventName::MouseMovement,
        EventName::ScrollDepth,
        EventName::DeviceOrientation,
        EventName::GameSelected,
        EventName::GameStarted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::LandingPageView => "landing_page_view",
            EventName::IntroStarted => "intro_started",
            EventName::IntroCompleted => "intro_completed",
            EventName::IntroSkipped => "intro_skipped",
            EventName::PuzzlePieceUnlocked => "puzzle_piece_unlocked",
            EventName::PuzzleCompleted => "puzzle_completed",
            EventName::CtaClicked => "cta_clicked",
            EventName::InteractionStarted => "interaction_started",
            EventName::SoundToggled => "sound_toggled",
            EventName::ErrorOccurred => "error_occurred",
            EventName::TimeSpent => "time_spent",
            EventName::MouseMovement => "mouse_movement",
            EventName::ScrollDepth => "scroll_depth",
            EventName::DeviceOrientation => "device_orientation",
            EventName::GameSelected => "game_selected",
            EventName::GameStarted => "game_started",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.as_str() == name)
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ANALYTICS EVENT
// ============================================================================

/// Event envelope, immutable once emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: String,
    /// Session active at emission time
    pub session_id: String,
    pub name: String,
    /// Milliseconds since Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub properties: Properties,
}

impl AnalyticsEvent {
    pub fn new(session: &Session, name: &str, timestamp: i64, properties: Properties) -> Self {
        Self {
            id: generate_event_id(timestamp),
            session_id: session.id.clone(),
            name: name.to_string(),
            timestamp,
            properties,
        }
    }

    /// Canonical name, if this event came from the named-emitter catalogue
    pub fn event_name(&self) -> Option<EventName> {
        EventName::from_name(&self.name)
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Single-line JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
