//! Named Emitters
//!
//! The catalogue UI components call. Derived fields go in first and caller
//! properties are laid over them; the reserved context keys are applied last
//! by `Recorder::emit`. Elapsed times are `now - session start` in ms.

use serde_json::{json, Value};

use super::event::{EventName, Properties};
use super::recorder::Recorder;

/// `derived` overlaid with `properties`
fn merged(derived: Vec<(&str, Value)>, properties: Properties) -> Properties {
    let mut out = Properties::new();
    for (key, value) in derived {
        out.insert(key.to_string(), value);
    }
    out.extend(properties);
    out
}

impl Recorder {
    fn emit_named(&self, name: EventName, derived: Vec<(&str, Value)>, properties: Properties) {
        self.emit(name.as_str(), merged(derived, properties));
    }

    // Landing page

    pub fn landing_page_view(&self, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(EventName::LandingPageView, vec![("sessionDuration", json!(elapsed))], properties);
    }

    pub fn intro_started(&self, properties: Properties) {
        self.emit_named(EventName::IntroStarted, vec![], properties);
    }

    pub fn intro_completed(&self, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(EventName::IntroCompleted, vec![("completionTime", json!(elapsed))], properties);
    }

    pub fn intro_skipped(&self, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(EventName::IntroSkipped, vec![("skipTime", json!(elapsed))], properties);
    }

    /// `timestamp` here is session-relative, unlike the envelope's
    pub fn puzzle_piece_unlocked(&self, piece_index: u32, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(
            EventName::PuzzlePieceUnlocked,
            vec![("pieceIndex", json!(piece_index)), ("timestamp", json!(elapsed))],
            properties,
        );
    }

    pub fn puzzle_completed(&self, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(EventName::PuzzleCompleted, vec![("completionTime", json!(elapsed))], properties);
    }

    pub fn cta_clicked(&self, cta_type: &str, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(
            EventName::CtaClicked,
            vec![("ctaType", json!(cta_type)), ("clickTime", json!(elapsed))],
            properties,
        );
    }

    pub fn interaction_started(&self, interaction_type: &str, properties: Properties) {
        self.emit_named(
            EventName::InteractionStarted,
            vec![("interactionType", json!(interaction_type))],
            properties,
        );
    }

    pub fn sound_toggled(&self, is_enabled: bool, properties: Properties) {
        self.emit_named(EventName::SoundToggled, vec![("isEnabled", json!(is_enabled))], properties);
    }

    pub fn error_occurred(&self, error_type: &str, error_message: &str, properties: Properties) {
        self.emit_named(
            EventName::ErrorOccurred,
            vec![("errorType", json!(error_type)), ("errorMessage", json!(error_message))],
            properties,
        );
    }

    // Engagement

    pub fn time_spent(&self, section: &str, duration_ms: i64, properties: Properties) {
        self.emit_named(
            EventName::TimeSpent,
            vec![("section", json!(section)), ("duration", json!(duration_ms))],
            properties,
        );
    }

    pub fn mouse_movement(&self, movement_count: u64, properties: Properties) {
        self.emit_named(EventName::MouseMovement, vec![("movementCount", json!(movement_count))], properties);
    }

    pub fn scroll_depth(&self, depth: f64, properties: Properties) {
        self.emit_named(EventName::ScrollDepth, vec![("depth", json!(depth))], properties);
    }

    pub fn device_orientation(&self, orientation: i32, properties: Properties) {
        self.emit_named(EventName::DeviceOrientation, vec![("orientation", json!(orientation))], properties);
    }

    // Conversion

    pub fn game_selected(&self, game_id: &str, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(
            EventName::GameSelected,
            vec![("gameId", json!(game_id)), ("selectionTime", json!(elapsed))],
            properties,
        );
    }

    pub fn game_started(&self, game_id: &str, properties: Properties) {
        let elapsed = self.elapsed_ms();
        self.emit_named(
            EventName::GameStarted,
            vec![("gameId", json!(game_id)), ("startTime", json!(elapsed))],
            properties,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_properties_override_derived() {
        let mut caller = Properties::new();
        caller.insert("clickTime".to_string(), json!(1));
        caller.insert("extra".to_string(), json!("x"));

        let out = merged(vec![("ctaType", json!("play")), ("clickTime", json!(99))], caller);
        assert_eq!(out["ctaType"], json!("play"));
        assert_eq!(out["clickTime"], json!(1));
        assert_eq!(out["extra"], json!("x"));
    }
}
