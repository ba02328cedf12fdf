//! Budget-gated external text generation.
//!
//! The gate wraps one external generation call with intensity
//! classification, per-user daily peak quota enforcement, strict
//! input/output clamping, and an exhaustive fail-soft error taxonomy. It
//! never throws: every failure path resolves to no text plus a machine
//! reason code, and the caller falls back to deterministic template text.

pub mod config;
pub mod gate;
pub mod usage;

pub use config::GenerationConfig;
pub use gate::{GenerateDebug, GenerateFailure, GenerationGate};
pub use usage::{InMemoryUsageLog, UsageLog, UsageRecord};

use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::world::drift::day_gap_utc;
use crate::world::whisper::WHISPER_LONG_BREAK_DAYS;

/// Streak length at which a session start reads as a milestone worth a
/// peak-budget reaction.
pub const PEAK_STREAK_THRESHOLD: u32 = 7;

/// How much generation budget a reaction may consume. Peak carries a
/// materially larger token/char budget and a stricter per-user daily
/// quota. Recomputed per event, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Light,
    Peak,
}

impl std::fmt::Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intensity::Light => "light",
            Intensity::Peak => "peak",
        };
        write!(f, "{s}")
    }
}

/// Classify how much generation budget an event deserves. Pure function of
/// the event type plus a few context fields; `None` means the event never
/// generates (template-only or silent).
pub fn classify_intensity(event: &Event) -> Option<Intensity> {
    match event.event_type.as_str() {
        "session.start" => {
            let world = event.context.world.as_ref();
            let streak = world.map(|w| w.streak_days).unwrap_or(0);
            let days_away = world
                .and_then(|w| w.last_session_end)
                .map(|end| day_gap_utc(end, event.timestamp))
                .unwrap_or(0);
            if streak >= PEAK_STREAK_THRESHOLD || days_away >= WHISPER_LONG_BREAK_DAYS {
                Some(Intensity::Peak)
            } else {
                Some(Intensity::Light)
            }
        }
        "game.complete" | "mission.complete" | "companion.swap" => Some(Intensity::Light),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventScope;
    use crate::world::WorldSnapshot;
    use chrono::{TimeZone, Utc};

    fn start_event(streak: u32, days_away: i64) -> Event {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let mut event = Event::new("session.start", EventScope::App).at(now);
        event.context.world = Some(WorldSnapshot {
            streak_days: streak,
            last_session_end: Some(now - chrono::Duration::days(days_away)),
            ..Default::default()
        });
        event
    }

    #[test]
    fn test_long_streak_classifies_peak() {
        assert_eq!(classify_intensity(&start_event(7, 1)), Some(Intensity::Peak));
    }

    #[test]
    fn test_long_break_classifies_peak() {
        assert_eq!(classify_intensity(&start_event(1, 4)), Some(Intensity::Peak));
    }

    #[test]
    fn test_ordinary_start_classifies_light() {
        assert_eq!(classify_intensity(&start_event(2, 1)), Some(Intensity::Light));
    }

    #[test]
    fn test_start_without_context_classifies_light() {
        let event = Event::new("session.start", EventScope::App);
        assert_eq!(classify_intensity(&event), Some(Intensity::Light));
    }

    #[test]
    fn test_silent_types_classify_none() {
        for event_type in ["session.end", "game.session.start", "page.view"] {
            let event = Event::new(event_type, EventScope::App);
            assert_eq!(classify_intensity(&event), None, "{event_type}");
        }
    }
}
