//! Whisper selection — the rarer proactive message, distinct from the
//! companion's direct event reactions.
//!
//! Gated first by a cooldown since the last whisper, then by one of two
//! triggers: the streak just climbed past a minimum, or the user returned
//! from a long break. The line itself comes from a small fixed library
//! keyed by mood and scenario, chosen by the deterministic selector.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::drift::day_gap_utc;
use super::state::{Mood, WorldSnapshot};
use crate::selector::seeded_index;

/// Hours that must pass since the last whisper before another may fire.
pub const WHISPER_COOLDOWN_HOURS: i64 = 24;

/// Minimum streak length for the streak scenario.
pub const WHISPER_MIN_STREAK: u32 = 3;

/// Calendar days away that count as a long break.
pub const WHISPER_LONG_BREAK_DAYS: i64 = 3;

/// What prompted a whisper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhisperScenario {
    Streak,
    LongBreak,
}

impl std::fmt::Display for WhisperScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WhisperScenario::Streak => "streak",
            WhisperScenario::LongBreak => "long_break",
        };
        write!(f, "{s}")
    }
}

/// A selected whisper line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whisper {
    pub text: String,
    pub scenario: WhisperScenario,
}

/// Decide whether a whisper fires for this session start, given the
/// pre-drift and post-drift snapshots. Pure: identical inputs always
/// produce the identical decision and line.
pub fn maybe_whisper(
    prev: &WorldSnapshot,
    next: &WorldSnapshot,
    now: DateTime<Utc>,
) -> Option<Whisper> {
    if let Some(last) = prev.last_whisper_at {
        if now.signed_duration_since(last) < Duration::hours(WHISPER_COOLDOWN_HOURS) {
            return None;
        }
    }

    let days_away = prev
        .last_session_end
        .map(|end| day_gap_utc(end, now))
        .unwrap_or(0);

    let streak_rose = next.streak_days > prev.streak_days
        && next.streak_days >= WHISPER_MIN_STREAK
        && next.streak_days > prev.last_whisper_streak;

    let scenario = if streak_rose {
        WhisperScenario::Streak
    } else if days_away >= WHISPER_LONG_BREAK_DAYS {
        WhisperScenario::LongBreak
    } else {
        return None;
    };

    let mood = next.effective_mood();
    let lines = library(mood, scenario);
    let seed = format!(
        "{}|{}|{}|{}",
        next.streak_days,
        days_away,
        now.date_naive(),
        scenario
    );
    let text = lines[seeded_index(&seed, lines.len())].to_string();

    Some(Whisper { text, scenario })
}

/// Fixed whisper library, keyed by mood and scenario. Three variants per
/// cell keeps repeat whispers from reading identically without needing
/// runtime randomness.
fn library(mood: Mood, scenario: WhisperScenario) -> &'static [&'static str] {
    match (mood, scenario) {
        (Mood::Bright, WhisperScenario::Streak) => &[
            "Look at that streak. You keep showing up and it shows.",
            "Another day in a row. I love this rhythm we have.",
            "Your streak is glowing today. So am I.",
        ],
        (Mood::Steady, WhisperScenario::Streak) => &[
            "Quiet consistency. Your streak is growing day by day.",
            "Back again, right on time. The streak holds.",
            "One more day added to the chain. Nicely done.",
        ],
        (Mood::Low, WhisperScenario::Streak) => &[
            "Even on slow days you came back. That counts double.",
            "The streak survived. So did we.",
            "Still here, still counting. One day at a time.",
        ],
        (Mood::Bright, WhisperScenario::LongBreak) => &[
            "You're back! I kept everything warm for you.",
            "There you are. The place brightened the moment you arrived.",
            "Welcome back. I saved your favorite spot.",
        ],
        (Mood::Steady, WhisperScenario::LongBreak) => &[
            "It's been a little while. Good to see you again.",
            "Welcome back. Everything is where you left it.",
            "You were missed. Ready when you are.",
        ],
        (Mood::Low, WhisperScenario::LongBreak) => &[
            "However long it takes, this door stays open.",
            "No catching up needed. Just glad you're here.",
            "You came back. That's the only part that matters.",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    fn snapshots(prev_streak: u32, next_streak: u32) -> (WorldSnapshot, WorldSnapshot) {
        let prev = WorldSnapshot {
            streak_days: prev_streak,
            last_session_end: Some(utc(2026, 3, 1, 20)),
            ..Default::default()
        };
        let next = WorldSnapshot {
            streak_days: next_streak,
            ..prev.clone()
        };
        (prev, next)
    }

    #[test]
    fn test_streak_rise_fires() {
        let (prev, next) = snapshots(2, 3);
        let whisper = maybe_whisper(&prev, &next, utc(2026, 3, 2, 9)).unwrap();
        assert_eq!(whisper.scenario, WhisperScenario::Streak);
        assert!(!whisper.text.is_empty());
    }

    #[test]
    fn test_below_min_streak_is_silent() {
        let (prev, next) = snapshots(1, 2);
        assert!(maybe_whisper(&prev, &next, utc(2026, 3, 2, 9)).is_none());
    }

    #[test]
    fn test_long_break_fires() {
        let (prev, next) = snapshots(5, 1);
        let whisper = maybe_whisper(&prev, &next, utc(2026, 3, 6, 9)).unwrap();
        assert_eq!(whisper.scenario, WhisperScenario::LongBreak);
    }

    #[test]
    fn test_cooldown_blocks() {
        let (mut prev, next) = snapshots(2, 3);
        prev.last_whisper_at = Some(utc(2026, 3, 2, 1));
        assert!(maybe_whisper(&prev, &next, utc(2026, 3, 2, 9)).is_none());
    }

    #[test]
    fn test_already_whispered_streak_is_silent() {
        let (mut prev, next) = snapshots(3, 4);
        prev.last_whisper_streak = 4;
        // Streak rose but not past the last whispered streak, and no long
        // break either.
        assert!(maybe_whisper(&prev, &next, utc(2026, 3, 2, 9)).is_none());
    }

    #[test]
    fn test_selection_is_deterministic() {
        let (prev, next) = snapshots(2, 3);
        let a = maybe_whisper(&prev, &next, utc(2026, 3, 2, 9)).unwrap();
        let b = maybe_whisper(&prev, &next, utc(2026, 3, 2, 9)).unwrap();
        assert_eq!(a.text, b.text);
    }
}
