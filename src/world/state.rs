//! World snapshot and mood label.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mood value above this label is `bright`.
pub const MOOD_BRIGHT_THRESHOLD: f64 = 0.28;

/// Mood value below this label is `low`.
pub const MOOD_LOW_THRESHOLD: f64 = -0.28;

/// Derived mood label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Bright,
    Steady,
    Low,
}

impl Mood {
    /// Derive the label from a mood value via the fixed thresholds.
    pub fn from_value(value: f64) -> Self {
        if value > MOOD_BRIGHT_THRESHOLD {
            Mood::Bright
        } else if value < MOOD_LOW_THRESHOLD {
            Mood::Low
        } else {
            Mood::Steady
        }
    }

    /// Parse a stored label, accepting only the three valid values.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "bright" => Some(Mood::Bright),
            "steady" => Some(Mood::Steady),
            "low" => Some(Mood::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mood::Bright => "bright",
            Mood::Steady => "steady",
            Mood::Low => "low",
        };
        write!(f, "{s}")
    }
}

/// Persisted world/mood snapshot, keyed by user.
///
/// Created lazily on a user's first `session.start`; mutated only by the
/// drift functions at session boundaries; never deleted. The caller does a
/// read-modify-write around each boundary update with no optimistic
/// concurrency check — concurrent boundary events for one user can lose an
/// update, which is accepted for this soft state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Start of the most recent session.
    #[serde(default)]
    pub last_session_start: Option<DateTime<Utc>>,

    /// End of the most recent session.
    #[serde(default)]
    pub last_session_end: Option<DateTime<Utc>>,

    /// Current consecutive-day streak.
    #[serde(default)]
    pub streak_days: u32,

    /// Streak length before the most recent start drift.
    #[serde(default)]
    pub previous_streak_days: u32,

    /// Mood value, always clamped to `[-1, 1]` and rounded to 2 decimals.
    #[serde(default)]
    pub mood_value: f64,

    /// Stored mood label. May hold a legacy/unknown value from
    /// persistence; read through [`WorldSnapshot::effective_mood`].
    #[serde(default = "default_mood_label")]
    pub mood: String,

    /// Pages visited during the last completed session.
    #[serde(default)]
    pub last_pages_visited: u32,

    /// Games played during the last completed session.
    #[serde(default)]
    pub last_games_played: u32,

    /// When the last whisper fired, if ever.
    #[serde(default)]
    pub last_whisper_at: Option<DateTime<Utc>>,

    /// Streak length when the last whisper fired.
    #[serde(default)]
    pub last_whisper_streak: u32,
}

fn default_mood_label() -> String {
    "steady".to_string()
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            last_session_start: None,
            last_session_end: None,
            streak_days: 0,
            previous_streak_days: 0,
            mood_value: 0.0,
            mood: default_mood_label(),
            last_pages_visited: 0,
            last_games_played: 0,
            last_whisper_at: None,
            last_whisper_streak: 0,
        }
    }
}

impl WorldSnapshot {
    /// The effective mood label: the stored label when it is one of the
    /// three valid values, otherwise re-derived from the mood value.
    pub fn effective_mood(&self) -> Mood {
        Mood::parse(&self.mood).unwrap_or_else(|| Mood::from_value(self.mood_value))
    }
}

/// Clamp a mood value to `[-1, 1]` and round to 2 decimals.
pub fn clamp_mood(value: f64) -> f64 {
    (value.clamp(-1.0, 1.0) * 100.0).round() / 100.0
}
