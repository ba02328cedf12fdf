//! Session-boundary drift: pure functions from a previous snapshot plus a
//! boundary instant to a new snapshot.
//!
//! Streak math uses calendar-day difference in UTC, not elapsed
//! milliseconds: a session at 23:59 and one at 00:01 the next day count as
//! a 1-day gap even though less than five minutes elapsed.

use chrono::{DateTime, Utc};

use super::state::{clamp_mood, Mood, WorldSnapshot};

/// Mood bump when the previous session ended within a day.
const RECENT_RETURN_BONUS: f64 = 0.04;

/// Per-day mood penalty for each day away beyond the first.
const ABSENCE_PENALTY_PER_DAY: f64 = 0.04;

/// Absence penalty floor.
const ABSENCE_PENALTY_MAX: f64 = 0.16;

/// Bonus for having played games last session.
const GAMES_ENGAGEMENT_BONUS: f64 = 0.02;

/// Bonus for having visited pages last session.
const PAGES_ENGAGEMENT_BONUS: f64 = 0.01;

/// Penalty when the last session had no engagement at all.
const NO_ENGAGEMENT_PENALTY: f64 = 0.03;

/// Bonus at a streak of 3 or more days.
const STREAK_3_BONUS: f64 = 0.05;

/// Additional bonus at a streak of 7 or more days.
const STREAK_7_BONUS: f64 = 0.05;

/// Calendar-day difference in UTC between two instants.
pub fn day_gap_utc(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    later
        .date_naive()
        .signed_duration_since(earlier.date_naive())
        .num_days()
}

/// Apply the `session.start` drift: streak update, bounded mood deltas,
/// and label re-derivation. Returns a new snapshot; the input is untouched.
pub fn apply_start_drift(prev: &WorldSnapshot, now: DateTime<Utc>) -> WorldSnapshot {
    let mut next = prev.clone();
    next.previous_streak_days = prev.streak_days;

    next.streak_days = match prev.last_session_start {
        None => 1,
        Some(last_start) => match day_gap_utc(last_start, now) {
            0 => prev.streak_days.max(1),
            1 => prev.streak_days + 1,
            _ => 1,
        },
    };

    let mut value = prev.mood_value;

    if let Some(last_end) = prev.last_session_end {
        let days_away = day_gap_utc(last_end, now);
        if days_away <= 1 {
            value += RECENT_RETURN_BONUS;
        } else {
            let penalty = (ABSENCE_PENALTY_PER_DAY * (days_away - 1) as f64)
                .min(ABSENCE_PENALTY_MAX);
            value -= penalty;
        }
    }

    let played = prev.last_games_played > 0;
    let browsed = prev.last_pages_visited > 0;
    if played {
        value += GAMES_ENGAGEMENT_BONUS;
    }
    if browsed {
        value += PAGES_ENGAGEMENT_BONUS;
    }
    if !played && !browsed && prev.last_session_end.is_some() {
        value -= NO_ENGAGEMENT_PENALTY;
    }

    if next.streak_days >= 3 {
        value += STREAK_3_BONUS;
    }
    if next.streak_days >= 7 {
        value += STREAK_7_BONUS;
    }

    next.mood_value = clamp_mood(value);
    next.mood = Mood::from_value(next.mood_value).to_string();
    next.last_session_start = Some(now);
    next
}

/// Apply the `session.end` update: stamp the end instant and record the
/// caller-supplied engagement counters. Streak and mood are untouched —
/// mood evolution happens exclusively at the next start.
pub fn apply_end_update(
    prev: &WorldSnapshot,
    now: DateTime<Utc>,
    pages_visited: u32,
    games_played: u32,
) -> WorldSnapshot {
    let mut next = prev.clone();
    next.last_session_end = Some(now);
    next.last_pages_visited = pages_visited;
    next.last_games_played = games_played;
    next
}
