//! Bounded recency throttle for optional reactions.
//!
//! Enforces a cooldown per throttle key (user or session id) independent of
//! the capability gate's own cooldown. The map is bounded: at the size
//! ceiling the oldest third of entries is evicted. That is an approximate
//! LRU, not exact — an accepted tradeoff for a soft, best-effort throttle.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Default ceiling on tracked keys before eviction kicks in.
pub const DEFAULT_MAX_ENTRIES: usize = 512;

/// A keyed last-fire map with cooldown and bounded size.
///
/// Process-local, shared across dispatches; concurrent callers for the same
/// key may occasionally both pass a check that should have blocked the
/// second one. This is an anti-spam throttle, not a correctness lock.
#[derive(Debug)]
pub struct RecencyThrottle {
    cooldown: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl RecencyThrottle {
    /// Create a throttle with the given cooldown and the default size
    /// ceiling.
    pub fn new(cooldown: Duration) -> Self {
        Self::with_capacity(cooldown, DEFAULT_MAX_ENTRIES)
    }

    /// Create a throttle with an explicit size ceiling.
    pub fn with_capacity(cooldown: Duration, max_entries: usize) -> Self {
        Self {
            cooldown,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Check the cooldown for `key` at `now`, recording the fire when it
    /// passes. Returns `true` when the caller may proceed.
    pub fn try_fire(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();

        if let Some(last) = entries.get(key) {
            if now.signed_duration_since(*last) < self.cooldown {
                return false;
            }
        }

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            evict_oldest_third(&mut entries);
        }
        entries.insert(key.to_string(), now);
        true
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Drop the oldest third of entries, sorted by last-fire timestamp.
fn evict_oldest_third(entries: &mut HashMap<String, DateTime<Utc>>) {
    let mut by_age: Vec<(String, DateTime<Utc>)> =
        entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
    by_age.sort_by_key(|(_, at)| *at);

    let evict = (by_age.len() / 3).max(1);
    log::debug!("recency throttle at capacity, evicting {evict} oldest entries");
    for (key, _) in by_age.into_iter().take(evict) {
        entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_first_fire_passes_and_records() {
        let throttle = RecencyThrottle::new(Duration::seconds(60));
        assert!(throttle.try_fire("u1", at(0)));
        assert_eq!(throttle.len(), 1);
    }

    #[test]
    fn test_cooldown_blocks_then_clears() {
        let throttle = RecencyThrottle::new(Duration::seconds(60));
        assert!(throttle.try_fire("u1", at(0)));
        assert!(!throttle.try_fire("u1", at(30)));
        assert!(throttle.try_fire("u1", at(60)));
    }

    #[test]
    fn test_keys_are_independent() {
        let throttle = RecencyThrottle::new(Duration::seconds(60));
        assert!(throttle.try_fire("u1", at(0)));
        assert!(throttle.try_fire("u2", at(1)));
    }

    #[test]
    fn test_eviction_drops_oldest_third() {
        let throttle = RecencyThrottle::with_capacity(Duration::seconds(1), 9);
        for i in 0..9 {
            assert!(throttle.try_fire(&format!("k{i}"), at(i)));
        }
        assert_eq!(throttle.len(), 9);

        // A new key at the ceiling evicts the 3 oldest, then inserts.
        assert!(throttle.try_fire("fresh", at(100)));
        assert_eq!(throttle.len(), 7);

        // The oldest keys were dropped, so they pass again immediately.
        assert!(throttle.try_fire("k0", at(100)));
    }
}
