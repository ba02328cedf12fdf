//! Inbound event type and its transport/context envelopes.
//!
//! Every piece of time-based logic downstream (cooldowns, streak math,
//! whisper gating) derives "now" from [`Event::timestamp`], never from the
//! wall clock, so replayed and retried events behave identically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::world::WorldSnapshot;

/// Coarse event category used purely for capability gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventScope {
    /// App-level lifecycle (session boundaries, page navigation).
    App,
    /// Companion-directed events (swap, customization).
    Companion,
    /// Game lifecycle events.
    Game,
    /// World/mood adaptation events.
    World,
    /// Internal system signals.
    System,
}

impl EventScope {
    /// Every scope, in declaration order.
    pub const ALL: [EventScope; 5] = [
        EventScope::App,
        EventScope::Companion,
        EventScope::Game,
        EventScope::World,
        EventScope::System,
    ];
}

impl std::fmt::Display for EventScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventScope::App => "app",
            EventScope::Companion => "companion",
            EventScope::Game => "game",
            EventScope::World => "world",
            EventScope::System => "system",
        };
        write!(f, "{s}")
    }
}

/// Transport metadata attached by the dispatch caller.
///
/// The three suppression flags are independent and reflect user
/// consent/preference state resolved by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMeta {
    /// Session this event belongs to, if any.
    #[serde(default)]
    pub session_id: Option<String>,

    /// User the event belongs to, if any.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Suppress visible companion reactions for this event.
    #[serde(default)]
    pub suppress_reactions: bool,

    /// Suppress memory/usage recording for this event.
    #[serde(default)]
    pub suppress_memory: bool,

    /// Suppress world/mood adaptation for this event.
    #[serde(default)]
    pub suppress_adaptation: bool,
}

/// Portable user preference state, supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortableState {
    /// Whether companion reactions are enabled at all.
    pub reactions_enabled: bool,

    /// Preferred tone override ("warm" | "direct"); anything else is
    /// ignored in favor of the companion's default.
    #[serde(default)]
    pub tone: Option<String>,
}

impl Default for PortableState {
    fn default() -> Self {
        Self {
            reactions_enabled: true,
            tone: None,
        }
    }
}

/// The currently active companion, as resolved by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveCompanion {
    /// Companion identifier.
    pub id: String,
    /// Display name used in reaction text.
    pub name: String,
    /// Personality archetype key (selects the default tone/vocabulary).
    pub archetype: String,
}

/// Read-only context snapshot bundle assembled by the caller before
/// dispatch. The core never fetches its own context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContext {
    /// Persisted world/mood snapshot for the user, if one exists yet.
    #[serde(default)]
    pub world: Option<WorldSnapshot>,

    /// Portable preference state.
    #[serde(default)]
    pub portable: PortableState,

    /// Active companion, if one is equipped.
    #[serde(default)]
    pub companion: Option<ActiveCompanion>,
}

/// One inbound occurrence to react to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Opaque unique identifier, assigned by the dispatch caller.
    pub id: String,

    /// Open-ended type tag (e.g. `"session.start"`, `"game.complete"`);
    /// agents pattern-match on it.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Capability-gating scope.
    pub scope: EventScope,

    /// Instant the event occurred. All downstream time math uses this.
    pub timestamp: DateTime<Utc>,

    /// Event-type-specific key/value payload.
    #[serde(default)]
    pub payload: Map<String, Value>,

    /// Transport metadata.
    #[serde(default)]
    pub meta: EventMeta,

    /// Caller-assembled context snapshot.
    #[serde(default)]
    pub context: EventContext,
}

impl Event {
    /// Convenience constructor: fresh UUID v4 id and the current UTC time.
    pub fn new(event_type: impl Into<String>, scope: EventScope) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            scope,
            timestamp: Utc::now(),
            payload: Map::new(),
            meta: EventMeta::default(),
            context: EventContext::default(),
        }
    }

    /// Set the timestamp (builder style).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the payload (builder style).
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Set the transport metadata (builder style).
    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Set the context snapshot (builder style).
    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }

    /// Read a string payload key defensively. Absence or a non-string
    /// value returns `None`, never an error.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Read an integer payload key defensively, clamped to `>= 0`.
    pub fn payload_u64(&self, key: &str) -> Option<u64> {
        self.payload
            .get(key)
            .and_then(Value::as_i64)
            .map(|n| n.max(0) as u64)
    }

    /// Read an object payload key defensively.
    pub fn payload_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.payload.get(key).and_then(Value::as_object)
    }

    /// The user id, falling back to the session id, falling back to `"anon"`.
    /// Used as a seed component and throttle key.
    pub fn actor_key(&self) -> &str {
        self.meta
            .user_id
            .as_deref()
            .or(self.meta.session_id.as_deref())
            .unwrap_or("anon")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_serde_lowercase() {
        assert_eq!(serde_json::to_string(&EventScope::App).unwrap(), "\"app\"");
        let s: EventScope = serde_json::from_str("\"game\"").unwrap();
        assert_eq!(s, EventScope::Game);
    }

    #[test]
    fn test_payload_readers_are_defensive() {
        let mut payload = Map::new();
        payload.insert("name".into(), json!("nova"));
        payload.insert("count".into(), json!(-3));
        payload.insert("nested".into(), json!({"a": 1}));
        let event = Event::new("game.complete", EventScope::Game).with_payload(payload);

        assert_eq!(event.payload_str("name"), Some("nova"));
        assert_eq!(event.payload_str("count"), None);
        assert_eq!(event.payload_u64("count"), Some(0));
        assert_eq!(event.payload_u64("missing"), None);
        assert!(event.payload_object("nested").is_some());
        assert!(event.payload_object("name").is_none());
    }

    #[test]
    fn test_actor_key_fallback_chain() {
        let mut event = Event::new("session.start", EventScope::App);
        assert_eq!(event.actor_key(), "anon");
        event.meta.session_id = Some("s-1".into());
        assert_eq!(event.actor_key(), "s-1");
        event.meta.user_id = Some("u-1".into());
        assert_eq!(event.actor_key(), "u-1");
    }

    #[test]
    fn test_event_roundtrip() {
        let event = Event::new("companion.swap", EventScope::Companion);
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.event_type, "companion.swap");
        assert_eq!(decoded.scope, EventScope::Companion);
        assert_eq!(decoded.id, event.id);
    }
}
