//! World agent — drives the persisted mood/streak state machine at
//! session boundaries and surfaces whispers.
//!
//! The agent returns new snapshots in its output; the caller persists
//! them. It never writes storage itself.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{Agent, AgentId};
use crate::capabilities::Capability;
use crate::events::{AgentResult, Event, EventScope};
use crate::world::{apply_end_update, apply_start_drift, maybe_whisper, WorldSnapshot};

#[derive(Debug)]
pub struct WorldAgent {
    caps: Capability,
}

impl WorldAgent {
    pub fn new() -> Self {
        Self {
            caps: Capability {
                max_tokens: 1024,
                min_interval_ms: 500,
                allowed_scopes: HashSet::from([EventScope::App, EventScope::World]),
            },
        }
    }

    pub fn with_capability(caps: Capability) -> Self {
        Self { caps }
    }

    fn snapshot_output(snapshot: &WorldSnapshot) -> Map<String, Value> {
        let mut output = Map::new();
        output.insert(
            "worldState".into(),
            serde_json::to_value(snapshot).unwrap_or(Value::Null),
        );
        output.insert("mood".into(), json!(snapshot.effective_mood().to_string()));
        output.insert("streakDays".into(), json!(snapshot.streak_days));
        output
    }

    fn on_session_start(&self, event: &Event) -> AgentResult {
        let prev = event.context.world.clone().unwrap_or_default();
        let mut next = apply_start_drift(&prev, event.timestamp);

        let whisper = if event.meta.suppress_reactions {
            None
        } else {
            maybe_whisper(&prev, &next, event.timestamp)
        };
        if whisper.is_some() {
            next.last_whisper_at = Some(event.timestamp);
            next.last_whisper_streak = next.streak_days;
        }

        let mut output = Self::snapshot_output(&next);
        if let Some(w) = whisper {
            output.insert(
                "whisper".into(),
                json!({ "text": w.text, "scenario": w.scenario.to_string() }),
            );
        }
        AgentResult::with_output(AgentId::World, output)
    }

    fn on_session_end(&self, event: &Event) -> AgentResult {
        let prev = event.context.world.clone().unwrap_or_default();
        let pages = event.payload_u64("pagesVisited").unwrap_or(0).min(u32::MAX as u64) as u32;
        let games = event.payload_u64("gamesPlayed").unwrap_or(0).min(u32::MAX as u64) as u32;
        let next = apply_end_update(&prev, event.timestamp, pages, games);
        AgentResult::with_output(AgentId::World, Self::snapshot_output(&next))
    }
}

impl Default for WorldAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for WorldAgent {
    fn id(&self) -> AgentId {
        AgentId::World
    }

    fn capability(&self) -> &Capability {
        &self.caps
    }

    async fn handle(&self, event: &Event) -> Result<AgentResult> {
        if event.meta.suppress_adaptation {
            let mut output = Map::new();
            output.insert("adaptation".into(), json!("suppressed"));
            return Ok(AgentResult::with_output(AgentId::World, output));
        }

        let result = match event.event_type.as_str() {
            "session.start" => self.on_session_start(event),
            "session.end" => self.on_session_end(event),
            _ => AgentResult::acknowledged(AgentId::World),
        };
        Ok(result)
    }
}
