//! Companion agent — composes at most one reaction line per event.
//!
//! Reaction text comes from the budget-gated generation call when the
//! event classifies for one, otherwise from fixed-shape templates filled
//! with deterministically picked vocabulary slots. Repeated dispatch of an
//! identical event always yields the same words.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Map, Value};

use super::{Agent, AgentId};
use crate::capabilities::Capability;
use crate::events::{AgentResult, Event, EventScope};
use crate::generation::{classify_intensity, GenerationGate};
use crate::persona::{resolve_tone, vocabulary_for, Tone};
use crate::selector::{percent_gate, seeded_index, RecencyThrottle};

/// How long the UI may keep a reaction on screen.
const DEFAULT_TTL_MS: u64 = 8_000;

/// Cooldown between pre-run flavor lines for one user, independent of the
/// capability gate's own cooldown.
const PRERUN_COOLDOWN_SECS: i64 = 90;

/// Chance that an eligible game launch gets a flavor line at all.
const PRERUN_CHANCE_PERCENT: i32 = 35;

/// Ceiling applied when extracting reward integers from payloads.
const REWARD_CLAMP_MAX: i64 = 99_999;

/// The reaction composer.
pub struct CompanionAgent {
    caps: Capability,
    gate: Arc<GenerationGate>,
    prerun_throttle: RecencyThrottle,
    prerun_chance: i32,
}

impl CompanionAgent {
    pub fn new(gate: Arc<GenerationGate>) -> Self {
        Self::with_prerun_tuning(gate, PRERUN_CHANCE_PERCENT, PRERUN_COOLDOWN_SECS)
    }

    /// Override the pre-run gate tuning (chance percent and cooldown).
    pub fn with_prerun_tuning(
        gate: Arc<GenerationGate>,
        chance_percent: i32,
        cooldown_secs: i64,
    ) -> Self {
        Self {
            caps: Capability {
                max_tokens: 2048,
                min_interval_ms: 1500,
                allowed_scopes: HashSet::from([
                    EventScope::App,
                    EventScope::Companion,
                    EventScope::Game,
                ]),
            },
            gate,
            prerun_throttle: RecencyThrottle::new(Duration::seconds(cooldown_secs)),
            prerun_chance: chance_percent,
        }
    }

    fn suppressed(&self, event: &Event) -> bool {
        !event.context.portable.reactions_enabled
            || event.meta.suppress_reactions
            || event
                .payload
                .get("suppress")
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    fn mood_label(&self, event: &Event) -> String {
        event
            .context
            .world
            .as_ref()
            .map(|w| w.effective_mood().to_string())
            .unwrap_or_else(|| "steady".to_string())
    }

    /// Deterministic slot pick, seeded so identical events repeat the same
    /// choice and different slots vary independently.
    fn pick<'a>(&self, event: &Event, slot: &str, options: &'a [String]) -> &'a str {
        let seed = format!(
            "{}|{}|{}|{}",
            event.timestamp.timestamp_millis(),
            event.actor_key(),
            event.event_type,
            slot
        );
        &options[seeded_index(&seed, options.len())]
    }

    fn pick_shape(&self, event: &Event, candidates: Vec<String>) -> String {
        let seed = format!(
            "{}|{}|{}|shape",
            event.timestamp.timestamp_millis(),
            event.actor_key(),
            event.event_type
        );
        let index = seeded_index(&seed, candidates.len());
        candidates.into_iter().nth(index).unwrap_or_default()
    }

    async fn try_generate(&self, event: &Event) -> Option<String> {
        let intensity = classify_intensity(event)?;
        self.gate.generate(event, intensity).await
    }

    fn reaction(&self, event: &Event, text: String, kind: &str) -> AgentResult {
        let mut output = Map::new();
        output.insert(
            "reaction".into(),
            json!({ "text": text, "kind": kind, "ttlMs": DEFAULT_TTL_MS }),
        );
        output.insert("mood".into(), json!(self.mood_label(event)));
        AgentResult::with_output(AgentId::Companion, output)
    }

    fn no_reaction(&self, event: &Event) -> AgentResult {
        let mut output = Map::new();
        output.insert("mood".into(), json!(self.mood_label(event)));
        output.insert("note".into(), json!("No reaction text generated."));
        AgentResult::with_output(AgentId::Companion, output)
    }

    async fn react_session_start(&self, event: &Event) -> AgentResult {
        if let Some(text) = self.try_generate(event).await {
            return self.reaction(event, text, "greeting");
        }

        let tone = resolve_tone(&event.context);
        let vocab = vocabulary_for(tone);
        let greeting = self.pick(event, "greeting", &vocab.greetings);
        let focus = self.pick(event, "focus_cue", &vocab.focus_cues);
        let closer = self.pick(event, "closer", &vocab.closers);

        let candidates = match tone {
            Tone::Warm => vec![
                format!("{greeting}. {closer}."),
                format!("{greeting}. {focus}."),
                format!("{greeting}. {focus}. {closer}."),
            ],
            Tone::Direct => vec![
                format!("{greeting}. {focus}."),
                format!("{greeting}."),
                format!("{greeting}. {closer}."),
            ],
        };
        self.reaction(event, self.pick_shape(event, candidates), "greeting")
    }

    async fn react_game_complete(&self, event: &Event) -> AgentResult {
        // A payload without a structured rewards object is non-canonical:
        // acknowledge instead of guessing reward text.
        let Some(rewards) = event.payload_object("rewardsGranted") else {
            return self.no_reaction(event);
        };
        let summary = reward_summary(rewards);

        if let Some(text) = self.try_generate(event).await {
            return self.reaction(event, text, "reward");
        }

        let vocab = vocabulary_for(resolve_tone(&event.context));
        let affirmation = self.pick(event, "affirmation", &vocab.affirmations);
        let closer = self.pick(event, "closer", &vocab.closers);

        let candidates = vec![
            format!("{affirmation}. {summary}."),
            format!("{summary}. {affirmation}."),
            format!("{affirmation}. {summary}. {closer}."),
        ];
        self.reaction(event, self.pick_shape(event, candidates), "reward")
    }

    async fn react_mission_complete(&self, event: &Event) -> AgentResult {
        if let Some(text) = self.try_generate(event).await {
            return self.reaction(event, text, "reward");
        }

        let vocab = vocabulary_for(resolve_tone(&event.context));
        let affirmation = self.pick(event, "affirmation", &vocab.affirmations);
        let closer = self.pick(event, "closer", &vocab.closers);

        let candidates = match event.payload_object("rewardsGranted").map(reward_summary) {
            Some(summary) => vec![
                format!("Mission clear. {summary}."),
                format!("{affirmation}. {summary}."),
            ],
            None => vec![
                format!("Mission clear. {affirmation}."),
                format!("{affirmation}. {closer}."),
            ],
        };
        self.reaction(event, self.pick_shape(event, candidates), "reward")
    }

    async fn react_companion_swap(&self, event: &Event) -> AgentResult {
        if let Some(text) = self.try_generate(event).await {
            return self.reaction(event, text, "swap");
        }

        let name = event
            .payload_str("companionName")
            .map(str::to_string)
            .or_else(|| event.context.companion.as_ref().map(|c| c.name.clone()))
            .unwrap_or_else(|| "Your companion".to_string());

        let vocab = vocabulary_for(resolve_tone(&event.context));
        let focus = self.pick(event, "focus_cue", &vocab.focus_cues);
        let closer = self.pick(event, "closer", &vocab.closers);

        let candidates = vec![
            format!("{name} is with you now. {closer}."),
            format!("{name} here. {focus}."),
            format!("Say hi to {name}. {closer}."),
        ];
        self.reaction(event, self.pick_shape(event, candidates), "swap")
    }

    /// Pre-run flavor for rapid game launches: a seeded probabilistic gate
    /// first (pure, consumes nothing), then the recency throttle.
    fn react_game_prerun(&self, event: &Event) -> AgentResult {
        let game = event.payload_str("gameId").unwrap_or("game");
        let seed = format!(
            "{}|{}|{}",
            event.timestamp.timestamp_millis(),
            event.meta.session_id.as_deref().unwrap_or_else(|| event.actor_key()),
            game
        );
        if !percent_gate(&seed, self.prerun_chance) {
            return self.no_reaction(event);
        }
        if !self.prerun_throttle.try_fire(event.actor_key(), event.timestamp) {
            return self.no_reaction(event);
        }

        let vocab = vocabulary_for(resolve_tone(&event.context));
        let greeting = self.pick(event, "greeting", &vocab.greetings);
        let focus = self.pick(event, "focus_cue", &vocab.focus_cues);

        let candidates = vec![format!("{focus}."), format!("{greeting}. {focus}.")];
        self.reaction(event, self.pick_shape(event, candidates), "flavor")
    }

    fn ack_session_end(&self, event: &Event) -> AgentResult {
        let mut output = Map::new();
        output.insert("mood".into(), json!(self.mood_label(event)));
        output.insert("ack".into(), json!("session_closed"));
        AgentResult::with_output(AgentId::Companion, output)
    }
}

#[async_trait]
impl Agent for CompanionAgent {
    fn id(&self) -> AgentId {
        AgentId::Companion
    }

    fn capability(&self) -> &Capability {
        &self.caps
    }

    async fn handle(&self, event: &Event) -> Result<AgentResult> {
        if self.suppressed(event) {
            let mut output = Map::new();
            output.insert("suppressed".into(), json!(true));
            output.insert("mood".into(), json!("steady"));
            return Ok(AgentResult::with_output(AgentId::Companion, output));
        }

        let result = match event.event_type.as_str() {
            "session.start" => self.react_session_start(event).await,
            // Session close never produces visible text, only an
            // internal acknowledgment.
            "session.end" => self.ack_session_end(event),
            "game.session.start" => self.react_game_prerun(event),
            "game.complete" => self.react_game_complete(event).await,
            "mission.complete" => self.react_mission_complete(event).await,
            "companion.swap" => self.react_companion_swap(event).await,
            _ => self.no_reaction(event),
        };
        Ok(result)
    }
}

/// Reward summary with clamped-integer extraction and conditional
/// phrasing, driven by which of XP/shards are positive.
fn reward_summary(rewards: &Map<String, Value>) -> String {
    let xp = clamped_reward(rewards, "xpGained");
    let shards = clamped_reward(rewards, "shardsGained");
    match (xp > 0, shards > 0) {
        (true, true) => format!("+{xp} XP, +{shards} shards"),
        (true, false) => format!("+{xp} XP"),
        (false, true) => format!("+{shards} shards"),
        (false, false) => "no bonus rewards".to_string(),
    }
}

fn clamped_reward(rewards: &Map<String, Value>, key: &str) -> i64 {
    rewards
        .get(key)
        .and_then(Value::as_i64)
        .unwrap_or(0)
        .clamp(0, REWARD_CLAMP_MAX)
}
