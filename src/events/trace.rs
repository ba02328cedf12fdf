//! Per-agent results and the per-dispatch trace.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agents::AgentId;
use crate::events::Event;

/// Machine reason recorded when an agent is skipped by the capability gate.
pub const REASON_GATE_SKIPPED: &str = "caps_exceeded_or_scope_mismatch";

/// Outcome of one agent's look at one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    /// Which agent produced this result.
    pub agent_id: AgentId,

    /// Whether the agent produced a meaningful decision (as opposed to
    /// being skipped by capability gating).
    pub handled: bool,

    /// Veto signal. Only the safety agent sets this in practice, but it is
    /// not structurally restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto: Option<bool>,

    /// Short machine code or human-readable veto reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Opaque output map: reaction text, mood signal, whisper payload, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
}

impl AgentResult {
    /// A plain handled acknowledgment with no veto and no output.
    pub fn acknowledged(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            handled: true,
            veto: None,
            reason: None,
            output: None,
        }
    }

    /// A handled result carrying an output map.
    pub fn with_output(agent_id: AgentId, output: Map<String, Value>) -> Self {
        Self {
            agent_id,
            handled: true,
            veto: None,
            reason: None,
            output: Some(output),
        }
    }

    /// The gate-skip result appended when an agent is ineligible.
    pub fn gate_skipped(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            handled: false,
            veto: None,
            reason: Some(REASON_GATE_SKIPPED.to_string()),
            output: None,
        }
    }

    /// A veto result with a human-readable reason.
    pub fn veto(agent_id: AgentId, reason: impl Into<String>) -> Self {
        Self {
            agent_id,
            handled: true,
            veto: Some(true),
            reason: Some(reason.into()),
            output: None,
        }
    }

    /// Whether this result carries an active veto.
    pub fn is_veto(&self) -> bool {
        self.veto == Some(true)
    }
}

/// The full record of one dispatch call: the event, one result per
/// invoked-or-skipped agent, and the veto outcome.
///
/// Constructed fresh per call and never mutated after return; the caller
/// consumes it immediately (optionally persisting it for debugging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchTrace {
    /// The dispatched event.
    pub event: Event,

    /// Ordered agent results: safety first (if present), then the
    /// remaining agents in registry order.
    pub results: Vec<AgentResult>,

    /// Whether the safety agent halted the dispatch.
    pub vetoed: bool,

    /// Human-readable veto reason, when vetoed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto_reason: Option<String>,
}

impl DispatchTrace {
    /// Look up the result for a specific agent, if present.
    pub fn result_for(&self, agent_id: AgentId) -> Option<&AgentResult> {
        self.results.iter().find(|r| r.agent_id == agent_id)
    }
}
