//! The dispatcher — one event in, one trace out.
//!
//! Safety resolves fully (including its potential veto) before any other
//! agent is even gate-checked. Agent handler errors are not caught here: a
//! misbehaving agent fails the whole dispatch loudly, while intentional
//! soft paths surface as ordinary results.

use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::agents::{Agent, AgentId, AgentRegistry};
use crate::capabilities::is_eligible;
use crate::events::{AgentResult, DispatchTrace, Event};

/// Injected per-process dispatch state: the per-agent last-run map.
///
/// Shared across all dispatches handled by a process, with no locking
/// beyond the map's own sharding. Concurrent dispatches for the same user
/// may occasionally both pass a cooldown check; these are soft anti-spam
/// throttles, not correctness locks.
#[derive(Debug, Default)]
pub struct DispatchState {
    last_run: DashMap<AgentId, DateTime<Utc>>,
}

impl DispatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last successful invocation instant for an agent, if any.
    pub fn last_run(&self, id: AgentId) -> Option<DateTime<Utc>> {
        self.last_run.get(&id).map(|entry| *entry)
    }

    /// Record a successful invocation. Skipped-due-to-gate invocations
    /// must not go through here — they do not consume the cooldown window.
    pub fn stamp(&self, id: AgentId, at: DateTime<Utc>) {
        self.last_run.insert(id, at);
    }

    /// Forget all recorded runs (test isolation).
    pub fn clear(&self) {
        self.last_run.clear();
    }
}

/// Dispatch one event through the registry, returning the ordered trace.
pub async fn dispatch(
    event: &Event,
    registry: &AgentRegistry,
    state: &DispatchState,
) -> Result<DispatchTrace> {
    let now = event.timestamp;
    let mut results: Vec<AgentResult> = Vec::new();

    if let Some(safety) = registry.safety() {
        match run_gated(safety, event, now, state).await? {
            Invocation::Ran(result) if result.is_veto() => {
                let reason = result
                    .reason
                    .clone()
                    .unwrap_or_else(|| "vetoed".to_string());
                log::warn!("event {} vetoed: {reason}", event.id);
                return Ok(DispatchTrace {
                    event: event.clone(),
                    results: vec![result],
                    vetoed: true,
                    veto_reason: Some(reason),
                });
            }
            Invocation::Ran(result) => results.push(result),
            Invocation::Skipped(result) => results.push(result),
        }
    }

    for agent in registry.others() {
        match run_gated(agent, event, now, state).await? {
            Invocation::Ran(result) | Invocation::Skipped(result) => results.push(result),
        }
    }

    Ok(DispatchTrace {
        event: event.clone(),
        results,
        vetoed: false,
        veto_reason: None,
    })
}

enum Invocation {
    Ran(AgentResult),
    Skipped(AgentResult),
}

/// Gate-check one agent and invoke it when eligible. Only a successful,
/// eligible invocation stamps the cooldown timestamp.
async fn run_gated(
    agent: &Arc<dyn Agent>,
    event: &Event,
    now: DateTime<Utc>,
    state: &DispatchState,
) -> Result<Invocation> {
    let id = agent.id();
    if !is_eligible(agent.capability(), event, now, state.last_run(id)) {
        log::debug!("agent {id} skipped for event {}", event.id);
        return Ok(Invocation::Skipped(AgentResult::gate_skipped(id)));
    }

    let result = agent.handle(event).await?;
    state.stamp(id, now);
    Ok(Invocation::Ran(result))
}
