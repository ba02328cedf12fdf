//! Safety agent — the veto gate in front of everything else.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;

use super::{Agent, AgentId};
use crate::capabilities::Capability;
use crate::events::{AgentResult, Event, EventScope};

/// Event type that triggers a veto.
const UNSAFE_ACTION: &str = "unsafe_action";

/// Stateless veto agent. Runs before every other agent, so its capability
/// profile has the smallest interval, the smallest budget, and the
/// broadest scope set of all agents.
#[derive(Debug)]
pub struct SafetyAgent {
    caps: Capability,
}

impl SafetyAgent {
    pub fn new() -> Self {
        Self {
            caps: Capability {
                max_tokens: 512,
                min_interval_ms: 0,
                allowed_scopes: HashSet::from(EventScope::ALL),
            },
        }
    }

    pub fn with_capability(caps: Capability) -> Self {
        Self { caps }
    }
}

impl Default for SafetyAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for SafetyAgent {
    fn id(&self) -> AgentId {
        AgentId::Safety
    }

    fn capability(&self) -> &Capability {
        &self.caps
    }

    async fn handle(&self, event: &Event) -> Result<AgentResult> {
        if event.event_type == UNSAFE_ACTION {
            let action = event.payload_str("action").unwrap_or("this action");
            return Ok(AgentResult::veto(
                AgentId::Safety,
                format!("Blocked {action}: flagged as unsafe."),
            ));
        }
        Ok(AgentResult::acknowledged(AgentId::Safety))
    }
}
