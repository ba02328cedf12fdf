//! Agents — capability-gated event handlers.
//!
//! The agent set is closed: safety, companion, world. The dispatcher's
//! veto-first behavior depends on safety being structurally distinguished
//! in the [`AgentRegistry`], not merely a registration convention.
//!
//! Handlers follow the hard-fail contract: a genuine bug propagates as an
//! error out of [`Agent::handle`] rather than being swallowed. The many
//! intentional soft paths (gate skips, suppression, generation fallbacks)
//! are expressed as ordinary `AgentResult`s instead.

pub mod companion;
pub mod registry;
pub mod safety;
pub mod world;

pub use companion::CompanionAgent;
pub use registry::AgentRegistry;
pub use safety::SafetyAgent;
pub use world::WorldAgent;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capabilities::Capability;
use crate::events::{AgentResult, Event};

/// Closed agent identifier set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentId {
    Safety,
    Companion,
    World,
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentId::Safety => "safety",
            AgentId::Companion => "companion",
            AgentId::World => "world",
        };
        write!(f, "{s}")
    }
}

/// The event-handling contract every agent implements.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier, one of the closed set.
    fn id(&self) -> AgentId;

    /// Declarative limits consumed by the capability gate.
    fn capability(&self) -> &Capability;

    /// React to one event. Errors propagate to the dispatch caller.
    async fn handle(&self, event: &Event) -> Result<AgentResult>;
}
