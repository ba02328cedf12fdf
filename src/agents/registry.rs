//! Agent registry with a structurally distinguished safety slot.
//!
//! The dispatcher needs safety to be a separate case, not a registration
//! convention, so the registry holds one fixed slot per agent id. Callers
//! may leave any slot empty; a missing safety agent simply skips the veto
//! stage.

use std::sync::Arc;

use super::{Agent, AgentId, CompanionAgent, SafetyAgent, WorldAgent};
use crate::generation::GenerationGate;

/// Fixed-slot registry over the closed agent id set.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    safety: Option<Arc<dyn Agent>>,
    companion: Option<Arc<dyn Agent>>,
    world: Option<Arc<dyn Agent>>,
}

impl AgentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard production registry: safety, companion (sharing the
    /// given generation gate), and world.
    pub fn standard(gate: Arc<GenerationGate>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SafetyAgent::new()));
        registry.register(Arc::new(CompanionAgent::new(gate)));
        registry.register(Arc::new(WorldAgent::new()));
        registry
    }

    /// Place an agent into its slot, replacing any previous occupant.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        match agent.id() {
            AgentId::Safety => self.safety = Some(agent),
            AgentId::Companion => self.companion = Some(agent),
            AgentId::World => self.world = Some(agent),
        }
    }

    /// The safety agent, if registered.
    pub fn safety(&self) -> Option<&Arc<dyn Agent>> {
        self.safety.as_ref()
    }

    /// Every non-safety agent in registry order (companion, then world).
    /// Order carries no semantics beyond safety-first; agents must not
    /// depend on sibling ordering.
    pub fn others(&self) -> impl Iterator<Item = &Arc<dyn Agent>> {
        self.companion.iter().chain(self.world.iter())
    }

    /// Look up any slot by id.
    pub fn get(&self, id: AgentId) -> Option<&Arc<dyn Agent>> {
        match id {
            AgentId::Safety => self.safety.as_ref(),
            AgentId::Companion => self.companion.as_ref(),
            AgentId::World => self.world.as_ref(),
        }
    }

    /// Whether no agents are registered at all.
    pub fn is_empty(&self) -> bool {
        self.safety.is_none() && self.companion.is_none() && self.world.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationConfig, InMemoryUsageLog};

    fn gate() -> Arc<GenerationGate> {
        Arc::new(GenerationGate::new(
            GenerationConfig::disabled(),
            Arc::new(InMemoryUsageLog::new()),
        ))
    }

    #[test]
    fn test_standard_registry_fills_all_slots() {
        let registry = AgentRegistry::standard(gate());
        assert!(registry.safety().is_some());
        assert_eq!(registry.others().count(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_others_orders_companion_before_world() {
        let registry = AgentRegistry::standard(gate());
        let ids: Vec<AgentId> = registry.others().map(|a| a.id()).collect();
        assert_eq!(ids, vec![AgentId::Companion, AgentId::World]);
    }

    #[test]
    fn test_register_replaces_slot() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(SafetyAgent::new()));
        registry.register(Arc::new(SafetyAgent::new()));
        assert!(registry.safety().is_some());
        assert_eq!(registry.others().count(), 0);
    }

    #[test]
    fn test_missing_safety_is_allowed() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(WorldAgent::new()));
        assert!(registry.safety().is_none());
        assert_eq!(registry.others().count(), 1);
    }
}
