//! Capability definition — declarative per-agent limits.
//!
//! Example YAML:
//! ```yaml
//! capability:
//!   max_tokens: 2048
//!   min_interval_ms: 1500
//!   allowed_scopes: [app, companion, game]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::events::EventScope;

/// Declarative limits for one agent. No logic lives here; the dispatcher
/// evaluates these through [`super::gate::is_eligible`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Token budget ceiling for the event payload. A coarse proxy for
    /// payload size, not a real tokenizer count.
    pub max_tokens: u32,

    /// Minimum wall-time between successful invocations of this agent.
    pub min_interval_ms: i64,

    /// Scopes this agent may run for.
    pub allowed_scopes: HashSet<EventScope>,
}

impl Capability {
    /// Parse a capability from a YAML string (nested under a
    /// `capability:` key).
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let wrapper: CapabilityWrapper = serde_yaml::from_str(yaml)?;
        Ok(wrapper.capability)
    }

    /// Parse a capability from a YAML file path.
    pub fn from_yaml_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let cap = Self::from_yaml(&content)?;
        Ok(cap)
    }

    /// Whether this capability allows the given scope.
    pub fn allows_scope(&self, scope: EventScope) -> bool {
        self.allowed_scopes.contains(&scope)
    }
}

/// Wrapper for YAML deserialization (capability is nested under a
/// `capability:` key).
#[derive(Debug, Deserialize)]
struct CapabilityWrapper {
    capability: Capability,
}

/// Cheap size estimate of an event payload in tokens: serialized length
/// divided by 4, rounded up. An empty or non-serializable payload
/// estimates to 0 and always passes the budget check — this is a soft,
/// best-effort gate, not a security boundary.
pub fn estimate_payload_tokens(payload: &Map<String, Value>) -> u32 {
    if payload.is_empty() {
        return 0;
    }
    match serde_json::to_string(payload) {
        Ok(text) => text.len().div_ceil(4) as u32,
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_capability_yaml() {
        let yaml = r#"
capability:
  max_tokens: 2048
  min_interval_ms: 1500
  allowed_scopes:
    - app
    - companion
    - game
"#;
        let cap = Capability::from_yaml(yaml).unwrap();
        assert_eq!(cap.max_tokens, 2048);
        assert_eq!(cap.min_interval_ms, 1500);
        assert!(cap.allows_scope(EventScope::Game));
        assert!(!cap.allows_scope(EventScope::System));
    }

    #[test]
    fn test_from_yaml_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "capability:\n  max_tokens: 64\n  min_interval_ms: 0\n  allowed_scopes: [system]\n"
        )
        .unwrap();
        let cap = Capability::from_yaml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cap.max_tokens, 64);
        assert!(cap.allows_scope(EventScope::System));
    }

    #[test]
    fn test_empty_payload_estimates_zero() {
        assert_eq!(estimate_payload_tokens(&Map::new()), 0);
    }

    #[test]
    fn test_estimate_rounds_up() {
        let mut payload = Map::new();
        payload.insert("k".into(), json!("v"));
        // {"k":"v"} is 9 chars -> ceil(9 / 4) = 3 tokens.
        assert_eq!(estimate_payload_tokens(&payload), 3);
    }
}
