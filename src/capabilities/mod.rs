//! Per-agent capability limits and the eligibility gate.
//!
//! A [`Capability`] is a declarative bundle of limits (scope allow-list,
//! token budget, minimum re-invocation interval) consumed by the dispatcher
//! before each agent invocation. Profiles ship as compiled-in defaults and
//! can be overridden from YAML files.

pub mod capability;
pub mod gate;

pub use capability::{estimate_payload_tokens, Capability};
pub use gate::is_eligible;
