//! # companion-engine
//!
//! Event dispatch and adaptive companion reaction engine.
//!
//! One inbound lifecycle event is routed through capability-gated agents:
//! safety first with short-circuit veto, then the companion reaction
//! composer and the world mood state machine. Reaction text is produced
//! either deterministically (templated, seeded pseudo-random selection) or
//! via a budget-gated external generation call with strict fallback. The
//! caller persists world-state boundary changes and forwards reaction text
//! to the UI layer; this crate never touches storage or the screen.

pub mod agents;
pub mod capabilities;
pub mod dispatch;
pub mod events;
pub mod generation;
pub mod persona;
pub mod selector;
pub mod world;

pub use agents::{Agent, AgentId, AgentRegistry, CompanionAgent, SafetyAgent, WorldAgent};
pub use capabilities::{is_eligible, Capability};
pub use dispatch::{dispatch, DispatchState};
pub use events::{AgentResult, DispatchTrace, Event, EventContext, EventMeta, EventScope};
pub use generation::{
    classify_intensity, GenerationConfig, GenerationGate, InMemoryUsageLog, Intensity, UsageLog,
};
pub use world::{apply_end_update, apply_start_drift, Mood, WorldSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
