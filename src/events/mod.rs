//! Event model for the dispatch engine.
//!
//! An [`Event`] is one inbound lifecycle occurrence (session boundary, game
//! completion, companion swap, ...) assembled by the caller together with a
//! read-only context snapshot. Agents react to events and their results are
//! collected into a [`DispatchTrace`].

pub mod event;
pub mod trace;

pub use event::{ActiveCompanion, Event, EventContext, EventMeta, EventScope, PortableState};
pub use trace::{AgentResult, DispatchTrace, REASON_GATE_SKIPPED};
