//! Persisted world/mood state and its session-boundary state machine.
//!
//! The snapshot is mutated only through the pure functions in [`drift`];
//! the caller is responsible for persisting whatever comes back. Whisper
//! selection lives in [`whisper`].

pub mod drift;
pub mod state;
pub mod whisper;

pub use drift::{apply_end_update, apply_start_drift, day_gap_utc};
pub use state::{Mood, WorldSnapshot};
pub use whisper::{maybe_whisper, Whisper, WhisperScenario};
