//! Event dispatch: safety-first veto, capability gating, trace assembly.

pub mod dispatcher;

pub use dispatcher::{dispatch, DispatchState};
