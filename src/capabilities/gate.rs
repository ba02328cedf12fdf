//! Eligibility gate evaluated before each agent invocation.

use chrono::{DateTime, Utc};

use super::capability::{estimate_payload_tokens, Capability};
use crate::events::Event;

/// Check whether an agent may run for this event. Three independent
/// checks, all of which must pass:
///
/// 1. scope membership,
/// 2. cooldown elapsed since the agent's last successful run,
/// 3. payload token estimate within the agent's budget.
///
/// `now` comes from the event timestamp, not the wall clock.
pub fn is_eligible(
    caps: &Capability,
    event: &Event,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
) -> bool {
    if !caps.allows_scope(event.scope) {
        return false;
    }

    if let Some(last) = last_run {
        let elapsed_ms = now.signed_duration_since(last).num_milliseconds();
        if elapsed_ms < caps.min_interval_ms {
            log::debug!(
                "agent cooldown active: {}ms elapsed, {}ms required",
                elapsed_ms,
                caps.min_interval_ms
            );
            return false;
        }
    }

    estimate_payload_tokens(&event.payload) <= caps.max_tokens
}
