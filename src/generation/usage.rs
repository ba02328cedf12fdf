//! Usage/quota log collaborator.
//!
//! Append-only record of generation calls, queried by count for the daily
//! peak cap. The check-then-log pattern is not atomic: under concurrent
//! requests a user can exceed the nominal cap by one. Accepted soft limit;
//! a store with an atomic increment can implement this trait if that ever
//! changes.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::Intensity;

/// One logged generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: Option<String>,
    pub intensity: Intensity,
    pub model: String,
    pub output_chars: usize,
    pub timestamp: DateTime<Utc>,
}

/// Append-only usage log.
pub trait UsageLog: Send + Sync {
    /// Append one record.
    fn record(&self, record: UsageRecord);

    /// Count peak-intensity generations already logged for this user on
    /// the given UTC day.
    fn peak_count_for_day(&self, user_id: &str, day: NaiveDate) -> u32;
}

/// Process-local usage log. Suitable for tests and single-process
/// deployments.
#[derive(Debug, Default)]
pub struct InMemoryUsageLog {
    records: Mutex<Vec<UsageRecord>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }
}

impl UsageLog for InMemoryUsageLog {
    fn record(&self, record: UsageRecord) {
        self.records.lock().push(record);
    }

    fn peak_count_for_day(&self, user_id: &str, day: NaiveDate) -> u32 {
        self.records
            .lock()
            .iter()
            .filter(|r| {
                r.intensity == Intensity::Peak
                    && r.user_id.as_deref() == Some(user_id)
                    && r.timestamp.date_naive() == day
            })
            .count() as u32
    }
}
