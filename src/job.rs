use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A schedulable unit of work as the store sees it.
///
/// The scheduler owns the meaning of `state`; the store persists it verbatim
/// and only ever interprets `id` and `next_run_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Caller-chosen identifier, unique within the store, immutable once
    /// created.
    pub id: String,
    /// When the job is next due, in UTC. `None` means paused.
    pub next_run_time: Option<DateTime<Utc>>,
    /// Opaque scheduler-internal state (trigger, callable reference,
    /// arguments).
    pub state: Vec<u8>,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        next_run_time: Option<DateTime<Utc>>,
        state: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            next_run_time,
            state,
        }
    }
}
