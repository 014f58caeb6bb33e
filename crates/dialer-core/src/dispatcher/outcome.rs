//! Explicit result of one dispatch attempt.

use chrono::{DateTime, Utc};

/// What `process_message` did with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The provider accepted the call.
    Dispatched { call_id: String },
    /// Entry went back to pending, due again at `at`.
    Requeue { at: DateTime<Utc>, reason: String },
    /// Entry is permanently failed.
    Failed { reason: String },
    /// Entry was not touched (claimed elsewhere, job gone or a store read failed).
    Skipped,
}

/// Outcome counts for one `process_batch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub dispatched: usize,
    pub requeued: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Dispatched { .. } => self.dispatched += 1,
            DispatchOutcome::Requeue { .. } => self.requeued += 1,
            DispatchOutcome::Failed { .. } => self.failed += 1,
            DispatchOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.dispatched + self.requeued + self.failed + self.skipped
    }
}

/// Result of `enqueue_job_batch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    pub enqueued: usize,
    pub failed: usize,
}
