//! Types used by the job / queue-entry store.

use chrono::{DateTime, Utc};

use crate::scheduler::TimeWindowConfig;

/// Job identifier.
pub type JobId = i64;

/// Queue entry identifier.
pub type EntryId = i64;

/// High-level job state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "paused" => JobStatus::Paused,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    /// Entries of jobs in these states may be dialed.
    pub fn is_dialable(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

/// State of one dial attempt unit.
///
/// `Dispatched` means the provider accepted the call; `Confirmed` means the
/// status webhook later reported a non-retryable end. Both count as completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Running,
    Dispatched,
    Confirmed,
    Failed,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Running => "running",
            EntryStatus::Dispatched => "dispatched",
            EntryStatus::Confirmed => "confirmed",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => EntryStatus::Pending,
            "running" => EntryStatus::Running,
            "dispatched" => EntryStatus::Dispatched,
            "confirmed" => EntryStatus::Confirmed,
            _ => EntryStatus::Failed,
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, EntryStatus::Dispatched | EntryStatus::Confirmed)
    }
}

/// Input for `create_job`. Phone numbers and display names are parallel lists;
/// missing display names are stored empty.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub display_names: Vec<String>,
    pub assistant_id: String,
    pub line_ids: Vec<String>,
    pub window: TimeWindowConfig,
    /// Earliest time the job may start; `None` means immediately.
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Full job record.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub phone_numbers: Vec<String>,
    pub display_names: Vec<String>,
    pub assistant_id: String,
    pub line_ids: Vec<String>,
    pub window: TimeWindowConfig,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub total_calls: i64,
    pub completed_calls: i64,
    pub failed_calls: i64,
    /// Numbers rejected before enqueue (malformed); not counted in `failed_calls`.
    pub rejected_calls: i64,
    pub failed_numbers: Vec<String>,
    pub status: JobStatus,
    pub progress: i64,
    pub notes: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Job {
    /// Pair each number with its display name, in list order.
    pub fn targets(&self) -> Vec<(String, String)> {
        self.phone_numbers
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let name = self.display_names.get(i).cloned().unwrap_or_default();
                (n.clone(), name)
            })
            .collect()
    }
}

/// Summary view used by the CLI `status` command.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub total_calls: i64,
    pub completed_calls: i64,
    pub failed_calls: i64,
    pub progress: i64,
}

/// Input for `insert_entry`.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub job_id: JobId,
    pub phone_number: String,
    pub display_name: String,
    pub assistant_id: String,
    pub line_ids: Vec<String>,
    pub priority: i32,
    pub scheduled_at: DateTime<Utc>,
    pub window: TimeWindowConfig,
}

/// One dial-attempt unit belonging to a job.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: EntryId,
    pub job_id: JobId,
    pub phone_number: String,
    pub display_name: String,
    pub assistant_id: String,
    pub line_ids: Vec<String>,
    pub retry_count: u32,
    pub priority: i32,
    pub status: EntryStatus,
    pub scheduled_at: DateTime<Utc>,
    pub delay_secs: i64,
    pub provider_call_id: Option<String>,
    pub line_id: Option<String>,
    pub window: TimeWindowConfig,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Entry counts for one job, grouped by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCounts {
    pub open: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Job counters and status derived from entry states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobAggregates {
    pub completed_calls: i64,
    pub failed_calls: i64,
    pub progress: i64,
    pub status: JobStatus,
}

impl JobAggregates {
    /// Recompute a job's counters from its entries.
    ///
    /// `completed` iff every call completed; `failed` once nothing is left open
    /// and some numbers failed or were rejected; paused jobs stay paused and
    /// a job failed by an operator stays failed.
    pub fn derive(total: i64, rejected: i64, counts: EntryCounts, current: JobStatus) -> Self {
        let progress = if total > 0 {
            ((counts.completed as f64 / total as f64) * 100.0).round() as i64
        } else {
            100
        };
        let resolved = counts.completed + counts.failed + rejected;
        let status = if counts.completed >= total {
            JobStatus::Completed
        } else if counts.open == 0 && resolved >= total {
            JobStatus::Failed
        } else if matches!(current, JobStatus::Paused | JobStatus::Failed) {
            current
        } else if current == JobStatus::Pending && counts.completed + counts.failed == 0 {
            JobStatus::Pending
        } else {
            JobStatus::Running
        };
        Self {
            completed_calls: counts.completed,
            failed_calls: counts.failed,
            progress,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(open: i64, completed: i64, failed: i64) -> EntryCounts {
        EntryCounts {
            open,
            completed,
            failed,
        }
    }

    #[test]
    fn status_strings_roundtrip() {
        for s in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Paused,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_str(s.as_str()), s);
        }
        for s in [
            EntryStatus::Pending,
            EntryStatus::Running,
            EntryStatus::Dispatched,
            EntryStatus::Confirmed,
            EntryStatus::Failed,
        ] {
            assert_eq!(EntryStatus::from_str(s.as_str()), s);
        }
    }

    #[test]
    fn all_completed_means_completed() {
        let a = JobAggregates::derive(3, 0, counts(0, 3, 0), JobStatus::Running);
        assert_eq!(a.status, JobStatus::Completed);
        assert_eq!(a.progress, 100);
    }

    #[test]
    fn progress_rounds() {
        let a = JobAggregates::derive(3, 0, counts(1, 2, 0), JobStatus::Running);
        assert_eq!(a.progress, 67);
        assert_eq!(a.status, JobStatus::Running);
    }

    #[test]
    fn resolved_with_failures_is_failed() {
        let a = JobAggregates::derive(4, 1, counts(0, 2, 1), JobStatus::Running);
        assert_eq!(a.status, JobStatus::Failed);
        assert_eq!(a.failed_calls, 1);
        assert_eq!(a.progress, 50);
    }

    #[test]
    fn pending_and_paused_are_kept_while_open() {
        let a = JobAggregates::derive(2, 0, counts(2, 0, 0), JobStatus::Pending);
        assert_eq!(a.status, JobStatus::Pending);
        let b = JobAggregates::derive(2, 0, counts(1, 1, 0), JobStatus::Paused);
        assert_eq!(b.status, JobStatus::Paused);
        let c = JobAggregates::derive(2, 0, counts(1, 1, 0), JobStatus::Pending);
        assert_eq!(c.status, JobStatus::Running);
        let d = JobAggregates::derive(3, 0, counts(2, 1, 0), JobStatus::Failed);
        assert_eq!(d.status, JobStatus::Failed);
    }

    #[test]
    fn targets_pad_missing_names() {
        let job = Job {
            id: 1,
            name: "j".into(),
            phone_numbers: vec!["+15550001".into(), "+15550002".into()],
            display_names: vec!["Ann".into()],
            assistant_id: "a".into(),
            line_ids: vec![],
            window: TimeWindowConfig::default(),
            scheduled_at: None,
            total_calls: 2,
            completed_calls: 0,
            failed_calls: 0,
            rejected_calls: 0,
            failed_numbers: vec![],
            status: JobStatus::Pending,
            progress: 0,
            notes: String::new(),
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(
            job.targets(),
            vec![
                ("+15550001".to_string(), "Ann".to_string()),
                ("+15550002".to_string(), String::new())
            ]
        );
    }
}
