//! Validation and enqueue of job numbers.

use anyhow::Context;
use std::collections::BTreeSet;

use super::outcome::EnqueueReport;
use super::validate::validate_phone_number;
use super::Dispatcher;
use crate::error::DialerError;
use crate::retry::run_with_retry;
use crate::scheduler::{search_horizon, Scheduler};
use crate::store::{EntryId, JobId, NewQueueEntry};

impl Dispatcher {
    /// Enqueue every number of a stored job.
    pub async fn enqueue_job(&self, job_id: JobId) -> Result<EnqueueReport, DialerError> {
        let job = self
            .db
            .get_job(job_id)
            .await
            .map_err(DialerError::Persistence)?
            .with_context(|| format!("job {job_id} not found"))
            .map_err(DialerError::Persistence)?;
        let now = self.clock.now();
        let scheduled_at = job.scheduled_at.unwrap_or(now);
        let entries: Vec<NewQueueEntry> = job
            .targets()
            .into_iter()
            .map(|(phone_number, display_name)| NewQueueEntry {
                job_id,
                phone_number,
                display_name,
                assistant_id: job.assistant_id.clone(),
                line_ids: job.line_ids.clone(),
                priority: self.schedule.default_priority,
                scheduled_at,
                window: job.window.clone(),
            })
            .collect();
        Ok(self.enqueue_job_batch(entries).await)
    }

    /// Split entries by phone format. Malformed numbers, and numbers whose
    /// entry could not be stored, are recorded against their job as rejected
    /// and never become queue entries; the rest go through
    /// `validate_and_enqueue`. Jobs with rejects get their aggregates
    /// recomputed so a job of only rejects still resolves.
    pub async fn enqueue_job_batch(&self, entries: Vec<NewQueueEntry>) -> EnqueueReport {
        let mut report = EnqueueReport::default();
        let mut touched = BTreeSet::new();
        for entry in entries {
            let (job_id, number) = (entry.job_id, entry.phone_number.clone());
            let note = match validate_phone_number(&number) {
                Err(e) => {
                    tracing::warn!(job_id, number = %number, "rejecting number: {e}");
                    e.to_string()
                }
                Ok(()) => match self.validate_and_enqueue(entry).await {
                    Ok(_) => {
                        report.enqueued += 1;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(job_id, number = %number, "enqueue failed: {e}");
                        format!("enqueue failed for {number}: {e}")
                    }
                },
            };
            let (db, n, note) = (&self.db, number.as_str(), note.as_str());
            self.persist("record rejected number", move || db.record_rejected_number(job_id, n, note))
                .await;
            touched.insert(job_id);
            report.failed += 1;
        }
        for job_id in touched {
            self.refresh(job_id).await;
        }
        if report.failed == 0 {
            tracing::info!(enqueued = report.enqueued, "batch enqueued");
        } else {
            tracing::info!(enqueued = report.enqueued, failed = report.failed, "batch enqueued with rejects");
        }
        report
    }

    /// Insert one entry, moving its due time to the next callable instant
    /// when "now" is outside its window. Entries dated in the future are
    /// stored as given; with no callable instant inside the search horizon
    /// the entry is parked at the horizon's end.
    pub async fn validate_and_enqueue(&self, mut entry: NewQueueEntry) -> Result<EntryId, DialerError> {
        let scheduler = Scheduler::for_window(&entry.window, &self.schedule)?;
        let now = self.clock.now();
        if entry.scheduled_at > now {
            tracing::debug!(job_id = entry.job_id, at = %entry.scheduled_at, "future-dated entry");
        } else {
            let check = scheduler.validate_schedule(now);
            if check.valid {
                entry.priority = scheduler.current_priority(now);
                entry.scheduled_at = now;
            } else {
                entry.scheduled_at = match scheduler.next_available_time(now) {
                    Ok(at) => at,
                    Err(e) => {
                        tracing::warn!(job_id = entry.job_id, "{e}; parking entry");
                        now + search_horizon()
                    }
                };
                tracing::debug!(
                    job_id = entry.job_id,
                    at = %entry.scheduled_at,
                    reason = check.reason.as_deref().unwrap_or(""),
                    "deferred to next callable time"
                );
            }
        }
        let (db, entry) = (&self.db, &entry);
        let id = run_with_retry(&self.persist_retry, move || async move {
            db.insert_entry(entry).await.map_err(DialerError::Persistence)
        })
        .await?;
        tracing::debug!(job_id = entry.job_id, entry_id = id, "entry enqueued");
        Ok(id)
    }
}
