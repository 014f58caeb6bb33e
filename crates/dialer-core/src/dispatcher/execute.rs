//! Per-entry dispatch: claim, gate, dial, record.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::outcome::{BatchSummary, DispatchOutcome};
use super::{to_chrono, Dispatcher};
use crate::error::DialerError;
use crate::provider::CallRequest;
use crate::scheduler::{search_horizon, Scheduler};
use crate::store::{JobStatus, QueueEntry};

/// Greeting for the callee's local hour.
pub(crate) fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Good morning",
        12..=16 => "Good afternoon",
        17..=20 => "Good evening",
        _ => "Good night",
    }
}

fn call_variables(entry: &QueueEntry, local_hour: u32) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("greeting".to_string(), greeting_for_hour(local_hour).to_string()),
        ("name".to_string(), entry.display_name.clone()),
        ("phone".to_string(), entry.phone_number.clone()),
    ])
}

impl Dispatcher {
    /// Dial entries one after another.
    pub async fn process_batch(&self, entries: &[QueueEntry]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for entry in entries {
            let outcome = self.process_message(entry).await;
            summary.record(&outcome);
        }
        if summary.processed() > 0 {
            tracing::info!(
                dispatched = summary.dispatched,
                requeued = summary.requeued,
                failed = summary.failed,
                skipped = summary.skipped,
                "batch done"
            );
        }
        summary
    }

    /// Run one dial attempt for `entry`.
    ///
    /// Only the id of `entry` is trusted: the claim re-reads the row, so a
    /// stale copy from an overlapping batch cannot dial an entry that was
    /// requeued in the meantime. The job slot taken before line selection is
    /// held by a guard and released on every return path.
    pub async fn process_message(&self, entry: &QueueEntry) -> DispatchOutcome {
        let (db, id, job_id) = (&self.db, entry.id, entry.job_id);
        let now = self.clock.now();

        let claimed = match self.persist("claim entry", move || db.claim_entry(id, now)).await {
            Some(Some(e)) => e,
            _ => {
                tracing::debug!(job_id, entry_id = id, "entry not claimable");
                return DispatchOutcome::Skipped;
            }
        };
        let entry = &claimed;

        let Some(status) = self.persist("read job status", move || db.job_status(job_id)).await else {
            self.requeue(entry, now + self.capacity_delay, entry.retry_count, "job status unavailable")
                .await;
            return DispatchOutcome::Skipped;
        };
        match status {
            Some(s) if s.is_dialable() => {}
            Some(JobStatus::Paused) => {
                let at = now + self.capacity_delay;
                return self.requeue(entry, at, entry.retry_count, "job paused").await;
            }
            Some(s) => {
                tracing::info!(job_id, entry_id = id, status = s.as_str(), "job closed; dropping entry");
                return self.fail(entry, entry.retry_count, &format!("job {}", s.as_str())).await;
            }
            None => {
                tracing::warn!(job_id, entry_id = id, "job missing; skipping entry");
                return DispatchOutcome::Skipped;
            }
        }

        let scheduler = match Scheduler::for_window(&entry.window, &self.schedule) {
            Ok(s) => s,
            Err(e) => return self.fail(entry, entry.retry_count, &e.to_string()).await,
        };
        let check = scheduler.validate_schedule(now);
        if !check.valid {
            let reason = check.reason.unwrap_or_default();
            let at = self.next_slot(&scheduler, entry, now);
            return self.requeue(entry, at, entry.retry_count, &reason).await;
        }

        if entry.line_ids.is_empty() {
            let e = DialerError::Config("no outbound lines configured".into());
            return self.fail(entry, entry.retry_count, &e.to_string()).await;
        }
        let job_cap = entry.line_ids.len();
        let Some(_slot) = self.limiter.try_acquire(job_id, job_cap) else {
            let e = DialerError::Capacity("concurrent call limit reached".into());
            let at = now + self.capacity_delay;
            return self.requeue(entry, at, entry.retry_count, &e.to_string()).await;
        };

        let Some(line_id) = self.busy_lines.first_free(&entry.line_ids) else {
            let e = DialerError::Capacity(format!("no free outbound line for {}", entry.phone_number));
            let note = e.to_string();
            let n = note.as_str();
            self.persist("append job note", move || db.append_job_note(job_id, n))
                .await;
            let at = now + self.capacity_delay;
            return self.requeue(entry, at, entry.retry_count, &note).await;
        };

        if let Some(true) = self
            .persist("mark job running", move || db.mark_job_running_if_pending(job_id))
            .await
        {
            tracing::info!(job_id, "job running");
        }

        let request = CallRequest {
            assistant_id: entry.assistant_id.clone(),
            line_id: line_id.to_string(),
            customer_number: entry.phone_number.clone(),
            customer_name: entry.display_name.clone(),
            variables: call_variables(entry, scheduler.local_hour(now)),
        };
        self.busy_lines.mark_busy(line_id);
        tracing::debug!(job_id, entry_id = id, line_id, active = self.limiter.total_active_calls(), "dialing");

        match self.provider.create_call(&request).await {
            Ok(call_id) => {
                let c = call_id.as_str();
                self.persist("complete entry", move || db.complete_entry(id, c, line_id))
                    .await;
                self.refresh(job_id).await;
                tracing::info!(job_id, entry_id = id, call_id = %call_id, "call dispatched");
                DispatchOutcome::Dispatched { call_id }
            }
            Err(e) => self.handle_dial_error(entry, &scheduler, now, e).await,
        }
    }

    async fn handle_dial_error(
        &self,
        entry: &QueueEntry,
        scheduler: &Scheduler,
        now: DateTime<Utc>,
        err: DialerError,
    ) -> DispatchOutcome {
        let retry_count = entry.retry_count.saturating_add(1);
        let reason = err.to_string();
        if retry_count >= self.max_dial_retries {
            tracing::warn!(
                job_id = entry.job_id,
                entry_id = entry.id,
                retry_count,
                "dial failed permanently: {reason}"
            );
            return self.fail(entry, retry_count, &reason).await;
        }
        let backoff = to_chrono(self.dial_retry.backoff(retry_count));
        let at = self.next_slot(scheduler, entry, now + backoff);
        tracing::warn!(
            job_id = entry.job_id,
            entry_id = entry.id,
            retry_count,
            at = %at,
            "dial failed, retrying: {reason}"
        );
        self.requeue(entry, at, retry_count, &reason).await
    }

    /// Next callable instant at or after `from`. With no slot inside the
    /// search horizon the entry is parked at the horizon's end and looked at
    /// again from there.
    fn next_slot(&self, scheduler: &Scheduler, entry: &QueueEntry, from: DateTime<Utc>) -> DateTime<Utc> {
        match scheduler.next_available_time(from) {
            Ok(at) => at,
            Err(e) => {
                let at = from + search_horizon();
                tracing::warn!(job_id = entry.job_id, entry_id = entry.id, at = %at, "{e}; parking entry");
                at
            }
        }
    }

    async fn requeue(
        &self,
        entry: &QueueEntry,
        at: DateTime<Utc>,
        retry_count: u32,
        reason: &str,
    ) -> DispatchOutcome {
        let (db, id) = (&self.db, entry.id);
        let delay_secs = (at - self.clock.now()).num_seconds().max(0);
        self.persist("requeue entry", move || {
            db.requeue_entry(id, at, delay_secs, retry_count, Some(reason))
        })
        .await;
        tracing::debug!(job_id = entry.job_id, entry_id = id, at = %at, "requeued: {reason}");
        DispatchOutcome::Requeue {
            at,
            reason: reason.to_string(),
        }
    }

    /// Mark the entry failed, list its number on the job once and recompute
    /// the job aggregates.
    async fn fail(&self, entry: &QueueEntry, retry_count: u32, reason: &str) -> DispatchOutcome {
        let (db, id, job_id) = (&self.db, entry.id, entry.job_id);
        let number = entry.phone_number.as_str();
        self.persist("fail entry", move || db.fail_entry(id, retry_count, reason))
            .await;
        self.persist("record failed number", move || db.record_failed_number(job_id, number))
            .await;
        self.refresh(job_id).await;
        DispatchOutcome::Failed {
            reason: reason.to_string(),
        }
    }

    pub(crate) async fn refresh(&self, job_id: crate::store::JobId) {
        let db = &self.db;
        if let Some(agg) = self
            .persist("refresh job aggregates", move || db.refresh_job_aggregates(job_id))
            .await
        {
            tracing::debug!(
                job_id,
                completed = agg.completed_calls,
                failed = agg.failed_calls,
                progress = agg.progress,
                status = agg.status.as_str(),
                "job aggregates"
            );
        }
    }
}
