//! Concurrent-call accounting per job and across all jobs.
//!
//! Each dial attempt reserves one slot for its job and one global slot before
//! calling the provider and releases both when the attempt finishes, so the
//! number of calls in flight stays under the configured caps. State is
//! process-local and starts empty on every run.

mod guard;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::store::JobId;

pub use guard::SlotGuard;

/// Active calls of one job and the cap they were admitted under.
#[derive(Debug, Clone, Copy)]
struct JobSlots {
    active: usize,
    cap: usize,
}

/// Active-call counters guarded by one lock so both caps are checked and
/// updated together.
#[derive(Debug, Default)]
struct RateLimitState {
    per_job: HashMap<JobId, JobSlots>,
    global: usize,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_per_job: usize,
    max_global: usize,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    /// Create a limiter with the given caps (each at least 1).
    pub fn new(max_per_job: usize, max_global: usize) -> Self {
        Self {
            max_per_job: max_per_job.max(1),
            max_global: max_global.max(1),
            state: Mutex::new(RateLimitState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn max_per_job(&self) -> usize {
        self.max_per_job
    }

    pub fn max_global(&self) -> usize {
        self.max_global
    }

    /// Reserve a slot for `job_id` under the default per-job cap.
    pub fn acquire_job_slot(&self, job_id: JobId) -> bool {
        self.acquire_job_slot_with_cap(job_id, self.max_per_job)
    }

    /// Reserve a slot for `job_id` under `job_cap` (bounded by the configured
    /// per-job cap). Increments both counters only when both have headroom;
    /// otherwise leaves state untouched and returns false.
    pub fn acquire_job_slot_with_cap(&self, job_id: JobId, job_cap: usize) -> bool {
        let cap = job_cap.clamp(1, self.max_per_job);
        let mut state = self.lock();
        let job_active = state.per_job.get(&job_id).map_or(0, |s| s.active);
        if job_active >= cap || state.global >= self.max_global {
            return false;
        }
        let slots = state.per_job.entry(job_id).or_insert(JobSlots { active: 0, cap });
        slots.active += 1;
        slots.cap = cap;
        state.global += 1;
        true
    }

    /// Like `acquire_job_slot_with_cap` but returns a guard that releases on drop.
    pub fn try_acquire(&self, job_id: JobId, job_cap: usize) -> Option<SlotGuard<'_>> {
        self.acquire_job_slot_with_cap(job_id, job_cap)
            .then(|| SlotGuard::new(self, job_id))
    }

    /// Release one slot for `job_id`. Without a matching acquisition this is a no-op.
    pub fn release_job_slot(&self, job_id: JobId) {
        let mut state = self.lock();
        let Some(slots) = state.per_job.get_mut(&job_id) else {
            return;
        };
        slots.active = slots.active.saturating_sub(1);
        if slots.active == 0 {
            state.per_job.remove(&job_id);
        }
        state.global = state.global.saturating_sub(1);
    }

    pub fn total_active_calls(&self) -> usize {
        self.lock().global
    }

    pub fn job_active_calls(&self, job_id: JobId) -> usize {
        self.lock().per_job.get(&job_id).map_or(0, |s| s.active)
    }

    /// Snapshot of `(job_id, active)` for every job holding a slot, sorted by id.
    pub fn active_by_job(&self) -> Vec<(JobId, usize)> {
        let mut out: Vec<_> = self.lock().per_job.iter().map(|(k, v)| (*k, v.active)).collect();
        out.sort_unstable();
        out
    }

    /// True when the job's active calls reached the cap its last slot was
    /// admitted under. A job with no active call is never at its limit.
    pub fn is_job_at_limit(&self, job_id: JobId) -> bool {
        self.lock()
            .per_job
            .get(&job_id)
            .is_some_and(|s| s.active >= s.cap)
    }

    pub fn is_global_at_limit(&self) -> bool {
        self.total_active_calls() >= self.max_global
    }
}
