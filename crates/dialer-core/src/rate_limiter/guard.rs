//! RAII guard that releases a reserved call slot when dropped.

use super::RateLimiter;
use crate::store::JobId;

/// Releases the job's slot when dropped, whichever way the attempt ends.
#[derive(Debug)]
pub struct SlotGuard<'a> {
    limiter: &'a RateLimiter,
    job_id: JobId,
}

impl<'a> SlotGuard<'a> {
    pub(super) fn new(limiter: &'a RateLimiter, job_id: JobId) -> Self {
        Self { limiter, job_id }
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.limiter.release_job_slot(self.job_id);
    }
}
