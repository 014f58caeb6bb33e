//! Outbound call dispatcher.
//!
//! Owns the process-local rate limiter and busy-line cache, validates and
//! enqueues job numbers, and dials due entries one at a time. Overlapping
//! `tick` calls on the same dispatcher share its limiter, so concurrency comes
//! from the caller scheduling ticks, bounded by the global cap.

mod enqueue;
mod execute;
mod outcome;
mod validate;

use std::future::Future;
use std::sync::Arc;

use crate::busy_lines::BusyLineCache;
use crate::clock::Clock;
use crate::config::DialerConfig;
use crate::error::DialerError;
use crate::provider::CallProvider;
use crate::rate_limiter::RateLimiter;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::scheduler::SchedulePolicy;
use crate::store::{DialerDb, JobId};

pub use outcome::{BatchSummary, DispatchOutcome, EnqueueReport};
pub use validate::validate_phone_number;

/// Telemetry snapshot for `dialer status` and logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherStats {
    pub total_active_calls: usize,
    pub per_job: Vec<(JobId, usize)>,
    pub global_at_limit: bool,
    pub max_per_job: usize,
    pub max_global: usize,
    pub busy_lines: Vec<String>,
}

pub struct Dispatcher {
    db: DialerDb,
    provider: Arc<dyn CallProvider>,
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    busy_lines: BusyLineCache,
    schedule: SchedulePolicy,
    dial_retry: RetryPolicy,
    persist_retry: RetryPolicy,
    pub(crate) max_dial_retries: u32,
    capacity_delay: chrono::Duration,
    batch_size: u32,
}

impl Dispatcher {
    pub fn new(
        db: DialerDb,
        provider: Arc<dyn CallProvider>,
        clock: Arc<dyn Clock>,
        cfg: &DialerConfig,
    ) -> Result<Self, DialerError> {
        let dial_retry = cfg.dial_retry_policy();
        Ok(Self {
            db,
            provider,
            busy_lines: BusyLineCache::new(cfg.busy_line_ttl(), clock.clone()),
            clock,
            limiter: RateLimiter::new(cfg.max_concurrent_calls_per_job, cfg.max_global_concurrent_calls),
            schedule: SchedulePolicy::from_config(cfg)?,
            dial_retry,
            persist_retry: cfg.persist_retry_policy(),
            max_dial_retries: dial_retry.max_attempts,
            capacity_delay: to_chrono(cfg.capacity_requeue_delay()),
            batch_size: cfg.batch_size.max(1),
        })
    }

    pub fn db(&self) -> &DialerDb {
        &self.db
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn busy_lines(&self) -> &BusyLineCache {
        &self.busy_lines
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            total_active_calls: self.limiter.total_active_calls(),
            per_job: self.limiter.active_by_job(),
            global_at_limit: self.limiter.is_global_at_limit(),
            max_per_job: self.limiter.max_per_job(),
            max_global: self.limiter.max_global(),
            busy_lines: self.busy_lines.list_busy(),
        }
    }

    /// Reset entries left `running` by a previous process. Call once before
    /// the first tick.
    pub async fn recover(&self) -> Result<u64, DialerError> {
        let db = &self.db;
        let n = run_with_retry(&self.persist_retry, move || async move {
            db.recover_running_entries()
                .await
                .map_err(DialerError::Persistence)
        })
        .await?;
        if n > 0 {
            tracing::info!(entries = n, "recovered stranded entries");
        }
        Ok(n)
    }

    /// Fetch one batch of due entries and process it.
    pub async fn tick(&self) -> Result<BatchSummary, DialerError> {
        let now = self.clock.now();
        let db = &self.db;
        let limit = self.batch_size;
        let due = run_with_retry(&self.persist_retry, move || async move {
            db.fetch_due_entries(now, limit)
                .await
                .map_err(DialerError::Persistence)
        })
        .await?;
        if due.is_empty() {
            return Ok(BatchSummary::default());
        }
        tracing::debug!(entries = due.len(), "processing due batch");
        Ok(self.process_batch(&due).await)
    }

    /// Run a store operation under the persistence retry policy. After the
    /// last attempt the error is logged and `None` returned.
    pub(crate) async fn persist<T, F, Fut>(&self, op: &'static str, mut f: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let result = run_with_retry(&self.persist_retry, || {
            let fut = f();
            async move { fut.await.map_err(DialerError::Persistence) }
        })
        .await;
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!(op, error = %e, "store write dropped after retries");
                None
            }
        }
    }
}

pub(crate) fn to_chrono(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(d.as_millis().min(i64::MAX as u128) as i64)
}
