#![allow(dead_code)]

pub mod fakes;
pub mod provider_server;

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use dialer_core::clock::ManualClock;
use dialer_core::config::{DialerConfig, RetryConfig};
use dialer_core::dispatcher::Dispatcher;
use dialer_core::provider::CallProvider;
use dialer_core::scheduler::TimeWindowConfig;
use dialer_core::store::{DialerDb, JobId, NewJob};

/// Wednesday 2026-10-14 14:00 UTC.
pub fn weekday_afternoon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 14, 14, 0, 0).unwrap()
}

/// Config for tests: lines free up immediately, store retries do not sleep.
pub fn test_config() -> DialerConfig {
    DialerConfig {
        busy_line_ttl_secs: 0,
        persist_retry: Some(RetryConfig {
            max_attempts: 2,
            base_delay_secs: 0.0,
            max_delay_secs: 0,
        }),
        ..DialerConfig::default()
    }
}

pub fn utc_window() -> TimeWindowConfig {
    TimeWindowConfig {
        start_time: "09:00".into(),
        end_time: "17:00".into(),
        allow_weekends: false,
        timezone: "UTC".into(),
    }
}

pub fn job(name: &str, numbers: &[&str], lines: &[&str], window: TimeWindowConfig) -> NewJob {
    NewJob {
        name: name.to_string(),
        phone_numbers: numbers.iter().map(|s| s.to_string()).collect(),
        display_names: Vec::new(),
        assistant_id: "asst-1".to_string(),
        line_ids: lines.iter().map(|s| s.to_string()).collect(),
        window,
        scheduled_at: None,
    }
}

pub struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub async fn new(provider: Arc<dyn CallProvider>, cfg: &DialerConfig, now: DateTime<Utc>) -> Self {
        let db = DialerDb::open_memory().await.unwrap();
        let clock = Arc::new(ManualClock::new(now));
        let dispatcher = Dispatcher::new(db, provider, clock.clone(), cfg).unwrap();
        Self {
            dispatcher: Arc::new(dispatcher),
            clock,
        }
    }

    pub fn db(&self) -> &DialerDb {
        self.dispatcher.db()
    }

    /// Create a job and enqueue all of its numbers.
    pub async fn add_job(&self, job: &NewJob) -> JobId {
        let id = self.db().create_job(job).await.unwrap();
        self.dispatcher.enqueue_job(id).await.unwrap();
        id
    }
}
