use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional `[persist_retry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

/// Backoff between provider retries (optional `[dial_retry]` section). The
/// attempt cap is `max_dial_retries`; a `max_attempts` key here is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DialBackoffConfig {
    pub base_delay_secs: f64,
    pub max_delay_secs: u64,
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// How business-hours boundaries are compared.
///
/// `Hour` compares only the hour of day with an inclusive end (09:00-17:00
/// admits 17:59). `Minute` compares the full time of day with an exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoursPrecision {
    Hour,
    #[default]
    Minute,
}

/// Time-of-day window carrying a dispatch priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityWindowConfig {
    /// "HH:MM", inclusive.
    pub start: String,
    /// "HH:MM", exclusive.
    pub end: String,
    pub priority: i32,
}

/// Absolute date range during which no dialing happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutConfig {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: String,
}

/// Call provider endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API root; calls are created with `POST {base_url}/call`.
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.vapi.ai".to_string(),
            api_key_env: "DIALER_PROVIDER_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Global configuration loaded from `~/.config/dialer/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialerConfig {
    /// Upper bound on concurrent calls per job. The effective cap for a job is
    /// its outbound-line count, clamped to `1..=max_concurrent_calls_per_job`.
    pub max_concurrent_calls_per_job: usize,
    /// Maximum concurrent calls across all jobs.
    pub max_global_concurrent_calls: usize,
    /// Seconds an outbound line stays marked busy after a dial.
    pub busy_line_ttl_secs: u64,
    /// Delay before retrying an entry that hit a rate limit or found no free line.
    pub capacity_requeue_delay_secs: u64,
    /// Pending entries fetched per trigger tick.
    pub batch_size: u32,
    /// Seconds between trigger ticks in `dialer run`.
    pub poll_interval_secs: u64,
    /// Cap on an entry's retry count: the dial that would push it to this
    /// value marks the entry failed instead of requeueing it.
    pub max_dial_retries: u32,
    #[serde(default)]
    pub business_hours_precision: HoursPrecision,
    #[serde(default)]
    pub default_priority: i32,
    #[serde(default)]
    pub priority_windows: Vec<PriorityWindowConfig>,
    #[serde(default)]
    pub blackouts: Vec<BlackoutConfig>,
    /// Backoff between provider retries; if missing, 60s doubling up to 900s.
    #[serde(default)]
    pub dial_retry: Option<DialBackoffConfig>,
    /// Backoff between store write attempts; if missing, built-in defaults are used.
    #[serde(default)]
    pub persist_retry: Option<RetryConfig>,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls_per_job: 3,
            max_global_concurrent_calls: 10,
            busy_line_ttl_secs: 60,
            capacity_requeue_delay_secs: 5,
            batch_size: 20,
            poll_interval_secs: 10,
            max_dial_retries: 3,
            business_hours_precision: HoursPrecision::Minute,
            default_priority: 0,
            priority_windows: Vec::new(),
            blackouts: Vec::new(),
            dial_retry: None,
            persist_retry: None,
            provider: ProviderConfig::default(),
        }
    }
}

impl DialerConfig {
    /// Provider retry policy. `max_attempts` is always `max_dial_retries`.
    pub fn dial_retry_policy(&self) -> RetryPolicy {
        let (base_delay, max_delay) = match &self.dial_retry {
            Some(b) => (
                Duration::from_secs_f64(b.base_delay_secs.max(0.0)),
                Duration::from_secs(b.max_delay_secs),
            ),
            None => (Duration::from_secs(60), Duration::from_secs(900)),
        };
        RetryPolicy {
            max_attempts: self.max_dial_retries.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn persist_retry_policy(&self) -> RetryPolicy {
        self.persist_retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }

    pub fn busy_line_ttl(&self) -> Duration {
        Duration::from_secs(self.busy_line_ttl_secs)
    }

    pub fn capacity_requeue_delay(&self) -> Duration {
        Duration::from_secs(self.capacity_requeue_delay_secs)
    }
}

fn dirs() -> Result<xdg::BaseDirectories> {
    Ok(xdg::BaseDirectories::with_prefix("dialer")?)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs()?.place_config_file("config.toml")?)
}

/// State directory for the database, log file and control socket.
pub fn state_dir() -> Result<PathBuf> {
    Ok(dirs()?.get_state_home().join("dialer"))
}

/// Default path for the control socket used by `dialer run`.
pub fn control_socket_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("control.sock"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DialerConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DialerConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DialerConfig = toml::from_str(&data)?;
    Ok(cfg)
}
