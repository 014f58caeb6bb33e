//! Call scheduling rules.
//!
//! Pure functions over business hours, blackout periods and priority
//! windows: "is now callable?", "when is the next callable instant?" and
//! "what priority does now carry?". A `Scheduler` is rebuilt from each
//! entry's stored time window whenever it is enqueued or dispatched.

mod blackout;
mod priority;
mod window;

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::config::{DialerConfig, HoursPrecision};
use crate::error::DialerError;

pub use blackout::BlackoutPeriod;
pub use priority::PriorityWindow;
pub use window::{parse_time_of_day, timezone_tz, BusinessHours, TimeWindowConfig};

/// Granularity of the forward search in `next_available_time`.
pub const SEARCH_STEP_MINUTES: i64 = 5;
/// Seven days of five-minute steps.
pub const SEARCH_MAX_STEPS: u32 = 2016;
const SEARCH_HORIZON_DAYS: u32 = 7;

/// Span covered by one `next_available_time` search.
pub fn search_horizon() -> Duration {
    Duration::days(i64::from(SEARCH_HORIZON_DAYS))
}

/// Result of `validate_schedule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCheck {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ScheduleCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Scheduling rules shared by every job: blackouts, priority windows and the
/// business-hours comparison precision. Parsed once from `DialerConfig`.
#[derive(Debug, Clone, Default)]
pub struct SchedulePolicy {
    pub precision: HoursPrecision,
    pub blackouts: Vec<BlackoutPeriod>,
    pub priority_windows: Vec<PriorityWindow>,
    pub default_priority: i32,
}

impl SchedulePolicy {
    pub fn from_config(cfg: &DialerConfig) -> Result<Self, DialerError> {
        let priority_windows = cfg
            .priority_windows
            .iter()
            .map(PriorityWindow::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            precision: cfg.business_hours_precision,
            blackouts: cfg.blackouts.iter().map(BlackoutPeriod::from).collect(),
            priority_windows,
            default_priority: cfg.default_priority,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    hours: BusinessHours,
    blackouts: Vec<BlackoutPeriod>,
    priority_windows: Vec<PriorityWindow>,
    default_priority: i32,
}

impl Scheduler {
    pub fn new(
        hours: BusinessHours,
        blackouts: Vec<BlackoutPeriod>,
        priority_windows: Vec<PriorityWindow>,
        default_priority: i32,
    ) -> Self {
        Self {
            hours,
            blackouts,
            priority_windows,
            default_priority,
        }
    }

    /// Build the scheduler for one job's time window.
    pub fn for_window(
        window: &TimeWindowConfig,
        policy: &SchedulePolicy,
    ) -> Result<Self, DialerError> {
        Ok(Self::new(
            BusinessHours::from_window(window, policy.precision)?,
            policy.blackouts.clone(),
            policy.priority_windows.clone(),
            policy.default_priority,
        ))
    }

    pub fn is_business_hours(&self, t: DateTime<Utc>) -> bool {
        self.hours.contains(t)
    }

    /// First blackout range containing `t`, if any.
    pub fn is_blackout_period(&self, t: DateTime<Utc>) -> Option<&BlackoutPeriod> {
        self.blackouts.iter().find(|b| b.contains(t))
    }

    /// Priority of the first window containing `t`'s local time of day.
    pub fn current_priority(&self, t: DateTime<Utc>) -> i32 {
        let tod = self.hours.local(t).time();
        self.priority_windows
            .iter()
            .find(|w| w.contains(tod))
            .map(|w| w.priority)
            .unwrap_or(self.default_priority)
    }

    /// Hour of day in the job's timezone.
    pub fn local_hour(&self, t: DateTime<Utc>) -> u32 {
        self.hours.local(t).hour()
    }

    pub fn validate_schedule(&self, t: DateTime<Utc>) -> ScheduleCheck {
        if !self.is_business_hours(t) {
            return ScheduleCheck::rejected("outside business hours");
        }
        if let Some(b) = self.is_blackout_period(t) {
            return ScheduleCheck::rejected(format!("in blackout period: {}", b.reason));
        }
        ScheduleCheck::ok()
    }

    /// Earliest callable instant at or after `from`.
    ///
    /// `from` itself is tried first; after that the search walks the
    /// five-minute grid (aligned to the clock) for at most seven days.
    pub fn next_available_time(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>, DialerError> {
        let mut candidate = from;
        for _ in 0..SEARCH_MAX_STEPS {
            if self.validate_schedule(candidate).valid {
                return Ok(candidate);
            }
            candidate = next_grid_step(candidate);
        }
        Err(DialerError::NoAvailableSlot {
            horizon_days: SEARCH_HORIZON_DAYS,
        })
    }
}

fn next_grid_step(t: DateTime<Utc>) -> DateTime<Utc> {
    let step = Duration::minutes(SEARCH_STEP_MINUTES);
    let step_secs = step.num_seconds();
    let next = (t.timestamp().div_euclid(step_secs) + 1) * step_secs;
    DateTime::from_timestamp(next, 0).unwrap_or(t + step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(tz: &str, weekends: bool) -> TimeWindowConfig {
        TimeWindowConfig {
            start_time: "09:00".into(),
            end_time: "17:00".into(),
            allow_weekends: weekends,
            timezone: tz.into(),
        }
    }

    fn scheduler(tz: &str, policy: &SchedulePolicy) -> Scheduler {
        Scheduler::for_window(&window(tz, false), policy).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn after_hours_rolls_to_next_morning() {
        let s = scheduler("UTC", &SchedulePolicy::default());
        // Wednesday 22:00 -> Thursday 09:00
        let next = s.next_available_time(utc(2026, 10, 14, 22, 0)).unwrap();
        assert_eq!(next, utc(2026, 10, 15, 9, 0));
    }

    #[test]
    fn unaligned_start_lands_on_grid() {
        let s = scheduler("UTC", &SchedulePolicy::default());
        let from = Utc.with_ymd_and_hms(2026, 10, 14, 22, 7, 31).unwrap();
        assert_eq!(s.next_available_time(from).unwrap(), utc(2026, 10, 15, 9, 0));
    }

    #[test]
    fn friday_evening_rolls_to_monday() {
        let s = scheduler("Europe/London", &SchedulePolicy::default());
        // Friday 2026-10-16 18:00 BST (17:00 UTC) -> Monday 09:00 BST (08:00 UTC)
        let next = s.next_available_time(utc(2026, 10, 16, 17, 0)).unwrap();
        assert_eq!(next, utc(2026, 10, 19, 8, 0));
    }

    #[test]
    fn callable_instant_is_returned_unchanged() {
        let s = scheduler("UTC", &SchedulePolicy::default());
        let t = Utc.with_ymd_and_hms(2026, 10, 14, 10, 3, 17).unwrap();
        assert_eq!(s.next_available_time(t).unwrap(), t);
    }

    #[test]
    fn blackout_is_skipped_and_reported() {
        let policy = SchedulePolicy {
            blackouts: vec![BlackoutPeriod {
                start: utc(2026, 10, 15, 0, 0),
                end: utc(2026, 10, 16, 0, 0),
                reason: "maintenance".into(),
            }],
            ..SchedulePolicy::default()
        };
        let s = scheduler("UTC", &policy);
        let check = s.validate_schedule(utc(2026, 10, 15, 10, 0));
        assert!(!check.valid);
        assert_eq!(check.reason.as_deref(), Some("in blackout period: maintenance"));

        let next = s.next_available_time(utc(2026, 10, 14, 22, 0)).unwrap();
        assert_eq!(next, utc(2026, 10, 16, 9, 0));
        assert!(s.is_business_hours(next));
        assert!(s.is_blackout_period(next).is_none());
    }

    #[test]
    fn outside_hours_reason() {
        let s = scheduler("UTC", &SchedulePolicy::default());
        let check = s.validate_schedule(utc(2026, 10, 14, 3, 0));
        assert_eq!(check.reason.as_deref(), Some("outside business hours"));
    }

    #[test]
    fn horizon_exhaustion_is_an_error() {
        let policy = SchedulePolicy {
            blackouts: vec![BlackoutPeriod {
                start: utc(2026, 10, 1, 0, 0),
                end: utc(2026, 11, 1, 0, 0),
                reason: "freeze".into(),
            }],
            ..SchedulePolicy::default()
        };
        let s = scheduler("UTC", &policy);
        let err = s.next_available_time(utc(2026, 10, 14, 10, 0)).unwrap_err();
        assert!(matches!(err, DialerError::NoAvailableSlot { horizon_days: 7 }));
    }

    #[test]
    fn result_is_always_callable() {
        let s = Scheduler::for_window(&window("Asia/Kathmandu", false), &SchedulePolicy::default()).unwrap();
        let mut from = utc(2026, 10, 12, 0, 0);
        for _ in 0..200 {
            let next = s.next_available_time(from).unwrap();
            assert!(next >= from);
            assert!(s.is_business_hours(next));
            assert!(s.is_blackout_period(next).is_none());
            from = from + Duration::minutes(53);
        }
    }

    #[test]
    fn priority_windows_use_local_time() {
        let cfg = DialerConfig {
            default_priority: 1,
            priority_windows: vec![
                crate::config::PriorityWindowConfig {
                    start: "09:00".into(),
                    end: "12:00".into(),
                    priority: 10,
                },
                crate::config::PriorityWindowConfig {
                    start: "11:00".into(),
                    end: "13:00".into(),
                    priority: 5,
                },
            ],
            ..DialerConfig::default()
        };
        let policy = SchedulePolicy::from_config(&cfg).unwrap();
        let s = scheduler("America/New_York", &policy);
        // 11:30 EDT: first matching window wins.
        assert_eq!(s.current_priority(utc(2026, 10, 14, 15, 30)), 10);
        // 12:30 EDT
        assert_eq!(s.current_priority(utc(2026, 10, 14, 16, 30)), 5);
        // 15:00 EDT
        assert_eq!(s.current_priority(utc(2026, 10, 14, 19, 0)), 1);
        assert_eq!(s.local_hour(utc(2026, 10, 14, 19, 0)), 15);
    }
}
