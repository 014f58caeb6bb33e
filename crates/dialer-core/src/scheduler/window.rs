//! Per-job time-window descriptor and business-hours configuration.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::HoursPrecision;
use crate::error::DialerError;

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Calling window supplied per job, stored as JSON alongside the job and each
/// of its queue entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowConfig {
    /// "HH:MM" local start of the window.
    pub start_time: String,
    /// "HH:MM" local end of the window.
    pub end_time: String,
    #[serde(default)]
    pub allow_weekends: bool,
    /// IANA timezone name, e.g. "Europe/London".
    pub timezone: String,
}

impl Default for TimeWindowConfig {
    fn default() -> Self {
        Self {
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            allow_weekends: false,
            timezone: "UTC".to_string(),
        }
    }
}

/// Parse "HH:MM" (or "HH:MM:SS") into a time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, DialerError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| DialerError::Config(format!("invalid time of day {s:?}, expected HH:MM")))
}

/// Resolve an IANA name; unknown names fall back to UTC.
pub fn timezone_tz(timezone: &str) -> Tz {
    match timezone.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone, "unknown timezone, using UTC");
            Tz::UTC
        }
    }
}

/// True if `t` falls in `[start, end)`, wrapping past midnight when `start > end`.
pub(crate) fn in_time_range(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        start <= t && t < end
    } else {
        t >= start || t < end
    }
}

/// Allowed weekdays and time-of-day range in one timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    pub weekdays: Vec<Weekday>,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub timezone: Tz,
    pub precision: HoursPrecision,
}

impl BusinessHours {
    /// Build from a job's window: weekends expand the set to all seven days,
    /// otherwise Monday to Friday.
    pub fn from_window(
        window: &TimeWindowConfig,
        precision: HoursPrecision,
    ) -> Result<Self, DialerError> {
        let weekdays = if window.allow_weekends {
            ALL_DAYS.to_vec()
        } else {
            WEEKDAYS.to_vec()
        };
        Ok(Self {
            weekdays,
            start: parse_time_of_day(&window.start_time)?,
            end: parse_time_of_day(&window.end_time)?,
            timezone: timezone_tz(&window.timezone),
            precision,
        })
    }

    pub fn local(&self, t: DateTime<Utc>) -> DateTime<Tz> {
        t.with_timezone(&self.timezone)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        let local = self.local(t);
        if !self.weekdays.contains(&local.weekday()) {
            return false;
        }
        match self.precision {
            // Hour-only comparison, end hour inclusive; wraps past midnight.
            HoursPrecision::Hour => {
                let (h, start, end) = (local.hour(), self.start.hour(), self.end.hour());
                if start <= end {
                    start <= h && h <= end
                } else {
                    h >= start || h <= end
                }
            }
            HoursPrecision::Minute => in_time_range(local.time(), self.start, self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours(precision: HoursPrecision) -> BusinessHours {
        BusinessHours::from_window(
            &TimeWindowConfig {
                start_time: "09:00".into(),
                end_time: "17:00".into(),
                allow_weekends: false,
                timezone: "America/New_York".into(),
            },
            precision,
        )
        .unwrap()
    }

    #[test]
    fn weekday_set_depends_on_allow_weekends() {
        let mut w = TimeWindowConfig::default();
        assert_eq!(BusinessHours::from_window(&w, HoursPrecision::Minute).unwrap().weekdays.len(), 5);
        w.allow_weekends = true;
        assert_eq!(BusinessHours::from_window(&w, HoursPrecision::Minute).unwrap().weekdays.len(), 7);
    }

    #[test]
    fn minute_precision_end_is_exclusive() {
        let h = hours(HoursPrecision::Minute);
        // 2026-10-14 is a Wednesday; New York is UTC-4 in October.
        assert!(h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 13, 0, 0).unwrap()));
        assert!(h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 20, 59, 0).unwrap()));
        assert!(!h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 21, 0, 0).unwrap()));
        assert!(!h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 12, 59, 0).unwrap()));
    }

    #[test]
    fn hour_precision_admits_whole_end_hour() {
        let h = hours(HoursPrecision::Hour);
        // 17:45 local
        assert!(h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 21, 45, 0).unwrap()));
        // 18:00 local
        assert!(!h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 22, 0, 0).unwrap()));
    }

    #[test]
    fn hour_precision_overnight_window_wraps() {
        let h = BusinessHours::from_window(
            &TimeWindowConfig {
                start_time: "22:00".into(),
                end_time: "02:00".into(),
                allow_weekends: true,
                timezone: "UTC".into(),
            },
            HoursPrecision::Hour,
        )
        .unwrap();
        assert!(h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 22, 0, 0).unwrap()));
        assert!(h.contains(Utc.with_ymd_and_hms(2026, 10, 14, 23, 30, 0).unwrap()));
        assert!(h.contains(Utc.with_ymd_and_hms(2026, 10, 15, 2, 45, 0).unwrap()));
        assert!(!h.contains(Utc.with_ymd_and_hms(2026, 10, 15, 3, 0, 0).unwrap()));
        assert!(!h.contains(Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()));
    }

    #[test]
    fn weekends_are_closed_by_default() {
        let h = hours(HoursPrecision::Minute);
        // Saturday 2026-10-17, 12:00 local
        assert!(!h.contains(Utc.with_ymd_and_hms(2026, 10, 17, 16, 0, 0).unwrap()));
    }

    #[test]
    fn bad_time_and_timezone() {
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("9am").is_err());
        assert_eq!(parse_time_of_day("08:30:00").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(timezone_tz("Mars/Olympus"), Tz::UTC);
    }

    #[test]
    fn overnight_range_wraps() {
        let start = NaiveTime::from_hms_opt(22, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(2, 0, 0).unwrap();
        assert!(in_time_range(NaiveTime::from_hms_opt(23, 30, 0).unwrap(), start, end));
        assert!(in_time_range(NaiveTime::from_hms_opt(1, 0, 0).unwrap(), start, end));
        assert!(!in_time_range(NaiveTime::from_hms_opt(12, 0, 0).unwrap(), start, end));
    }
}
