use chrono::NaiveTime;

use crate::config::PriorityWindowConfig;
use crate::error::DialerError;

use super::window::{in_time_range, parse_time_of_day};

/// Time-of-day range `[start, end)` carrying a dispatch priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub priority: i32,
}

impl PriorityWindow {
    pub fn contains(&self, t: NaiveTime) -> bool {
        in_time_range(t, self.start, self.end)
    }
}

impl TryFrom<&PriorityWindowConfig> for PriorityWindow {
    type Error = DialerError;

    fn try_from(c: &PriorityWindowConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            start: parse_time_of_day(&c.start)?,
            end: parse_time_of_day(&c.end)?,
            priority: c.priority,
        })
    }
}
