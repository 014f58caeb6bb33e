use chrono::{DateTime, Utc};

use crate::config::BlackoutConfig;

/// Absolute range `[start, end)` that overrides business hours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackoutPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub reason: String,
}

impl BlackoutPeriod {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }
}

impl From<&BlackoutConfig> for BlackoutPeriod {
    fn from(c: &BlackoutConfig) -> Self {
        Self {
            start: c.start,
            end: c.end,
            reason: c.reason.clone(),
        }
    }
}
