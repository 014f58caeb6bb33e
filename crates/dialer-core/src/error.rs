//! Error taxonomy for the dispatcher.
//!
//! Each variant maps to one handling policy: validation errors are recorded
//! against the job, capacity errors are requeued, provider errors are retried
//! up to the dial cap, persistence errors are retried with backoff and then
//! dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialerError {
    /// Malformed phone number (not retried).
    #[error("invalid phone number {number:?}: {reason}")]
    Validation { number: String, reason: String },

    /// Rate limit reached or no free outbound line (requeued, never counted as failure).
    #[error("capacity: {0}")]
    Capacity(String),

    /// The call provider rejected or failed the dial attempt.
    #[error("provider: {0}")]
    Provider(String),

    /// A store write failed.
    #[error("persistence: {0}")]
    Persistence(#[source] anyhow::Error),

    /// `next_available_time` walked the full horizon without finding a slot.
    #[error("no available slot within {horizon_days} days")]
    NoAvailableSlot { horizon_days: u32 },

    /// Invalid timezone, time-of-day or line configuration.
    #[error("config: {0}")]
    Config(String),
}

impl DialerError {
    pub fn validation(number: impl Into<String>, reason: impl Into<String>) -> Self {
        DialerError::Validation {
            number: number.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_number_and_reason() {
        let e = DialerError::validation("12ab", "must match E.164");
        assert_eq!(e.to_string(), "invalid phone number \"12ab\": must match E.164");
    }
}
