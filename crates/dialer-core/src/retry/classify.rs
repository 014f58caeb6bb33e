//! Classify dispatcher errors and provider end reasons for retry decisions.

use crate::error::DialerError;
use crate::retry::policy::ErrorKind;

/// Classify a dispatcher error into an ErrorKind.
pub fn classify(e: &DialerError) -> ErrorKind {
    match e {
        DialerError::Provider(_) => ErrorKind::Provider,
        DialerError::Persistence(_) => ErrorKind::Persistence,
        DialerError::Capacity(_) => ErrorKind::Capacity,
        DialerError::Validation { .. }
        | DialerError::NoAvailableSlot { .. }
        | DialerError::Config(_) => ErrorKind::Other,
    }
}

/// Why the provider says a call ended, as reported by the status webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndedReason {
    GatewayConnectFailure,
    CustomerBusy,
    UnknownError,
    ProviderTelephonyFailure,
    /// Any other reason (customer hung up, assistant ended the call, ...).
    Other(String),
}

impl EndedReason {
    /// Parse a provider reason string. Vendor-prefixed variants
    /// (`sip-gateway-connect-failure`) match too; unknown strings map to `Other`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_ascii_lowercase();
        if s.contains("gateway-connect-failure") || s.contains("failed-to-connect") {
            EndedReason::GatewayConnectFailure
        } else if s.contains("customer-busy") {
            EndedReason::CustomerBusy
        } else if s == "unknown-error" || s.ends_with("-unknown-error") {
            EndedReason::UnknownError
        } else if s.contains("providerfault") || s.contains("telephony-failure") {
            EndedReason::ProviderTelephonyFailure
        } else {
            EndedReason::Other(s)
        }
    }

    /// True for the reasons that mean the callee was never actually reached.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EndedReason::Other(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_and_persistence_are_retryable_kinds() {
        assert_eq!(classify(&DialerError::Provider("503".into())), ErrorKind::Provider);
        assert_eq!(
            classify(&DialerError::Persistence(anyhow::anyhow!("locked"))),
            ErrorKind::Persistence
        );
        assert_eq!(classify(&DialerError::validation("1", "short")), ErrorKind::Other);
    }

    #[test]
    fn retryable_end_reasons() {
        for s in [
            "sip-gateway-connect-failure",
            "customer-busy",
            "unknown-error",
            "phone-call-provider-providerfault-telephony-failure",
        ] {
            assert!(EndedReason::parse(s).is_retryable(), "{s} should be retryable");
        }
        assert_eq!(EndedReason::parse("Customer-Busy"), EndedReason::CustomerBusy);
    }

    #[test]
    fn terminal_end_reasons() {
        for s in ["customer-ended-call", "assistant-ended-call", "voicemail", ""] {
            assert!(!EndedReason::parse(s).is_retryable(), "{s} should not be retryable");
        }
    }
}
