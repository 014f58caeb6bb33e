//! Retry and backoff policy.
//!
//! This module encapsulates error classification (provider failures,
//! store failures, webhook end reasons) and exponential backoff decisions so
//! that the dispatcher and the store wrappers share a consistent policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify, EndedReason};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
