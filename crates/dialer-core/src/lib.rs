pub mod busy_lines;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod provider;
pub mod rate_limiter;
pub mod retry;
pub mod scheduler;
pub mod store;
pub mod webhook;
