//! CLI command handlers. Each command is in its own file.

mod add;
mod completions;
mod pause;
mod remove;
mod resume;
mod run;
mod status;
mod webhook;

use anyhow::Result;
use dialer_core::clock::SystemClock;
use dialer_core::config::DialerConfig;
use dialer_core::dispatcher::Dispatcher;
use dialer_core::provider::HttpCallProvider;
use dialer_core::store::DialerDb;
use std::sync::Arc;

pub use add::{run_add, AddArgs};
pub use completions::run_completions;
pub use pause::run_pause;
pub use remove::run_remove;
pub use resume::run_resume;
pub use run::run_dispatcher;
pub use status::run_status;
pub use webhook::run_webhook;

/// Dispatcher wired to the configured HTTP provider and the system clock.
fn build_dispatcher(db: &DialerDb, cfg: &DialerConfig) -> Result<Dispatcher> {
    let provider = Arc::new(HttpCallProvider::from_config(&cfg.provider));
    Ok(Dispatcher::new(db.clone(), provider, Arc::new(SystemClock), cfg)?)
}
