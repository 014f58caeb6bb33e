//! Persistent job / queue-entry store (SQLite via sqlx).
//!
//! Jobs carry the campaign definition and its derived counters; queue entries
//! are the individual dial attempts the dispatcher works through.

mod db;
mod entries;
mod jobs;
pub mod types;

pub use db::DialerDb;
pub use types::*;
