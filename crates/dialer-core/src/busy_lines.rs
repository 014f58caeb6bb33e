//! Short-lived registry of outbound lines that were just dialed from.
//!
//! A line is marked busy when a dial starts and simply expires after its TTL;
//! there is no required release step, so a crashed attempt frees its line
//! once the TTL elapses. Lookups evict expired entries lazily. Time comes from
//! the dispatcher's clock.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_BUSY_TTL: Duration = Duration::from_secs(60);

pub struct BusyLineCache {
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    lines: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for BusyLineCache {
    fn default() -> Self {
        Self::new(DEFAULT_BUSY_TTL, Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for BusyLineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusyLineCache")
            .field("default_ttl", &self.default_ttl)
            .field("lines", &*self.lock())
            .finish()
    }
}

impl BusyLineCache {
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_ttl,
            clock,
            lines: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark `line_id` busy for the default TTL.
    pub fn mark_busy(&self, line_id: &str) {
        self.mark_busy_for(line_id, self.default_ttl);
    }

    pub fn mark_busy_for(&self, line_id: &str, ttl: Duration) {
        let now = self.clock.now();
        let expiry = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.lock().insert(line_id.to_string(), expiry);
    }

    pub fn mark_free(&self, line_id: &str) {
        self.lock().remove(line_id);
    }

    pub fn is_busy(&self, line_id: &str) -> bool {
        let now = self.clock.now();
        self.is_busy_at(&mut self.lock(), line_id, now)
    }

    fn is_busy_at(
        &self,
        lines: &mut HashMap<String, DateTime<Utc>>,
        line_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match lines.get(line_id) {
            Some(expiry) if *expiry > now => true,
            Some(_) => {
                lines.remove(line_id);
                false
            }
            None => false,
        }
    }

    /// First line in `candidates` that is not busy, in order.
    pub fn first_free<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        let now = self.clock.now();
        let mut lines = self.lock();
        candidates
            .iter()
            .map(String::as_str)
            .find(|line| !self.is_busy_at(&mut lines, line, now))
    }

    /// Prune expired entries and return the lines still busy, sorted.
    pub fn list_busy(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut lines = self.lock();
        lines.retain(|_, expiry| *expiry > now);
        let mut out: Vec<String> = lines.keys().cloned().collect();
        out.sort();
        out
    }
}
