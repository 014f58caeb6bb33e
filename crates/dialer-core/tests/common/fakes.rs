//! Scripted call provider for dispatcher tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use dialer_core::error::DialerError;
use dialer_core::provider::{CallProvider, CallRequest};

/// Returns scripted results in order, then succeeds. Tracks how many calls
/// were in flight at once.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<(), String>>>,
    always_fail: Option<String>,
    delay: Duration,
    requests: Mutex<Vec<CallRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl ScriptedProvider {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            always_fail: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn with_script(script: Vec<Result<(), String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Hold each call open for `delay` so overlapping batches interleave.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CallRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallProvider for ScriptedProvider {
    async fn create_call(&self, request: &CallRequest) -> Result<String, DialerError> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().pop_front();
        if let Some(msg) = &self.always_fail {
            return Err(DialerError::Provider(msg.clone()));
        }
        match scripted {
            Some(Err(msg)) => Err(DialerError::Provider(msg)),
            _ => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(format!("call-{n}"))
            }
        }
    }
}
