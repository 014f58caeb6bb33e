//! Reconcile provider status webhooks with dispatched entries.
//!
//! A dialed entry is `dispatched` as soon as the provider accepts the call.
//! The end-of-call webhook either confirms it or, for reasons that mean the
//! callee was never reached, turns it into a failure. Job counters are then
//! recomputed from entry states, so repeated deliveries change nothing.

use serde::Deserialize;

use crate::dispatcher::Dispatcher;
use crate::error::DialerError;
use crate::retry::EndedReason;
use crate::store::EntryStatus;

/// Status update as delivered by the provider.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub status: String,
    #[serde(default)]
    pub ended_reason: Option<String>,
    pub call: WebhookCall,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebhookCall {
    pub id: String,
    #[serde(default)]
    pub customer: Option<WebhookCustomer>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebhookCustomer {
    pub number: String,
}

impl WebhookPayload {
    pub fn from_json(raw: &str) -> Result<Self, DialerError> {
        serde_json::from_str(raw).map_err(|e| DialerError::Config(format!("invalid webhook payload: {e}")))
    }

    fn is_ended(&self) -> bool {
        self.status.eq_ignore_ascii_case("ended")
    }
}

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Not an end-of-call event.
    Ignored,
    /// No entry was dialed with this call id.
    UnknownCall,
    /// Normal end: entry confirmed.
    Confirmed,
    /// Retryable end: entry failed, number listed on the job.
    Failed,
    /// Retryable end but the entry already used its retries; left as is.
    AtRetryCap,
    /// Entry had already been confirmed or failed.
    AlreadyResolved,
}

impl Dispatcher {
    pub async fn reconcile_webhook(&self, payload: &WebhookPayload) -> Result<ReconcileOutcome, DialerError> {
        if !payload.is_ended() {
            return Ok(ReconcileOutcome::Ignored);
        }
        let call_id = payload.call.id.as_str();
        let Some(entry) = self
            .db()
            .find_entry_by_call_id(call_id)
            .await
            .map_err(DialerError::Persistence)?
        else {
            tracing::warn!(call_id, "webhook for unknown call");
            return Ok(ReconcileOutcome::UnknownCall);
        };
        if let Some(customer) = &payload.call.customer {
            if customer.number != entry.phone_number {
                tracing::warn!(call_id, entry_id = entry.id, number = %customer.number, "webhook number differs from entry");
            }
        }
        if entry.status != EntryStatus::Dispatched {
            return Ok(ReconcileOutcome::AlreadyResolved);
        }

        let reason = EndedReason::parse(payload.ended_reason.as_deref().unwrap_or(""));
        let db = self.db();
        let (id, job_id) = (entry.id, entry.job_id);
        let outcome = if !reason.is_retryable() {
            match self.persist("confirm entry", move || db.confirm_entry(id)).await {
                Some(true) => ReconcileOutcome::Confirmed,
                _ => ReconcileOutcome::AlreadyResolved,
            }
        } else if entry.retry_count >= self.max_dial_retries {
            tracing::info!(job_id, entry_id = id, ?reason, "retryable end at retry cap; no retry");
            return Ok(ReconcileOutcome::AtRetryCap);
        } else {
            let text = payload.ended_reason.as_deref().unwrap_or("");
            match self
                .persist("fail dispatched entry", move || db.fail_dispatched_entry(id, text))
                .await
            {
                Some(true) => {
                    let number = entry.phone_number.as_str();
                    self.persist("record failed number", move || db.record_failed_number(job_id, number))
                        .await;
                    tracing::info!(job_id, entry_id = id, ?reason, "call ended unreached; entry failed");
                    ReconcileOutcome::Failed
                }
                _ => ReconcileOutcome::AlreadyResolved,
            }
        };
        self.refresh(job_id).await;
        Ok(outcome)
    }
}
