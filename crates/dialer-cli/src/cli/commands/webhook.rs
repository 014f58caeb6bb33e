//! `dialer webhook <file>` – deliver a status webhook payload.

use anyhow::{Context, Result};
use dialer_core::config::DialerConfig;
use dialer_core::store::DialerDb;
use dialer_core::webhook::WebhookPayload;
use std::path::Path;

use super::build_dispatcher;
use crate::cli::control_socket;

/// Forward to a running `dialer run` if one is listening, else reconcile
/// directly against the store.
pub async fn run_webhook(db: &DialerDb, cfg: &DialerConfig, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read webhook payload {}", path.display()))?;
    let payload = WebhookPayload::from_json(&raw)?;

    if let Ok(socket) = dialer_core::config::control_socket_path() {
        if control_socket::send_webhook(&socket, &raw).await.unwrap_or(false) {
            println!("Forwarded webhook for call {} to running dispatcher", payload.call.id);
            return Ok(());
        }
    }

    let dispatcher = build_dispatcher(db, cfg)?;
    let outcome = dispatcher.reconcile_webhook(&payload).await?;
    println!("Webhook for call {}: {:?}", payload.call.id, outcome);
    Ok(())
}
