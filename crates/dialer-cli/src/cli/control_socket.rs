//! Control socket: server (during `dialer run`) and client (for `dialer pause`
//! and `dialer webhook`).
//! Protocol: one line per command: "pause <id>" or "webhook <json>".

use anyhow::Result;
use dialer_core::dispatcher::Dispatcher;
use dialer_core::store::JobStatus;
use dialer_core::webhook::WebhookPayload;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

/// One parsed control line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ControlLine {
    Pause(i64),
    Webhook(String),
}

pub(crate) fn parse_line(line: &str) -> Option<ControlLine> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("pause ") {
        return rest.trim().parse().ok().map(ControlLine::Pause);
    }
    if let Some(rest) = line.strip_prefix("webhook ") {
        let json = rest.trim();
        return (!json.is_empty()).then(|| ControlLine::Webhook(json.to_string()));
    }
    None
}

async fn apply(dispatcher: &Dispatcher, line: ControlLine) {
    match line {
        ControlLine::Pause(id) => match dispatcher.db().set_job_status(id, JobStatus::Paused).await {
            Ok(()) => tracing::info!(job_id = id, "paused via control socket"),
            Err(e) => tracing::warn!(job_id = id, "pause failed: {:#}", e),
        },
        ControlLine::Webhook(json) => {
            let payload = match WebhookPayload::from_json(&json) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("control socket webhook: {}", e);
                    return;
                }
            };
            match dispatcher.reconcile_webhook(&payload).await {
                Ok(outcome) => tracing::info!(call_id = %payload.call.id, ?outcome, "webhook reconciled"),
                Err(e) => tracing::warn!(call_id = %payload.call.id, "webhook failed: {}", e),
            }
        }
    }
}

/// Spawns a task that listens on `path` and applies each control line to
/// the dispatcher. Ignores malformed lines.
pub fn spawn_control_listener(
    dispatcher: Arc<Dispatcher>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    let handle = tokio::spawn(async move {
        let _ = std::fs::remove_file(&path);
        let listener = match UnixListener::bind(&path) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(path = %path.display(), "control socket bind: {}", e);
                return;
            }
        };
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream).lines();
                        while let Ok(Some(line)) = reader.next_line().await {
                            match parse_line(&line) {
                                Some(cmd) => apply(&dispatcher, cmd).await,
                                None => tracing::debug!("ignoring control line {:?}", line),
                            }
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

/// Write one line to the control socket. Returns false if nothing is listening.
async fn send_line(socket_path: &Path, line: &str) -> Result<bool> {
    if !socket_path.exists() {
        return Ok(false);
    }
    let mut stream = match tokio::net::UnixStream::connect(socket_path).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %socket_path.display(), "control socket connect: {}", e);
            return Ok(false);
        }
    };
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.shutdown().await?;
    Ok(true)
}

/// Sends "pause <job_id>" so a running dispatcher logs the change.
pub async fn send_pause(socket_path: &Path, job_id: i64) -> Result<bool> {
    send_line(socket_path, &format!("pause {}", job_id)).await
}

/// Sends "webhook <json>" with the payload collapsed onto one line.
pub async fn send_webhook(socket_path: &Path, raw_json: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(raw_json)?;
    send_line(socket_path, &format!("webhook {}", value)).await
}
