//! `dialer run` – periodic trigger for the dispatcher.

use anyhow::Result;
use dialer_core::config::DialerConfig;
use dialer_core::store::DialerDb;
use std::sync::Arc;
use std::time::Duration;

use super::build_dispatcher;
use crate::cli::control_socket;

pub async fn run_dispatcher(db: &DialerDb, cfg: &DialerConfig, once: bool) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(db, cfg)?);
    dispatcher.recover().await?;

    if once {
        let summary = dispatcher.tick().await?;
        if summary.processed() == 0 {
            println!("No due entries.");
        } else {
            println!(
                "Processed {} entries: {} dispatched, {} requeued, {} failed, {} skipped",
                summary.processed(),
                summary.dispatched,
                summary.requeued,
                summary.failed,
                summary.skipped
            );
        }
        return Ok(());
    }

    let socket_path = dialer_core::config::control_socket_path()?;
    let listener = control_socket::spawn_control_listener(Arc::clone(&dispatcher), &socket_path)?;
    tracing::debug!(path = %socket_path.display(), "control socket listening");

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.poll_interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    println!(
        "Dispatcher running (every {}s, up to {} calls). Ctrl-C to stop.",
        cfg.poll_interval_secs, cfg.max_global_concurrent_calls
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Ticks may overlap; the shared rate limiter bounds concurrent calls.
                let d = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    if let Err(e) = d.tick().await {
                        tracing::warn!("dispatch tick failed: {e}");
                    }
                });
                let stats = dispatcher.stats();
                tracing::debug!(
                    active = stats.total_active_calls,
                    global_at_limit = stats.global_at_limit,
                    busy_lines = stats.busy_lines.len(),
                    "dispatcher stats"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    listener.abort();
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}
