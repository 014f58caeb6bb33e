//! `dialer pause <id>` – pause a job. A running `dialer run` holds its entries
//! at the next dispatch.

use anyhow::{bail, Result};
use dialer_core::store::{DialerDb, JobStatus};

use crate::cli::control_socket;

pub async fn run_pause(db: &DialerDb, id: i64) -> Result<()> {
    if db.job_status(id).await?.is_none() {
        bail!("job {id} not found");
    }
    db.set_job_status(id, JobStatus::Paused).await?;
    if let Ok(path) = dialer_core::config::control_socket_path() {
        let _ = control_socket::send_pause(&path, id).await;
    }
    println!("Paused job {id}");
    Ok(())
}
