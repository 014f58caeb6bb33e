//! `dialer resume <id>` – resume a paused job.

use anyhow::{bail, Result};
use dialer_core::store::{DialerDb, JobStatus};

pub async fn run_resume(db: &DialerDb, id: i64) -> Result<()> {
    let Some(job) = db.get_job(id).await? else {
        bail!("job {id} not found");
    };
    if job.status != JobStatus::Paused {
        bail!("job {id} is {}, not paused", job.status.as_str());
    }
    let status = if job.completed_calls + job.failed_calls == 0 {
        JobStatus::Pending
    } else {
        JobStatus::Running
    };
    db.set_job_status(id, status).await?;
    println!("Resumed job {id}");
    Ok(())
}
