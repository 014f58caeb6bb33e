//! `dialer status` – show status of all jobs.

use anyhow::Result;
use dialer_core::store::DialerDb;

pub async fn run_status(db: &DialerDb) -> Result<()> {
    let jobs = db.list_jobs().await?;
    if jobs.is_empty() {
        println!("No jobs in database.");
    } else {
        println!(
            "{:<6} {:<10} {:>6} {:>6} {:>6} {:>5}  {}",
            "ID", "STATUS", "DONE", "FAILED", "TOTAL", "PCT", "NAME"
        );
        for j in jobs {
            println!(
                "{:<6} {:<10} {:>6} {:>6} {:>6} {:>4}%  {}",
                j.id,
                j.status.as_str(),
                j.completed_calls,
                j.failed_calls,
                j.total_calls,
                j.progress,
                j.name
            );
        }
    }
    Ok(())
}
