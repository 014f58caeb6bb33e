//! `dialer remove <id>` – remove a job and its queue entries.

use anyhow::Result;
use dialer_core::store::DialerDb;

pub async fn run_remove(db: &DialerDb, id: i64) -> Result<()> {
    db.remove_job(id).await?;
    println!("Removed job {id}");
    Ok(())
}
