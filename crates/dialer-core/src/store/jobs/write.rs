//! Job write operations: create, status, failed numbers, notes, aggregates, remove.

use anyhow::{bail, Context, Result};
use sqlx::Row;

use super::super::db::{to_unix, unix_timestamp, DialerDb};
use super::super::types::{EntryCounts, JobAggregates, JobId, JobStatus, NewJob};

impl DialerDb {
    /// Insert a new pending job. `total_calls` is the number of target phone numbers.
    pub async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        if job.phone_numbers.is_empty() {
            bail!("job {:?} has no phone numbers", job.name);
        }
        if job.display_names.len() > job.phone_numbers.len() {
            bail!(
                "job {:?} has {} display names for {} numbers",
                job.name,
                job.display_names.len(),
                job.phone_numbers.len()
            );
        }
        let now = unix_timestamp();
        let mut names = job.display_names.clone();
        names.resize(job.phone_numbers.len(), String::new());

        let row_id = sqlx::query(
            r#"
            INSERT INTO jobs (
                name, phone_numbers_json, display_names_json, assistant_id,
                line_ids_json, window_json, scheduled_at, total_calls,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&job.name)
        .bind(serde_json::to_string(&job.phone_numbers)?)
        .bind(serde_json::to_string(&names)?)
        .bind(&job.assistant_id)
        .bind(serde_json::to_string(&job.line_ids)?)
        .bind(serde_json::to_string(&job.window)?)
        .bind(job.scheduled_at.map(to_unix))
        .bind(job.phone_numbers.len() as i64)
        .bind(JobStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(row_id)
    }

    /// Update the status of an existing job.
    pub async fn set_job_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flip a pending job to running. Returns true if this call made the change.
    pub async fn mark_job_running_if_pending(&self, id: JobId) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'running',
                updated_at = ?1
            WHERE id = ?2 AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Add `number` to the job's failed numbers unless already present.
    /// Returns true if the number was added.
    pub async fn record_failed_number(&self, id: JobId, number: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let added = add_failed_number(&mut tx, id, number).await?;
        tx.commit().await?;
        Ok(added)
    }

    /// Record a number rejected before enqueue: listed in failed numbers,
    /// counted in `rejected_calls` and explained in the job notes.
    pub async fn record_rejected_number(&self, id: JobId, number: &str, note: &str) -> Result<()> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;
        add_failed_number(&mut tx, id, number).await?;
        sqlx::query(
            r#"
            UPDATE jobs
            SET rejected_calls = rejected_calls + 1,
                notes = CASE WHEN notes = '' THEN ?1 ELSE notes || char(10) || ?1 END,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(note)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Append one line to the job's free-text notes.
    pub async fn append_job_note(&self, id: JobId, note: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE jobs
            SET notes = CASE WHEN notes = '' THEN ?1 ELSE notes || char(10) || ?1 END,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(note)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Recompute completed/failed counters, progress and status from the
    /// job's queue entries and persist them. Returns the new aggregates.
    pub async fn refresh_job_aggregates(&self, id: JobId) -> Result<JobAggregates> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query("SELECT total_calls, rejected_calls, status FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .with_context(|| format!("job {id} not found"))?;
        let total: i64 = job.get("total_calls");
        let rejected: i64 = job.get("rejected_calls");
        let status: String = job.get("status");

        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status IN ('pending', 'running') THEN 1 ELSE 0 END), 0) AS open,
                COALESCE(SUM(CASE WHEN status IN ('dispatched', 'confirmed') THEN 1 ELSE 0 END), 0) AS completed,
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed
            FROM queue_entries
            WHERE job_id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let counts = EntryCounts {
            open: row.get("open"),
            completed: row.get("completed"),
            failed: row.get("failed"),
        };

        let agg = JobAggregates::derive(total, rejected, counts, JobStatus::from_str(&status));
        sqlx::query(
            r#"
            UPDATE jobs
            SET completed_calls = ?1,
                failed_calls = ?2,
                progress = ?3,
                status = ?4,
                updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(agg.completed_calls)
        .bind(agg.failed_calls)
        .bind(agg.progress)
        .bind(agg.status.as_str())
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(agg)
    }

    /// Permanently remove a job and its queue entries.
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM queue_entries WHERE job_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn add_failed_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: JobId,
    number: &str,
) -> Result<bool> {
    let raw: Option<String> = sqlx::query_scalar("SELECT failed_numbers_json FROM jobs WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    let Some(raw) = raw else {
        bail!("job {id} not found");
    };
    let mut numbers: Vec<String> = serde_json::from_str(&raw).context("decode failed numbers")?;
    if numbers.iter().any(|n| n == number) {
        return Ok(false);
    }
    numbers.push(number.to_string());
    sqlx::query("UPDATE jobs SET failed_numbers_json = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(serde_json::to_string(&numbers)?)
        .bind(unix_timestamp())
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(true)
}
