//! Job read operations: list and get.

use anyhow::{Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::{from_unix, DialerDb};
use super::super::types::{Job, JobId, JobStatus, JobSummary};

fn json_list(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw: String = row.get(column);
    serde_json::from_str(&raw).with_context(|| format!("decode jobs.{column}"))
}

fn job_from_row(row: &SqliteRow) -> Result<Job> {
    let window_json: String = row.get("window_json");
    let scheduled_at: Option<i64> = row.get("scheduled_at");
    let status: String = row.get("status");
    Ok(Job {
        id: row.get("id"),
        name: row.get("name"),
        phone_numbers: json_list(row, "phone_numbers_json")?,
        display_names: json_list(row, "display_names_json")?,
        assistant_id: row.get("assistant_id"),
        line_ids: json_list(row, "line_ids_json")?,
        window: serde_json::from_str(&window_json).context("decode jobs.window_json")?,
        scheduled_at: scheduled_at.map(from_unix),
        total_calls: row.get("total_calls"),
        completed_calls: row.get("completed_calls"),
        failed_calls: row.get("failed_calls"),
        rejected_calls: row.get("rejected_calls"),
        failed_numbers: json_list(row, "failed_numbers_json")?,
        status: JobStatus::from_str(&status),
        progress: row.get("progress"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl DialerDb {
    /// List all jobs in the database, newest first.
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, status, total_calls, completed_calls, failed_calls, progress
            FROM jobs
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row.get("status");
            out.push(JobSummary {
                id: row.get("id"),
                name: row.get("name"),
                status: JobStatus::from_str(&status),
                total_calls: row.get("total_calls"),
                completed_calls: row.get("completed_calls"),
                failed_calls: row.get("failed_calls"),
                progress: row.get("progress"),
            });
        }

        Ok(out)
    }

    /// Fetch a single job with its full definition and counters.
    pub async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let row = sqlx::query(
            r#"
            SELECT
                id, name, phone_numbers_json, display_names_json, assistant_id,
                line_ids_json, window_json, scheduled_at, total_calls,
                completed_calls, failed_calls, rejected_calls, failed_numbers_json,
                status, progress, notes, created_at, updated_at
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    /// Current status only; `None` if the job does not exist.
    pub async fn job_status(&self, id: JobId) -> Result<Option<JobStatus>> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status.as_deref().map(JobStatus::from_str))
    }
}
