//! Queue-entry read operations: get, lookup by call id, list, due batch.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::super::db::{from_unix, to_unix, DialerDb};
use super::super::types::{EntryId, EntryStatus, JobId, QueueEntry};

pub(super) const ENTRY_COLUMNS: &str = r#"
    id, job_id, phone_number, display_name, assistant_id, line_ids_json,
    retry_count, priority, status, scheduled_at, delay_secs, provider_call_id,
    line_id, window_json, last_error, created_at, updated_at
"#;

pub(super) fn entry_from_row(row: &SqliteRow) -> Result<QueueEntry> {
    let line_ids: String = row.get("line_ids_json");
    let window: String = row.get("window_json");
    let status: String = row.get("status");
    let retry_count: i64 = row.get("retry_count");
    let priority: i64 = row.get("priority");
    let scheduled_at: i64 = row.get("scheduled_at");
    Ok(QueueEntry {
        id: row.get("id"),
        job_id: row.get("job_id"),
        phone_number: row.get("phone_number"),
        display_name: row.get("display_name"),
        assistant_id: row.get("assistant_id"),
        line_ids: serde_json::from_str(&line_ids).context("decode queue_entries.line_ids_json")?,
        retry_count: retry_count.max(0) as u32,
        priority: priority as i32,
        status: EntryStatus::from_str(&status),
        scheduled_at: from_unix(scheduled_at),
        delay_secs: row.get("delay_secs"),
        provider_call_id: row.get("provider_call_id"),
        line_id: row.get("line_id"),
        window: serde_json::from_str(&window).context("decode queue_entries.window_json")?,
        last_error: row.get("last_error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl DialerDb {
    pub async fn get_entry(&self, id: EntryId) -> Result<Option<QueueEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    /// Entry that was dialed with the given provider call id.
    pub async fn find_entry_by_call_id(&self, call_id: &str) -> Result<Option<QueueEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE provider_call_id = ?1 ORDER BY id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(call_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    /// All entries of a job in insertion order.
    pub async fn list_entries_for_job(&self, job_id: JobId) -> Result<Vec<QueueEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE job_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Pending entries due at `now`, highest priority first, then least
    /// recently touched.
    pub async fn fetch_due_entries(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM queue_entries
            WHERE status = 'pending' AND scheduled_at <= ?1
            ORDER BY priority DESC, updated_at ASC, id ASC
            LIMIT ?2
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(to_unix(now))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Number of entries currently in `status`.
    pub async fn count_entries(&self, status: EntryStatus) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_entries WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}
