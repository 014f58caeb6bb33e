//! Queue-entry write operations: insert and state transitions.

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::super::db::{to_unix, unix_timestamp, DialerDb};
use super::super::types::{EntryId, EntryStatus, NewQueueEntry, QueueEntry};
use super::read::{entry_from_row, ENTRY_COLUMNS};

impl DialerDb {
    /// Insert a pending entry.
    pub async fn insert_entry(&self, entry: &NewQueueEntry) -> Result<EntryId> {
        let now = unix_timestamp();
        let row_id = sqlx::query(
            r#"
            INSERT INTO queue_entries (
                job_id, phone_number, display_name, assistant_id, line_ids_json,
                retry_count, priority, status, scheduled_at, delay_secs,
                window_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, 'pending', ?7, 0, ?8, ?9, ?10)
            "#,
        )
        .bind(entry.job_id)
        .bind(&entry.phone_number)
        .bind(&entry.display_name)
        .bind(&entry.assistant_id)
        .bind(serde_json::to_string(&entry.line_ids)?)
        .bind(entry.priority)
        .bind(to_unix(entry.scheduled_at))
        .bind(serde_json::to_string(&entry.window)?)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();
        Ok(row_id)
    }

    /// Atomically claim a pending entry that is due at `now` and return the
    /// claimed row. `None` if it is no longer pending or was requeued to a
    /// later time.
    pub async fn claim_entry(&self, id: EntryId, now: DateTime<Utc>) -> Result<Option<QueueEntry>> {
        let sql = format!(
            r#"
            UPDATE queue_entries
            SET status = 'running',
                updated_at = ?1
            WHERE id = ?2 AND status = 'pending' AND scheduled_at <= ?3
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(unix_timestamp())
            .bind(id)
            .bind(to_unix(now))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    /// Put an entry back to pending with a new due time. `retry_count` is the
    /// value to store (unchanged for capacity/schedule requeues).
    pub async fn requeue_entry(
        &self,
        id: EntryId,
        scheduled_at: DateTime<Utc>,
        delay_secs: i64,
        retry_count: u32,
        last_error: Option<&str>,
    ) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE queue_entries
            SET status = 'pending',
                scheduled_at = ?1,
                delay_secs = ?2,
                retry_count = ?3,
                last_error = COALESCE(?4, last_error),
                updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(to_unix(scheduled_at))
        .bind(delay_secs)
        .bind(i64::from(retry_count))
        .bind(last_error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Provider accepted the call.
    pub async fn complete_entry(&self, id: EntryId, call_id: &str, line_id: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE queue_entries
            SET status = 'dispatched',
                provider_call_id = ?1,
                line_id = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(call_id)
        .bind(line_id)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Webhook reported a normal end for a dispatched call.
    pub async fn confirm_entry(&self, id: EntryId) -> Result<bool> {
        self.transition(id, EntryStatus::Dispatched, EntryStatus::Confirmed, None)
            .await
    }

    /// Mark an entry permanently failed. `retry_count` is stored as given.
    pub async fn fail_entry(&self, id: EntryId, retry_count: u32, reason: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE queue_entries
            SET status = 'failed',
                retry_count = ?1,
                last_error = ?2,
                updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(i64::from(retry_count))
        .bind(reason)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Move a dispatched entry to failed after the webhook reported a retryable
    /// end. Returns false if the entry was not in `dispatched`.
    pub async fn fail_dispatched_entry(&self, id: EntryId, reason: &str) -> Result<bool> {
        self.transition(id, EntryStatus::Dispatched, EntryStatus::Failed, Some(reason))
            .await
    }

    async fn transition(
        &self,
        id: EntryId,
        from: EntryStatus,
        to: EntryStatus,
        last_error: Option<&str>,
    ) -> Result<bool> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE queue_entries
            SET status = ?1,
                last_error = COALESCE(?2, last_error),
                updated_at = ?3
            WHERE id = ?4 AND status = ?5
            "#,
        )
        .bind(to.as_str())
        .bind(last_error)
        .bind(now)
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }

    /// Normalize any entry left in `running` to `pending` (e.g. after a crash).
    /// Call before the first batch so stranded entries are dialed again.
    /// Returns the number of entries reset.
    pub async fn recover_running_entries(&self) -> Result<u64> {
        let now = unix_timestamp();
        let r = sqlx::query(
            r#"
            UPDATE queue_entries
            SET status = 'pending',
                updated_at = ?1
            WHERE status = 'running'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }
}
