//! SQLite-backed store implementation.
//!
//! Handles connection, migrations, and timestamp helpers. Job CRUD lives in
//! `jobs`, queue-entry CRUD in `entries`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed job and queue database.
///
/// The database file is stored under the XDG state directory:
/// `~/.local/state/dialer/dialer.db` on Debian.
#[derive(Clone)]
pub struct DialerDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl DialerDb {
    /// Open (or create) the default database and run migrations.
    pub async fn open_default() -> Result<Self> {
        let state_dir = crate::config::state_dir()?;
        Self::open_at(state_dir.join("dialer.db")).await
    }

    /// Open (or create) the database at a specific path. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let db = DialerDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open a private in-memory database (single connection so every query
    /// sees the same data).
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = DialerDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // - list-valued columns (`*_json`) hold JSON arrays.
        // - `scheduled_at` columns are Unix seconds.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                phone_numbers_json TEXT NOT NULL,
                display_names_json TEXT NOT NULL,
                assistant_id TEXT NOT NULL,
                line_ids_json TEXT NOT NULL,
                window_json TEXT NOT NULL,
                scheduled_at INTEGER,
                total_calls INTEGER NOT NULL,
                completed_calls INTEGER NOT NULL DEFAULT 0,
                failed_calls INTEGER NOT NULL DEFAULT 0,
                rejected_calls INTEGER NOT NULL DEFAULT 0,
                failed_numbers_json TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                notes TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL REFERENCES jobs(id),
                phone_number TEXT NOT NULL,
                display_name TEXT NOT NULL DEFAULT '',
                assistant_id TEXT NOT NULL,
                line_ids_json TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                scheduled_at INTEGER NOT NULL,
                delay_secs INTEGER NOT NULL DEFAULT 0,
                provider_call_id TEXT,
                line_id TEXT,
                window_json TEXT NOT NULL,
                last_error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_queue_entries_due ON queue_entries (status, scheduled_at)",
            "CREATE INDEX IF NOT EXISTS idx_queue_entries_job ON queue_entries (job_id)",
            "CREATE INDEX IF NOT EXISTS idx_queue_entries_call ON queue_entries (provider_call_id)",
        ] {
            sqlx::query(index).execute(&self.pool).await?;
        }

        Ok(())
    }
}

/// Current time as Unix seconds (for row timestamps).
pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

pub(crate) fn to_unix(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
