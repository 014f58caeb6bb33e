//! Store opened at a file path survives reopen and crash recovery.

mod common;

use chrono::Utc;
use tempfile::tempdir;

use common::{job, utc_window};
use dialer_core::store::{DialerDb, EntryStatus, JobStatus, NewQueueEntry};

#[tokio::test]
async fn jobs_and_entries_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("dialer.db");

    let (job_id, entry_id) = {
        let db = DialerDb::open_at(&path).await.unwrap();
        let job_id = db
            .create_job(&job("disk", &["+15550001"], &["line-1"], utc_window()))
            .await
            .unwrap();
        let entry_id = db
            .insert_entry(&NewQueueEntry {
                job_id,
                phone_number: "+15550001".into(),
                display_name: String::new(),
                assistant_id: "asst-1".into(),
                line_ids: vec!["line-1".into()],
                priority: 0,
                scheduled_at: Utc::now(),
                window: utc_window(),
            })
            .await
            .unwrap();
        assert!(db.claim_entry(entry_id, Utc::now()).await.unwrap().is_some());
        db.set_job_status(job_id, JobStatus::Running).await.unwrap();
        (job_id, entry_id)
    };
    assert!(path.exists());

    let db = DialerDb::open_at(&path).await.unwrap();
    let job = db.get_job(job_id).await.unwrap().expect("job persisted");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.window, utc_window());
    assert_eq!(db.count_entries(EntryStatus::Running).await.unwrap(), 1);

    assert_eq!(db.recover_running_entries().await.unwrap(), 1);
    let entry = db.get_entry(entry_id).await.unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Pending);
}

#[tokio::test]
async fn path_with_spaces_opens() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("my state").join("dialer.db");
    let db = DialerDb::open_at(&path).await.unwrap();
    assert!(db.list_jobs().await.unwrap().is_empty());
}
