//! `dialer add` – create a job from a numbers file and enqueue it.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use dialer_core::config::DialerConfig;
use dialer_core::scheduler::{SchedulePolicy, Scheduler, TimeWindowConfig};
use dialer_core::store::{DialerDb, NewJob};
use std::path::PathBuf;

use super::build_dispatcher;

#[derive(Debug, Clone)]
pub struct AddArgs {
    pub name: String,
    pub assistant: String,
    pub lines: Vec<String>,
    pub numbers: PathBuf,
    pub start: String,
    pub end: String,
    pub weekends: bool,
    pub timezone: String,
    pub at: Option<DateTime<Utc>>,
}

/// Parse `number[,display name]` lines. Blank lines and `#` comments are skipped.
pub(crate) fn parse_numbers(text: &str) -> (Vec<String>, Vec<String>) {
    let mut numbers = Vec::new();
    let mut names = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (number, name) = line.split_once(',').unwrap_or((line, ""));
        numbers.push(number.trim().to_string());
        names.push(name.trim().to_string());
    }
    (numbers, names)
}

/// Reject a window the dispatcher could never schedule (bad "HH:MM").
pub(crate) fn check_window(window: &TimeWindowConfig, cfg: &DialerConfig) -> Result<()> {
    let policy = SchedulePolicy::from_config(cfg)?;
    Scheduler::for_window(window, &policy).context("invalid time window")?;
    Ok(())
}

pub async fn run_add(db: &DialerDb, cfg: &DialerConfig, args: AddArgs) -> Result<()> {
    let text = tokio::fs::read_to_string(&args.numbers)
        .await
        .with_context(|| format!("read numbers file {}", args.numbers.display()))?;
    let (phone_numbers, display_names) = parse_numbers(&text);
    if phone_numbers.is_empty() {
        bail!("no phone numbers in {}", args.numbers.display());
    }
    let line_ids: Vec<String> = args
        .lines
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if line_ids.is_empty() {
        bail!("at least one outbound line is required");
    }

    let window = TimeWindowConfig {
        start_time: args.start,
        end_time: args.end,
        allow_weekends: args.weekends,
        timezone: args.timezone,
    };
    check_window(&window, cfg)?;
    let job = NewJob {
        name: args.name,
        phone_numbers,
        display_names,
        assistant_id: args.assistant,
        line_ids,
        window,
        scheduled_at: args.at,
    };

    let dispatcher = build_dispatcher(db, cfg)?;
    let id = db.create_job(&job).await?;
    let report = dispatcher.enqueue_job(id).await?;
    println!(
        "Added job {id} ({}): {} enqueued, {} rejected",
        job.name, report.enqueued, report.failed
    );
    Ok(())
}
