//! CLI for the outbound call dispatcher.

mod commands;
mod control_socket;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use dialer_core::config;
use dialer_core::store::DialerDb;
use std::path::PathBuf;

use commands::{
    run_add, run_completions, run_dispatcher, run_pause, run_remove, run_resume, run_status,
    run_webhook, AddArgs,
};

/// Top-level CLI for the outbound call dispatcher.
#[derive(Debug, Parser)]
#[command(name = "dialer")]
#[command(about = "dialer: outbound call dispatcher with business-hours scheduling and rate limits", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create a calling job from a numbers file and enqueue it.
    Add {
        /// Job name.
        #[arg(long)]
        name: String,
        /// Assistant the provider should run on each call.
        #[arg(long)]
        assistant: String,
        /// Outbound line ids, comma separated. The job dials at most this many calls at once.
        #[arg(long, value_delimiter = ',', required = true)]
        lines: Vec<String>,
        /// File with one `number[,display name]` per line (`#` starts a comment).
        #[arg(long, value_name = "FILE")]
        numbers: PathBuf,
        /// Local start of the calling window (HH:MM).
        #[arg(long, default_value = "09:00")]
        start: String,
        /// Local end of the calling window (HH:MM).
        #[arg(long, default_value = "17:00")]
        end: String,
        /// Also call on Saturdays and Sundays.
        #[arg(long)]
        weekends: bool,
        /// IANA timezone of the calling window.
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// Do not dial before this instant (RFC 3339).
        #[arg(long, value_name = "RFC3339")]
        at: Option<DateTime<Utc>>,
    },

    /// Run the dispatcher loop: dial due entries every poll interval.
    Run {
        /// Process a single batch and exit.
        #[arg(long)]
        once: bool,
    },

    /// Show status of all jobs.
    Status,

    /// Pause a job by its ID. Pending entries stay queued until resumed.
    Pause {
        /// Job identifier.
        id: i64,
    },

    /// Resume a paused job by its ID.
    Resume {
        /// Job identifier.
        id: i64,
    },

    /// Remove a job and its queue entries by ID.
    Remove {
        /// Job identifier.
        id: i64,
    },

    /// Deliver a provider status webhook (JSON file) to the dispatcher.
    Webhook {
        /// Path to the JSON payload.
        path: PathBuf,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let db = DialerDb::open_default().await?;

        match cli.command {
            CliCommand::Add {
                name,
                assistant,
                lines,
                numbers,
                start,
                end,
                weekends,
                timezone,
                at,
            } => {
                let args = AddArgs {
                    name,
                    assistant,
                    lines,
                    numbers,
                    start,
                    end,
                    weekends,
                    timezone,
                    at,
                };
                run_add(&db, &cfg, args).await?
            }
            CliCommand::Run { once } => run_dispatcher(&db, &cfg, once).await?,
            CliCommand::Status => run_status(&db).await?,
            CliCommand::Pause { id } => run_pause(&db, id).await?,
            CliCommand::Resume { id } => run_resume(&db, id).await?,
            CliCommand::Remove { id } => run_remove(&db, id).await?,
            CliCommand::Webhook { path } => run_webhook(&db, &cfg, &path).await?,
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
