//! Tests for status, pause, resume, remove, webhook, completions.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use clap_complete::Shell;

#[test]
fn cli_parse_status() {
    match parse(&["dialer", "status"]) {
        CliCommand::Status => {}
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_pause() {
    match parse(&["dialer", "pause", "42"]) {
        CliCommand::Pause { id } => assert_eq!(id, 42),
        _ => panic!("expected Pause"),
    }
}

#[test]
fn cli_parse_resume() {
    match parse(&["dialer", "resume", "1"]) {
        CliCommand::Resume { id } => assert_eq!(id, 1),
        _ => panic!("expected Resume"),
    }
}

#[test]
fn cli_parse_remove() {
    match parse(&["dialer", "remove", "99"]) {
        CliCommand::Remove { id } => assert_eq!(id, 99),
        _ => panic!("expected Remove"),
    }
}

#[test]
fn cli_parse_pause_requires_numeric_id() {
    assert!(Cli::try_parse_from(["dialer", "pause", "abc"]).is_err());
}

#[test]
fn cli_parse_webhook() {
    match parse(&["dialer", "webhook", "/tmp/payload.json"]) {
        CliCommand::Webhook { path } => {
            assert_eq!(path, std::path::PathBuf::from("/tmp/payload.json"))
        }
        _ => panic!("expected Webhook"),
    }
}

#[test]
fn cli_parse_completions() {
    match parse(&["dialer", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}
