//! CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::process::Command;

use chrono::{Duration, Local};
use tempfile::TempDir;

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        let cli = Self {
            dir: TempDir::new().unwrap(),
        };
        cli.ok(&["config", "set", "notifications.sound", "false"]);
        cli
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_agenda"))
            .args(args)
            .env("AGENDA_DATA_DIR", self.dir.path())
            .env_remove("AGENDA_LOG")
            .output()
            .expect("failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        (stdout, stderr, output.status.code().unwrap_or(-1))
    }

    fn ok(&self, args: &[&str]) -> String {
        let (stdout, stderr, code) = self.run(args);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let stdout = self.ok(args);
        serde_json::from_str(&stdout).expect("output is not JSON")
    }
}

fn days_from_today(days: i64) -> String {
    (Local::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[test]
fn config_get_set_roundtrip() {
    let cli = Cli::new();
    assert_eq!(cli.ok(&["config", "get", "reminders.poll_interval_secs"]).trim(), "60");
    cli.ok(&["config", "set", "reminders.poll_interval_secs", "15"]);
    assert_eq!(cli.ok(&["config", "get", "reminders.poll_interval_secs"]).trim(), "15");

    let all = cli.json(&["config", "list"]);
    assert_eq!(all["reminders"]["poll_interval_secs"], 15);

    cli.ok(&["config", "reset"]);
    assert_eq!(cli.ok(&["config", "get", "reminders.poll_interval_secs"]).trim(), "60");
}

#[test]
fn config_unknown_key_fails() {
    let cli = Cli::new();
    let (_, stderr, code) = cli.run(&["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (_, _, code) = cli.run(&["config", "set", "reminders.poll_interval_secs", "soon"]);
    assert_eq!(code, 1);
}

#[test]
fn event_lifecycle() {
    let cli = Cli::new();
    let date = days_from_today(7);

    let created = cli.json(&["event", "add", "Dentist", "--date", &date, "--time", "09:30"]);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("evt_"));

    let listed = cli.json(&["event", "list", "--date", &date, "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let edited = cli.json(&["event", "edit", &id, "--title", "Dentist (moved)", "--all-day"]);
    assert_eq!(edited["title"], "Dentist (moved)");
    assert!(edited["time"].is_null());

    let shown = cli.json(&["event", "show", &id]);
    assert_eq!(shown["title"], "Dentist (moved)");

    let found = cli.json(&["event", "search", "dentist", "--json"]);
    assert_eq!(found.as_array().unwrap().len(), 1);

    assert!(cli.ok(&["event", "remove", &id]).contains("removed"));
    let (_, _, code) = cli.run(&["event", "show", &id]);
    assert_eq!(code, 1);
}

#[test]
fn add_rejects_bad_input() {
    let cli = Cli::new();
    let date = days_from_today(1);

    let (_, _, code) = cli.run(&["event", "add", "   ", "--date", &date]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["event", "add", "X", "--date", "2024-13-40"]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["event", "add", "X", "--date", &date, "--time", "25:00"]);
    assert_eq!(code, 1);
    let (_, _, code) = cli.run(&["event", "add", "X", "--date", &days_from_today(4000)]);
    assert_eq!(code, 1);
}

#[test]
fn conflicts_and_past_dates_need_force() {
    let cli = Cli::new();
    let date = days_from_today(3);
    cli.ok(&["event", "add", "First", "--date", &date, "--time", "10:00"]);

    let (stdout, stderr, code) = cli.run(&["event", "add", "Second", "--date", &date, "--time", "10:00"]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Schedule conflict detected"));
    assert!(stderr.contains("--force"));

    cli.ok(&["event", "add", "Second", "--date", &date, "--time", "10:00", "--force"]);

    let yesterday = days_from_today(-1);
    let (stdout, _, code) = cli.run(&["event", "add", "Old", "--date", &yesterday]);
    assert_eq!(code, 1);
    assert!(stdout.contains("Event in the past"));
    cli.ok(&["event", "add", "Old", "--date", &yesterday, "--force"]);

    let stats = cli.json(&["event", "stats"]);
    assert_eq!(stats["total_events"], 3);
}

#[test]
fn remind_check_fires_for_event_starting_now() {
    let cli = Cli::new();
    let now = Local::now().naive_local();
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M").to_string();
    cli.ok(&["event", "add", "Stand-up", "--date", &date, "--time", &time, "--force"]);

    let report = cli.json(&["remind", "check", "--json"]);
    assert_eq!(report["fired"]["event"]["title"], "Stand-up");
    assert_eq!(report["fired"]["title"], "Event starting now");
    assert_eq!(report["stats"]["notified_today"], 1);
    assert_eq!(report["stats"]["suppressed"], true);
}

#[test]
fn remind_check_json_reports_nothing_fired() {
    let cli = Cli::new();
    cli.ok(&["event", "add", "Later", "--date", &days_from_today(2), "--time", "10:00"]);

    let report = cli.json(&["remind", "check", "--json"]);
    assert!(report["fired"].is_null());
    assert_eq!(report["stats"]["notified_today"], 0);
    assert_eq!(report["stats"]["total_events"], 1);
}

#[test]
fn zero_poll_interval_config_is_accepted_and_clamped() {
    let cli = Cli::new();
    cli.ok(&["config", "set", "reminders.poll_interval_secs", "0"]);
    let report = cli.json(&["remind", "check", "--json"]);
    assert_eq!(report["stats"]["interval_secs"], 1);
}

#[test]
fn upcoming_accepts_huge_horizon() {
    let cli = Cli::new();
    cli.ok(&["event", "add", "Far", "--date", &days_from_today(3000)]);
    cli.ok(&["event", "add", "Timed", "--date", &days_from_today(3000), "--time", "08:00"]);
    let found = cli.json(&["remind", "upcoming", "--hours", "10000000000", "--json"]);
    assert_eq!(found.as_array().unwrap().len(), 1);
}

#[test]
fn unreadable_config_is_not_replaced() {
    let cli = Cli::new();
    let path = cli.dir.path().join("config.toml");
    std::fs::write(&path, "reminders = [").unwrap();

    let (_, stderr, code) = cli.run(&["config", "list"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "reminders = [");
}

#[test]
fn remind_upcoming_lists_events_in_horizon() {
    let cli = Cli::new();
    let tomorrow = days_from_today(1);
    cli.ok(&["event", "add", "Review", "--date", &tomorrow, "--time", "12:00"]);

    let found = cli.json(&["remind", "upcoming", "--hours", "48", "--json"]);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["event"]["title"], "Review");

    let out = cli.ok(&["remind", "upcoming", "--hours", "1"]);
    assert!(out.contains("no events"));
}

#[test]
fn remind_test_and_validate() {
    let cli = Cli::new();
    let out = cli.ok(&["remind", "test"]);
    assert!(out.contains("Test notification"));

    cli.ok(&["event", "add", "Later", "--date", &days_from_today(10)]);
    let stats = cli.json(&["remind", "validate"]);
    assert_eq!(stats["total_events"], 1);
    assert_eq!(stats["future_events"], 1);
}

#[test]
fn remind_watch_runs_for_duration() {
    let cli = Cli::new();
    let out = cli.ok(&["remind", "watch", "--duration", "1", "--no-startup-check"]);
    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["total"], 0);
}

#[test]
fn remind_watch_respects_disabled_notifications() {
    let cli = Cli::new();
    cli.ok(&["config", "set", "notifications.enabled", "false"]);
    let out = cli.ok(&["remind", "watch", "--duration", "5"]);
    assert!(out.contains("disabled"));
}
