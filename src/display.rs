//! Colored CLI output for supervisor commands.

use chrono::{DateTime, Local};
use owo_colors::OwoColorize;

use crate::daemon::ReportOutcome;
use crate::supervisor::{DaemonStatus, PingOutcome, StopOutcome};

/// Timestamp format used in status output.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Plain-text status line, shared by the colored printer and tests.
#[must_use]
pub fn format_status(status: &DaemonStatus) -> String {
    match status {
        DaemonStatus::Running { pid, since } => match since {
            Some(since) => format!("running (pid {pid}, recorded {})", format_time(since)),
            None => format!("running (pid {pid})"),
        },
        DaemonStatus::NotRunning => "not running".to_string(),
    }
}

fn format_time(time: &DateTime<Local>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Print the daemon status.
pub fn print_status(status: &DaemonStatus) {
    let line = format_status(status);
    match status {
        DaemonStatus::Running { .. } => println!("{}", line.green()),
        DaemonStatus::NotRunning => println!("{}", line.yellow()),
    }
}

/// Print the result of a stop request.
pub fn print_stop(outcome: &StopOutcome) {
    match outcome {
        StopOutcome::Stopped(pid) => println!("{} (pid {pid})", "stopped".green()),
        StopOutcome::NotRunning => println!("{}", "not running".yellow()),
    }
}

/// Log the result of a ping. Pings print nothing on success.
pub fn log_ping(outcome: &PingOutcome) {
    let action = if outcome.launched { "started" } else { "reused" };
    match outcome.report {
        ReportOutcome::Refreshed => {
            tracing::info!(pid = %outcome.pid, action, "Report refreshed");
        }
        ReportOutcome::Unconfirmed => {
            tracing::info!(pid = %outcome.pid, action, "Report requested, not yet observed");
        }
    }
}

/// Print a fatal error to standard error.
pub fn print_error(err: &dyn std::error::Error) {
    eprintln!("{} {err}", "error:".red().bold());
}
