//! Daemon lifecycle error types.

use std::path::PathBuf;
use std::process::ExitStatus;

use nix::errno::Errno;
use nix::sys::signal::Signal;

use super::DaemonPid;

/// Errors that can occur while launching or talking to the daemon.
#[derive(thiserror::Error, Debug)]
pub enum DaemonError {
    /// Daemon executable is absent or not executable.
    #[error("Daemon executable not found: {path}")]
    ExecutableMissing { path: PathBuf },

    /// The operating system refused to start the daemon.
    #[error("Failed to spawn daemon {path}: {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The daemon exited before the startup window elapsed.
    #[error("Daemon failed to start (pid {pid}{})", describe_status(.status))]
    StartupNotConfirmed {
        pid: DaemonPid,
        status: Option<ExitStatus>,
    },

    /// The PID record could not be written.
    #[error("Failed to write PID file {path}: {source}")]
    PidFileUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A launch reported success but no live PID record exists afterwards.
    #[error("Daemon started (pid {pid}) but PID file not found: {path}")]
    PidNotRecorded { pid: DaemonPid, path: PathBuf },

    /// The signal was not accepted for the target process.
    #[error("Failed to send {signal} to daemon (pid {pid}): {source}")]
    SignalDeliveryFailed {
        pid: DaemonPid,
        signal: Signal,
        #[source]
        source: Errno,
    },

    /// The daemon was still alive when the stop timeout ran out.
    #[error("Daemon (pid {pid}) did not exit within {timeout_ms}ms")]
    StopTimedOut { pid: DaemonPid, timeout_ms: u128 },
}

fn describe_status(status: &Option<ExitStatus>) -> String {
    match status {
        Some(status) => format!(", {status}"),
        None => String::new(),
    }
}
