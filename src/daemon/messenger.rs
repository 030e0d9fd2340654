//! Fire-and-forget requests to a running daemon.
//!
//! The daemon regenerates its change report on `SIGUSR1` and shuts down on
//! `SIGTERM`. Neither is acknowledged, so everything after the send is
//! polling with an upper bound.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use nix::sys::signal::Signal;
use tokio::time::Instant;

use super::error::DaemonError;
use super::probe::{is_alive, send_signal, DaemonPid};
use crate::config::Timings;

/// Signal asking the daemon to write a fresh report.
pub const REPORT_SIGNAL: Signal = Signal::SIGUSR1;

/// Signal asking the daemon to exit.
pub const STOP_SIGNAL: Signal = Signal::SIGTERM;

/// How a notification ended, as far as we could tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The report file changed after the signal was sent.
    Refreshed,
    /// The settle window ran out without a visible change. The daemon may
    /// still be writing.
    Unconfirmed,
}

/// Sends signals to the daemon and waits for visible effects.
#[derive(Debug, Clone)]
pub struct DaemonMessenger {
    report_file: Option<PathBuf>,
    report_settle: Duration,
    stop_timeout: Duration,
    poll_interval: Duration,
}

impl Default for DaemonMessenger {
    fn default() -> Self {
        Self::new(&Timings::default())
    }
}

impl DaemonMessenger {
    #[must_use]
    pub fn new(timings: &Timings) -> Self {
        Self {
            report_file: None,
            report_settle: timings.report_settle,
            stop_timeout: timings.stop_timeout,
            poll_interval: timings.poll_interval,
        }
    }

    /// Watch this file for changes after a report request.
    #[must_use]
    pub fn watch_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_file = Some(path.into());
        self
    }

    /// Ask the daemon to regenerate its report.
    ///
    /// After the signal is accepted, waits up to the report settle window,
    /// returning early if the watched report file changes. A returned
    /// outcome never guarantees the report is complete.
    ///
    /// # Errors
    ///
    /// Returns `SignalDeliveryFailed` if the signal is refused, including
    /// when the daemon exited after it was last probed.
    pub async fn request_report(&self, pid: DaemonPid) -> Result<ReportOutcome, DaemonError> {
        let before = self.report_file.as_deref().and_then(modified);

        send_signal(pid, REPORT_SIGNAL).map_err(|source| DaemonError::SignalDeliveryFailed {
            pid,
            signal: REPORT_SIGNAL,
            source,
        })?;
        tracing::info!(%pid, "Requested report from daemon");

        let outcome = match &self.report_file {
            Some(path) => self.wait_for_change(path, before).await,
            None => {
                tokio::time::sleep(self.report_settle).await;
                ReportOutcome::Unconfirmed
            }
        };
        tracing::debug!(?outcome, "Report wait finished");
        Ok(outcome)
    }

    /// Ask the daemon to exit and wait until it is gone.
    ///
    /// # Errors
    ///
    /// Returns `SignalDeliveryFailed` if the signal is refused and
    /// `StopTimedOut` if the process outlives the stop timeout.
    pub async fn stop(&self, pid: DaemonPid) -> Result<(), DaemonError> {
        send_signal(pid, STOP_SIGNAL).map_err(|source| DaemonError::SignalDeliveryFailed {
            pid,
            signal: STOP_SIGNAL,
            source,
        })?;
        tracing::info!(%pid, "Requested daemon shutdown");

        let deadline = Instant::now() + self.stop_timeout;
        while is_alive(pid) {
            let now = Instant::now();
            if now >= deadline {
                return Err(DaemonError::StopTimedOut {
                    pid,
                    timeout_ms: self.stop_timeout.as_millis(),
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
        Ok(())
    }

    async fn wait_for_change(&self, path: &Path, before: Option<SystemTime>) -> ReportOutcome {
        let deadline = Instant::now() + self.report_settle;
        loop {
            let current = modified(path);
            if current.is_some() && current != before {
                return ReportOutcome::Refreshed;
            }
            let now = Instant::now();
            if now >= deadline {
                return ReportOutcome::Unconfirmed;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
