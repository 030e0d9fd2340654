//! Supervisor runner for the repo-watch daemon.
//!
//! One invocation resolves its configuration, makes sure a daemon is
//! running (starting one if the PID record is missing or stale), and then
//! asks it to regenerate its report.
//!
//! Nothing here locks the PID file. Two supervisors racing on an empty
//! record can both launch a daemon; the last PID write wins. A recorded pid
//! that the OS has since reused for an unrelated process is indistinguishable
//! from the daemon and will receive the signal.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::{ConfigError, ConfigLoader, SupervisorConfig};
use crate::daemon::{
    DaemonError, DaemonLauncher, DaemonMessenger, DaemonPid, PidFile, ReportOutcome,
};
use crate::supervisor::{SupervisorState, SupervisorStateMachine};

/// Exit code for any fatal supervisor failure.
pub const FAILURE_EXIT_CODE: u8 = 1;

/// Error type for supervisor operations.
#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// The config document exists but could not be used.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Launching or signalling the daemon failed.
    #[error(transparent)]
    Daemon(#[from] DaemonError),
    /// The resolved configuration could not be printed as JSON.
    #[error("Failed to render config: {0}")]
    Render(#[from] serde_json::Error),
}

impl SupervisorError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        FAILURE_EXIT_CODE
    }
}

/// Result of a successful ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingOutcome {
    /// Daemon that received the report request.
    pub pid: DaemonPid,
    /// Whether this invocation had to start it.
    pub launched: bool,
    pub report: ReportOutcome,
}

/// Daemon state as seen through the PID record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running {
        pid: DaemonPid,
        /// When the PID record was written.
        since: Option<DateTime<Local>>,
    },
    NotRunning,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped(DaemonPid),
    NotRunning,
}

/// Resolve the configuration for a component directory.
///
/// A missing document falls back to built-in defaults with a warning.
///
/// # Errors
///
/// Returns the loader's error if the document exists but is unreadable or
/// malformed.
pub fn resolve_config(
    loader: &ConfigLoader,
    component_dir: &Path,
) -> Result<SupervisorConfig, ConfigError> {
    match loader.load() {
        Ok(overrides) => Ok(SupervisorConfig::from_overrides(component_dir, overrides)),
        Err(err) if err.is_not_found() => {
            tracing::warn!(error = %err, "Config unavailable, using defaults");
            Ok(SupervisorConfig::defaults(component_dir))
        }
        Err(err) => Err(err),
    }
}

fn resolve_tracked(
    state: &mut SupervisorStateMachine,
    loader: &ConfigLoader,
    component_dir: &Path,
) -> Result<SupervisorConfig, ConfigError> {
    match resolve_config(loader, component_dir) {
        Ok(config) => {
            tracing::debug!(pid_file = %config.pid_file.display(), "Config resolved");
            Ok(config)
        }
        Err(err) => {
            state.fail();
            tracing::debug!(error = %err, "Config resolution failed");
            Err(err)
        }
    }
}

/// Drives one supervisor invocation.
#[derive(Debug)]
pub struct Supervisor {
    config: SupervisorConfig,
    pid_file: PidFile,
    state: SupervisorStateMachine,
}

impl Supervisor {
    /// Supervisor for an already resolved configuration.
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        let pid_file = PidFile::new(&config.pid_file);
        Self {
            config,
            pid_file,
            state: SupervisorStateMachine::new(),
        }
    }

    /// Resolve the configuration through `loader` and build a supervisor.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Config` if the document is malformed.
    pub fn load(loader: &ConfigLoader, component_dir: &Path) -> Result<Self, SupervisorError> {
        let mut state = SupervisorStateMachine::new();
        let config = resolve_tracked(&mut state, loader, component_dir)?;
        let pid_file = PidFile::new(&config.pid_file);
        Ok(Self {
            config,
            pid_file,
            state,
        })
    }

    /// Launch `path` instead of the configured daemon executable.
    #[must_use]
    pub fn with_daemon_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = self.config.with_daemon_executable(path);
        self
    }

    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.state.state()
    }

    #[must_use]
    pub fn history(&self) -> &[SupervisorState] {
        self.state.history()
    }

    /// Make sure the daemon runs, then ask it for a fresh report.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Daemon` if the daemon cannot be started or
    /// the report request cannot be delivered. Nothing is retried.
    pub async fn ping(&mut self) -> Result<PingOutcome, SupervisorError> {
        let result = self.run_ping().await;
        match &result {
            Ok(outcome) => {
                self.state.transition(SupervisorState::Done);
                tracing::info!(pid = %outcome.pid, launched = outcome.launched, "Ping complete");
            }
            Err(err) => {
                self.state.fail();
                tracing::debug!(error = %err, "Ping failed");
            }
        }
        result
    }

    async fn run_ping(&mut self) -> Result<PingOutcome, SupervisorError> {
        self.state.transition(SupervisorState::CheckingDaemon);

        let (pid, launched) = if let Some(pid) = self.pid_file.read() {
            self.state.transition(SupervisorState::DaemonLive);
            tracing::debug!(%pid, "Daemon already running");
            (pid, false)
        } else {
            self.state.transition(SupervisorState::Launching);
            (self.launch().await?, true)
        };

        self.state.transition(SupervisorState::Notifying);
        let report = self.messenger().request_report(pid).await?;

        Ok(PingOutcome {
            pid,
            launched,
            report,
        })
    }

    async fn launch(&self) -> Result<DaemonPid, DaemonError> {
        let timings = &self.config.timings;
        let handle = DaemonLauncher::new(&self.config.daemon_executable)
            .with_timings(timings)
            .launch(&self.pid_file)
            .await?;

        // The next invocation only knows about the daemon through the
        // record, so an unrecorded launch cannot count as a success.
        let Some(pid) = self.pid_file.read() else {
            return Err(DaemonError::PidNotRecorded {
                pid: handle.pid,
                path: self.pid_file.path().to_path_buf(),
            });
        };

        tracing::debug!(wait = ?timings.post_launch_settle, "Letting daemon set up its watches");
        tokio::time::sleep(timings.post_launch_settle).await;
        Ok(pid)
    }

    /// Report whether a daemon is recorded and alive.
    ///
    /// A stale record is purged, the same as during a ping.
    #[must_use]
    pub fn status(&self) -> DaemonStatus {
        match self.pid_file.read() {
            Some(pid) => DaemonStatus::Running {
                pid,
                since: self.pid_file.modified().map(DateTime::<Local>::from),
            },
            None => DaemonStatus::NotRunning,
        }
    }

    /// Ask a running daemon to exit and clear its record.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Daemon` if the shutdown signal is refused
    /// or the daemon outlives the stop timeout.
    pub async fn stop(&self) -> Result<StopOutcome, SupervisorError> {
        let Some(pid) = self.pid_file.read() else {
            return Ok(StopOutcome::NotRunning);
        };
        self.messenger().stop(pid).await?;
        self.pid_file.remove();
        Ok(StopOutcome::Stopped(pid))
    }

    /// The resolved configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Render` if a path is not valid UTF-8.
    pub fn render_config(&self) -> Result<String, SupervisorError> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }

    fn messenger(&self) -> DaemonMessenger {
        DaemonMessenger::new(&self.config.timings).watch_report(&self.config.report_file)
    }
}
