//! Starting the daemon as a detached background process.

use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;

use super::error::DaemonError;
use super::pid::PidFile;
use super::probe::{is_alive, DaemonPid};
use crate::config::{Timings, DAEMON_EXECUTABLE};

/// A daemon started by this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonHandle {
    pub pid: DaemonPid,
    pub executable: PathBuf,
    /// Whether the pid made it into the PID file. When it did not, later
    /// invocations will not find this daemon and will start another one.
    pub recorded: bool,
}

/// Spawns the daemon and confirms it survives startup.
#[derive(Debug, Clone)]
pub struct DaemonLauncher {
    executable: PathBuf,
    process_name: String,
    startup_settle: Duration,
    poll_interval: Duration,
}

impl DaemonLauncher {
    /// Launcher for `executable` with default timings.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let timings = Timings::default();
        Self {
            executable: executable.into(),
            process_name: DAEMON_EXECUTABLE.to_string(),
            startup_settle: timings.startup_settle,
            poll_interval: timings.poll_interval,
        }
    }

    /// Use the startup window and poll interval from `timings`.
    #[must_use]
    pub fn with_timings(mut self, timings: &Timings) -> Self {
        self.startup_settle = timings.startup_settle;
        self.poll_interval = timings.poll_interval;
        self
    }

    /// Name the daemon sees as `argv[0]`.
    #[must_use]
    pub fn process_name(mut self, name: impl Into<String>) -> Self {
        self.process_name = name.into();
        self
    }

    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Start the daemon and record its pid.
    ///
    /// The daemon runs from its own directory, in its own process group,
    /// with its standard streams detached, and is never waited on. It must
    /// stay alive for the whole startup window to count as started. Failing
    /// to write the PID file only produces a warning and an unrecorded handle.
    ///
    /// # Errors
    ///
    /// Returns `ExecutableMissing` before spawning anything if the
    /// executable is absent, `SpawnFailed` if the OS rejects it, and
    /// `StartupNotConfirmed` if the daemon exits during the startup window.
    pub async fn launch(&self, pid_file: &PidFile) -> Result<DaemonHandle, DaemonError> {
        if !is_executable(&self.executable) {
            return Err(DaemonError::ExecutableMissing {
                path: self.executable.clone(),
            });
        }

        let mut child = self.spawn()?;
        let Some(pid) = child.id().and_then(DaemonPid::from_child_id) else {
            // Already reaped, so it exited immediately.
            return Err(DaemonError::SpawnFailed {
                path: self.executable.clone(),
                source: std::io::Error::other("daemon exited before its pid could be read"),
            });
        };

        tracing::info!(%pid, executable = %self.executable.display(), "Spawned daemon");

        if let Some(status) = self.watch_startup(&mut child).await {
            return Err(DaemonError::StartupNotConfirmed {
                pid,
                status: Some(status),
            });
        }
        if !is_alive(pid) {
            return Err(DaemonError::StartupNotConfirmed { pid, status: None });
        }

        let recorded = match pid_file.write(pid) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%pid, error = %err, "Daemon is running but its pid was not recorded");
                false
            }
        };

        Ok(DaemonHandle {
            pid,
            executable: self.executable.clone(),
            recorded,
        })
    }

    fn spawn(&self) -> Result<Child, DaemonError> {
        // Absolute, so changing the working directory cannot change what runs.
        let program = std::path::absolute(&self.executable).map_err(|source| {
            DaemonError::SpawnFailed {
                path: self.executable.clone(),
                source,
            }
        })?;
        let mut cmd = std::process::Command::new(&program);
        cmd.arg0(&self.process_name)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0);
        // The daemon resolves its own relative paths from its directory.
        if let Some(dir) = program.parent() {
            cmd.current_dir(dir);
        }

        Command::from(cmd)
            .spawn()
            .map_err(|source| DaemonError::SpawnFailed {
                path: self.executable.clone(),
                source,
            })
    }

    /// Poll the child until the startup window closes.
    ///
    /// Returns the exit status if it died in the meantime.
    async fn watch_startup(&self, child: &mut Child) -> Option<ExitStatus> {
        let deadline = Instant::now() + self.startup_settle;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "Daemon exited during startup");
                    return Some(status);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Could not query daemon exit status");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Whether `path` is a regular file with an execute bit set.
#[must_use]
pub fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
