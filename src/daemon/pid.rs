//! On-disk record of the running daemon's process id.
//!
//! The file holds a single decimal pid followed by a newline. Its presence
//! is the only evidence that a daemon was started; a record whose process
//! has gone away is purged the moment it is read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::error::DaemonError;
use super::probe::{probe, DaemonPid, Liveness};

/// What the PID file currently says about the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidStatus {
    /// No record on disk.
    Missing,
    /// Record names a process that is still running.
    Live(DaemonPid),
    /// Record names a process that no longer exists.
    Stale(DaemonPid),
    /// Record is unreadable or not a positive integer.
    Invalid,
}

/// File-backed daemon pid registry.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid of the live daemon, if any.
    ///
    /// Stale and unparseable records are deleted before returning `None`,
    /// so "never started" and "crashed without cleanup" look the same.
    #[must_use]
    pub fn read(&self) -> Option<DaemonPid> {
        match self.inspect() {
            PidStatus::Live(pid) => Some(pid),
            PidStatus::Missing => None,
            PidStatus::Stale(pid) => {
                tracing::warn!(
                    %pid,
                    path = %self.path.display(),
                    "Removing stale PID file (process no longer running)"
                );
                self.remove();
                None
            }
            PidStatus::Invalid => {
                tracing::warn!(path = %self.path.display(), "Removing unparseable PID file");
                self.remove();
                None
            }
        }
    }

    /// Classify the record without changing anything on disk.
    #[must_use]
    pub fn inspect(&self) -> PidStatus {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return PidStatus::Missing,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Unreadable PID file");
                return PidStatus::Invalid;
            }
        };

        let Some(pid) = parse_pid(&content) else {
            return PidStatus::Invalid;
        };

        match probe(pid) {
            Liveness::Alive | Liveness::AliveForeign => PidStatus::Live(pid),
            Liveness::Gone => PidStatus::Stale(pid),
        }
    }

    /// Record `pid`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns `DaemonError::PidFileUnwritable` if the parent directory
    /// cannot be created or the file cannot be written.
    pub fn write(&self, pid: DaemonPid) -> Result<(), DaemonError> {
        let unwritable = |source| DaemonError::PidFileUnwritable {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(unwritable)?;
            }
        }
        fs::write(&self.path, format!("{pid}\n")).map_err(unwritable)?;

        tracing::debug!(%pid, path = %self.path.display(), "Wrote PID file");
        Ok(())
    }

    /// Delete the record. A missing file is not an error.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove PID file");
            }
        }
    }

    /// When the record was last written.
    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }
}

/// Parse the first line of a PID file.
#[must_use]
pub fn parse_pid(content: &str) -> Option<DaemonPid> {
    content
        .lines()
        .next()?
        .trim()
        .parse::<i32>()
        .ok()
        .and_then(DaemonPid::new)
}
