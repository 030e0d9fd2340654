//! Resolved supervisor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use super::expand::{env_lookup, expand_home};
use super::loader::PathOverrides;

/// Cache-root environment variable consulted for the default PID location.
pub const CACHE_HOME_VAR: &str = "XDG_CACHE_HOME";

/// PID file location beneath the cache root.
pub const PID_SUBPATH: &str = "repowatch/inotify-daemon.pid";

/// Report file written by the daemon, relative to the component directory.
pub const DEFAULT_REPORT_FILE: &str = "inotify-changes-report.json";

/// Submodule report read by the daemon, relative to the component directory.
pub const DEFAULT_GIT_SUBMODULES_REPORT: &str = "../git-submodules.report";

/// Executable name of the daemon inside the component directory.
pub const DAEMON_EXECUTABLE: &str = "inotify-daemon";

/// Component directory beneath the repository root.
pub const COMPONENT_DIR: &str = "inotify-watcher";

/// Config document name inside the component directory.
pub const CONFIG_FILE: &str = "index.json";

/// Fixed waits used while driving the daemon.
///
/// None of these are acknowledgements from the daemon. They only give it
/// time to reach a state we cannot observe directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timings {
    /// How long a fresh daemon must survive before it counts as started.
    pub startup_settle: Duration,
    /// Extra wait after a launch so the daemon can set up its watches.
    pub post_launch_settle: Duration,
    /// Upper bound on waiting for the report after a notification.
    pub report_settle: Duration,
    /// Granularity of every polling loop.
    pub poll_interval: Duration,
    /// Upper bound on waiting for the daemon to exit after `SIGTERM`.
    pub stop_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            startup_settle: Duration::from_millis(500),
            post_launch_settle: Duration::from_secs(1),
            report_settle: Duration::from_millis(200),
            poll_interval: Duration::from_millis(25),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

/// Paths the supervisor works with for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorConfig {
    /// Where the daemon's process id is recorded.
    pub pid_file: PathBuf,
    /// Report the daemon regenerates on request.
    pub report_file: PathBuf,
    /// Submodule listing the daemon reads its watch roots from.
    pub git_submodules_report: PathBuf,
    /// Daemon executable to launch when none is running.
    pub daemon_executable: PathBuf,
    #[serde(skip)]
    pub timings: Timings,
}

impl SupervisorConfig {
    /// Built-in defaults for a component directory.
    #[must_use]
    pub fn defaults(component_dir: &Path) -> Self {
        Self {
            pid_file: default_pid_file(),
            report_file: component_dir.join(DEFAULT_REPORT_FILE),
            git_submodules_report: component_dir.join(DEFAULT_GIT_SUBMODULES_REPORT),
            daemon_executable: component_dir.join(DAEMON_EXECUTABLE),
            timings: Timings::default(),
        }
    }

    /// Defaults overlaid with whatever the config document supplied.
    ///
    /// Relative paths are anchored at the component directory.
    #[must_use]
    pub fn from_overrides(component_dir: &Path, overrides: PathOverrides) -> Self {
        let mut config = Self::defaults(component_dir);
        if let Some(path) = overrides.pid_file {
            config.pid_file = component_dir.join(path);
        }
        if let Some(path) = overrides.report_file {
            config.report_file = component_dir.join(path);
        }
        if let Some(path) = overrides.git_submodules_report {
            config.git_submodules_report = component_dir.join(path);
        }
        config
    }

    /// Override the daemon executable.
    #[must_use]
    pub fn with_daemon_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.daemon_executable = path.into();
        self
    }

    /// Override the wait timings.
    #[must_use]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

/// Default PID file: `$XDG_CACHE_HOME/repowatch/inotify-daemon.pid`, with
/// `~/.cache` standing in for an unset or empty cache root.
#[must_use]
pub fn default_pid_file() -> PathBuf {
    default_pid_file_with(env_lookup)
}

/// Same as [`default_pid_file`] with an explicit variable lookup.
pub fn default_pid_file_with<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    cache_root(lookup(CACHE_HOME_VAR), dirs::home_dir()).join(PID_SUBPATH)
}

fn cache_root(configured: Option<String>, home: Option<PathBuf>) -> PathBuf {
    match configured.filter(|root| !root.is_empty()) {
        Some(root) => PathBuf::from(expand_home(&root).into_owned()),
        None => home.unwrap_or_default().join(".cache"),
    }
}

/// Component directory to use when none was given.
///
/// Run from the repository root, the daemon lives one level down in
/// [`COMPONENT_DIR`]; step into it unless `start` already holds a daemon.
#[must_use]
pub fn locate_component_dir(start: &Path) -> PathBuf {
    let nested = start.join(COMPONENT_DIR);
    if !start.join(DAEMON_EXECUTABLE).exists() && nested.is_dir() {
        nested
    } else {
        start.to_path_buf()
    }
}
