//! Shared fixtures: a throwaway component directory with a shell daemon.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

use nix::sys::signal::Signal;
use repo_watch::config::{SupervisorConfig, Timings};
use repo_watch::daemon::{send_signal, DaemonPid, PidFile};
use tempfile::TempDir;

/// Stand-in daemon: rewrites the report on USR1, exits on TERM.
const DAEMON_SCRIPT: &str = r#"#!/bin/sh
report="$1"
trap 'printf "{\"report_type\":\"inotify_file_changes\"}\n" > "$report.tmp" && mv "$report.tmp" "$report"' USR1
trap 'exit 0' TERM
while :; do sleep 0.05; done
"#;

/// A component directory laid out like a real install.
pub struct Fixture {
    pub root: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            root: TempDir::new().unwrap(),
        };
        fs::create_dir_all(fixture.component_dir()).unwrap();
        fixture
    }

    /// Fixture whose component directory holds a working daemon.
    pub fn with_daemon() -> Self {
        let fixture = Self::new();
        fixture.install_daemon();
        fixture
    }

    pub fn component_dir(&self) -> PathBuf {
        self.root.path().join("inotify-watcher")
    }

    pub fn daemon_path(&self) -> PathBuf {
        self.component_dir().join("inotify-daemon")
    }

    pub fn cache_home(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.cache_home().join("repowatch").join("inotify-daemon.pid")
    }

    pub fn report_path(&self) -> PathBuf {
        self.component_dir().join("inotify-changes-report.json")
    }

    pub fn pid_file(&self) -> PidFile {
        PidFile::new(self.pid_path())
    }

    /// Install the stand-in daemon behind a wrapper that passes the report
    /// path, since the launcher starts the daemon without arguments.
    pub fn install_daemon(&self) {
        let inner = self.component_dir().join("fake-daemon.sh");
        write_executable(&inner, DAEMON_SCRIPT);
        let wrapper = format!(
            "#!/bin/sh\nexec /bin/sh '{}' '{}'\n",
            inner.display(),
            self.report_path().display()
        );
        write_executable(&self.daemon_path(), &wrapper);
    }

    /// Supervisor config rooted in this fixture with short waits.
    pub fn config(&self) -> SupervisorConfig {
        SupervisorConfig {
            pid_file: self.pid_path(),
            ..SupervisorConfig::defaults(&self.component_dir())
        }
        .with_timings(fast_timings())
    }

    pub fn write_index(&self, content: &str) {
        fs::write(self.component_dir().join("index.json"), content).unwrap();
    }

    /// Run the binary against this fixture.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_repo-watch"))
            .arg("--dir")
            .arg(self.component_dir())
            .args(args)
            .env("XDG_CACHE_HOME", self.cache_home())
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute repo-watch")
    }

    /// Spawn the stand-in daemon directly, as a child of the test.
    pub fn spawn_daemon(&self) -> std::process::Child {
        let child = Command::new(self.daemon_path()).spawn().unwrap();
        // Give the shell time to install its traps.
        std::thread::sleep(Duration::from_millis(200));
        child
    }
}

pub fn fast_timings() -> Timings {
    Timings {
        startup_settle: Duration::from_millis(200),
        post_launch_settle: Duration::from_millis(300),
        report_settle: Duration::from_millis(500),
        poll_interval: Duration::from_millis(10),
        stop_timeout: Duration::from_secs(2),
    }
}

pub fn write_executable(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Pid of a process that has exited and been reaped.
pub fn dead_pid() -> DaemonPid {
    let mut child = Command::new("true").spawn().unwrap();
    let pid = DaemonPid::from_child_id(child.id()).unwrap();
    child.wait().unwrap();
    pid
}

pub fn pid_of(child: &std::process::Child) -> DaemonPid {
    DaemonPid::from_child_id(child.id()).unwrap()
}

/// Best-effort cleanup of a daemon started during a test.
pub fn kill(pid: DaemonPid) {
    let _ = send_signal(pid, Signal::SIGKILL);
}

/// Poll until `check` holds or `timeout` elapses.
pub fn eventually(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    check()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
