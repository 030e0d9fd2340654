//! Tests for the supervisor state machine driving real processes.

use std::fs;

use repo_watch::config::SupervisorConfig;
use repo_watch::daemon::{is_alive, DaemonError, ReportOutcome};
use repo_watch::supervisor::{Supervisor, SupervisorError, SupervisorState};

use crate::common::{dead_pid, kill, Fixture};

#[tokio::test]
async fn ping_without_record_launches_and_notifies() {
    let fixture = Fixture::with_daemon();
    let mut supervisor = Supervisor::new(fixture.config());

    let outcome = supervisor.ping().await.unwrap();
    assert!(outcome.launched);
    assert_eq!(outcome.report, ReportOutcome::Refreshed);
    assert_eq!(fixture.pid_file().read(), Some(outcome.pid));
    assert!(fixture.report_path().exists());
    assert_eq!(
        supervisor.history(),
        &[
            SupervisorState::ResolvingConfig,
            SupervisorState::CheckingDaemon,
            SupervisorState::Launching,
            SupervisorState::Notifying,
            SupervisorState::Done,
        ]
    );

    kill(outcome.pid);
}

#[tokio::test]
async fn second_ping_reuses_running_daemon() {
    let fixture = Fixture::with_daemon();

    let first = Supervisor::new(fixture.config()).ping().await.unwrap();
    let mut supervisor = Supervisor::new(fixture.config());
    let second = supervisor.ping().await.unwrap();

    assert!(!second.launched);
    assert_eq!(second.pid, first.pid);
    assert_eq!(supervisor.history()[2], SupervisorState::DaemonLive);

    kill(first.pid);
}

#[tokio::test]
async fn ping_with_stale_record_relaunches() {
    let fixture = Fixture::with_daemon();
    let stale = dead_pid();
    fixture.pid_file().write(stale).unwrap();

    let outcome = Supervisor::new(fixture.config()).ping().await.unwrap();
    assert!(outcome.launched);
    assert_ne!(outcome.pid, stale);
    assert!(is_alive(outcome.pid));
    assert_eq!(
        fs::read_to_string(fixture.pid_path()).unwrap(),
        format!("{}\n", outcome.pid)
    );

    kill(outcome.pid);
}

#[tokio::test]
async fn ping_without_executable_fails_cleanly() {
    let fixture = Fixture::new();
    let mut supervisor = Supervisor::new(fixture.config());

    let err = supervisor.ping().await.unwrap_err();
    assert!(matches!(
        err,
        SupervisorError::Daemon(DaemonError::ExecutableMissing { .. })
    ));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(supervisor.state(), SupervisorState::Failed);
    assert!(!fixture.pid_path().exists());
}

#[tokio::test]
async fn stop_clears_record() {
    let fixture = Fixture::with_daemon();
    let mut child = fixture.spawn_daemon();
    let pid = crate::common::pid_of(&child);
    fixture.pid_file().write(pid).unwrap();
    let reaper = std::thread::spawn(move || child.wait().unwrap());

    let supervisor = Supervisor::new(fixture.config());
    let outcome = supervisor.stop().await.unwrap();

    assert_eq!(outcome, repo_watch::supervisor::StopOutcome::Stopped(pid));
    assert!(!fixture.pid_path().exists());
    assert!(reaper.join().unwrap().success());
}

#[tokio::test]
async fn ping_fails_when_pid_cannot_be_recorded() {
    let fixture = Fixture::with_daemon();
    let blocker = fixture.root.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();
    let config = SupervisorConfig {
        pid_file: blocker.join("d.pid"),
        ..fixture.config()
    };
    let mut supervisor = Supervisor::new(config);

    let err = supervisor.ping().await.unwrap_err();
    let SupervisorError::Daemon(DaemonError::PidNotRecorded { pid, path }) = err else {
        panic!("expected PidNotRecorded, got {err:?}");
    };
    assert_eq!(path, blocker.join("d.pid"));
    assert_eq!(supervisor.state(), SupervisorState::Failed);
    assert_eq!(
        supervisor.history(),
        &[
            SupervisorState::ResolvingConfig,
            SupervisorState::CheckingDaemon,
            SupervisorState::Launching,
            SupervisorState::Failed,
        ]
    );
    assert!(!fixture.report_path().exists(), "no report should be requested");

    kill(pid);
}
