//! Tests for signalling a running daemon.

use std::fs;

use repo_watch::daemon::{DaemonError, DaemonMessenger, ReportOutcome, REPORT_SIGNAL};

use crate::common::{dead_pid, fast_timings, kill, pid_of, Fixture};

#[tokio::test]
async fn report_request_to_missing_process_fails() {
    let messenger = DaemonMessenger::new(&fast_timings());

    let err = messenger.request_report(dead_pid()).await.unwrap_err();
    match err {
        DaemonError::SignalDeliveryFailed { signal, .. } => assert_eq!(signal, REPORT_SIGNAL),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn report_request_refreshes_report() {
    let fixture = Fixture::with_daemon();
    let mut child = fixture.spawn_daemon();
    let pid = pid_of(&child);
    let messenger = DaemonMessenger::new(&fast_timings()).watch_report(fixture.report_path());

    let outcome = messenger.request_report(pid).await.unwrap();
    assert_eq!(outcome, ReportOutcome::Refreshed);

    let report = fs::read_to_string(fixture.report_path()).unwrap();
    assert!(report.contains("inotify_file_changes"));

    kill(pid);
    child.wait().unwrap();
}

#[tokio::test]
async fn report_request_without_watched_file_is_unconfirmed() {
    let fixture = Fixture::with_daemon();
    let mut child = fixture.spawn_daemon();
    let pid = pid_of(&child);

    let outcome = DaemonMessenger::new(&fast_timings())
        .request_report(pid)
        .await
        .unwrap();
    assert_eq!(outcome, ReportOutcome::Unconfirmed);

    kill(pid);
    child.wait().unwrap();
}

#[tokio::test]
async fn stop_terminates_daemon() {
    let fixture = Fixture::with_daemon();
    let mut child = fixture.spawn_daemon();
    let pid = pid_of(&child);
    let reaper = std::thread::spawn(move || child.wait().unwrap());

    DaemonMessenger::new(&fast_timings()).stop(pid).await.unwrap();

    let status = reaper.join().unwrap();
    assert_eq!(status.code(), Some(0));
}
