//! Unit tests for `WorkerStatus` text and the watch-backed status line.

use console_worker::host::console::WatchStatusLine;
use console_worker::host::StatusLine;
use console_worker::worker::WorkerStatus;

#[test]
fn status_text_matches_console_wording() {
    assert_eq!(WorkerStatus::Initializing.as_str(), "Initializing");
    assert_eq!(WorkerStatus::Idle.as_str(), "Idle");
    assert_eq!(WorkerStatus::ProcessingCommand.as_str(), "Processing Command");
}

#[test]
fn status_display_matches_as_str() {
    for status in [
        WorkerStatus::Initializing,
        WorkerStatus::Idle,
        WorkerStatus::ProcessingCommand,
    ] {
        assert_eq!(status.to_string(), status.as_str());
    }
}

#[test]
fn watch_status_line_starts_with_initial_text() {
    let status = WatchStatusLine::new("Initializing");
    assert_eq!(status.current().line, "Initializing");
}

#[test]
fn set_line_replaces_text_and_timestamp() {
    let status = WatchStatusLine::new("Initializing");
    let before = status.current();
    status.set_line("Idle");
    let after = status.current();
    assert_eq!(after.line, "Idle");
    assert!(after.since >= before.since);
}

#[test]
fn subscribers_observe_changes() {
    let status = WatchStatusLine::new("Initializing");
    let mut rx = status.subscribe();
    status.set_line("Processing Command");
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().line, "Processing Command");
}

#[test]
fn set_line_without_subscribers_does_not_fail() {
    let status = WatchStatusLine::new("Initializing");
    status.set_line("Idle");
    status.set_line("Idle");
    assert_eq!(status.current().line, "Idle");
}
