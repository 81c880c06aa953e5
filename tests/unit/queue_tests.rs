//! Unit tests for the in-process command queue.

use std::time::Duration;

use console_worker::host::queue;
use console_worker::host::{CommandSource, PollError};
use tokio_util::sync::CancellationToken;

const SHORT: Duration = Duration::from_millis(20);

#[tokio::test]
async fn poll_returns_queued_command() {
    let (handle, queue) = queue::channel(CancellationToken::new());
    handle.tell("status").await.unwrap();

    let polled = queue.poll(SHORT).await.unwrap();
    assert_eq!(polled.as_deref(), Some("status"));
}

#[tokio::test]
async fn commands_arrive_in_order() {
    let (handle, queue) = queue::channel(CancellationToken::new());
    handle.tell("first").await.unwrap();
    handle.tell("second").await.unwrap();

    assert_eq!(queue.poll(SHORT).await.unwrap().as_deref(), Some("first"));
    assert_eq!(queue.poll(SHORT).await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
async fn poll_times_out_with_none() {
    let (_handle, queue) = queue::channel(CancellationToken::new());
    let polled = queue.poll(SHORT).await.unwrap();
    assert!(polled.is_none());
}

#[tokio::test]
async fn quit_makes_poll_report_quit_pending() {
    let (handle, queue) = queue::channel(CancellationToken::new());
    handle.request_quit();

    assert!(queue.is_quit_pending());
    let err = queue.poll(SHORT).await.unwrap_err();
    assert!(matches!(err, PollError::QuitPending));
}

#[tokio::test]
async fn quit_during_poll_wakes_the_poller() {
    let (handle, queue) = queue::channel(CancellationToken::new());
    let quitter = handle.clone();
    let (result, ()) = tokio::join!(queue.poll(Duration::from_secs(30)), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        quitter.request_quit();
    });
    assert!(matches!(result, Err(PollError::QuitPending)));
}

#[tokio::test]
async fn shutdown_interrupts_poll() {
    let ct = CancellationToken::new();
    let (_handle, queue) = queue::channel(ct.clone());
    let cancel = ct.clone();
    let (result, ()) = tokio::join!(queue.poll(Duration::from_secs(30)), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });
    assert!(matches!(result, Err(PollError::Interrupted)));
    assert!(queue.is_quit_pending());
}

#[tokio::test]
async fn tell_after_quit_is_rejected() {
    let (handle, _queue) = queue::channel(CancellationToken::new());
    handle.request_quit();
    let err = handle.tell("late").await.unwrap_err();
    assert_eq!(err.to_string(), "ipc: quit is pending");
}

#[tokio::test]
async fn closed_queue_is_a_failure() {
    let (handle, queue) = queue::channel(CancellationToken::new());
    drop(handle);
    let err = queue.poll(SHORT).await.unwrap_err();
    assert!(matches!(err, PollError::Failed(_)));
    assert_eq!(err.to_string(), "worker: command queue closed");
}

#[tokio::test]
async fn request_quit_is_idempotent() {
    let (handle, _queue) = queue::channel(CancellationToken::new());
    handle.request_quit();
    handle.request_quit();
    assert!(handle.is_quit_pending());
}
