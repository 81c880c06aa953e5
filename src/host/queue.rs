//! In-process operator command queue.
//!
//! [`channel`] returns the producing [`QueueHandle`], held by the IPC server,
//! and the consuming [`MessageQueue`], polled by the command loop. Quit is a
//! separate signal from shutdown: quit is an operator request routed through
//! the queue, shutdown is the process-wide cancellation token.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{CommandSource, PollError};
use crate::{AppError, Result};

const QUEUE_CAPACITY: usize = 64;

/// Create a connected queue pair.
///
/// Cancelling `shutdown` interrupts any poll in progress.
#[must_use]
pub fn channel(shutdown: CancellationToken) -> (QueueHandle, MessageQueue) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    let quit = CancellationToken::new();
    (
        QueueHandle {
            tx,
            quit: quit.clone(),
        },
        MessageQueue {
            rx: Mutex::new(rx),
            quit,
            shutdown,
        },
    )
}

/// Producing side of the command queue.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<String>,
    quit: CancellationToken,
}

impl QueueHandle {
    /// Enqueue one command, verbatim.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ipc` if quit is already pending or the consuming
    /// side has gone away.
    pub async fn tell(&self, command: impl Into<String>) -> Result<()> {
        if self.quit.is_cancelled() {
            return Err(AppError::Ipc("quit is pending".into()));
        }
        self.tx
            .send(command.into())
            .await
            .map_err(|_| AppError::Ipc("command queue is closed".into()))
    }

    /// Ask the worker to quit. Idempotent.
    pub fn request_quit(&self) {
        self.quit.cancel();
    }

    /// Whether quit has been requested.
    #[must_use]
    pub fn is_quit_pending(&self) -> bool {
        self.quit.is_cancelled()
    }
}

/// Consuming side of the command queue.
#[derive(Debug)]
pub struct MessageQueue {
    rx: Mutex<mpsc::Receiver<String>>,
    quit: CancellationToken,
    shutdown: CancellationToken,
}

impl CommandSource for MessageQueue {
    fn poll(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Option<String>, PollError>> + Send + '_>>
    {
        Box::pin(async move {
            if self.shutdown.is_cancelled() {
                return Err(PollError::Interrupted);
            }
            if self.quit.is_cancelled() {
                return Err(PollError::QuitPending);
            }

            let mut rx = self.rx.lock().await;
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => Err(PollError::Interrupted),
                () = self.quit.cancelled() => Err(PollError::QuitPending),
                received = tokio::time::timeout(timeout, rx.recv()) => match received {
                    Err(_elapsed) => Ok(None),
                    Ok(Some(command)) => Ok(Some(command)),
                    Ok(None) => Err(PollError::Failed(AppError::Worker(
                        "command queue closed".into(),
                    ))),
                },
            }
        })
    }

    fn is_quit_pending(&self) -> bool {
        self.quit.is_cancelled() || self.shutdown.is_cancelled()
    }
}
