//! The worker: a command-polling status loop with redirected diagnostics.

pub mod command_loop;
pub mod redirect;

use std::future::Future;
use std::pin::Pin;
use std::thread::JoinHandle;

use crate::sink::LineBufferedSink;
use crate::{AppError, Result};

pub use command_loop::CommandLoop;
pub use redirect::OutputRedirect;

/// Activity shown on the worker's status line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WorkerStatus {
    /// Starting up; commands are not yet being polled.
    Initializing,
    /// Waiting for the next command.
    Idle,
    /// Running a command handler.
    ProcessingCommand,
}

impl WorkerStatus {
    /// Text shown on the status line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Idle => "Idle",
            Self::ProcessingCommand => "Processing Command",
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension point for operator commands.
///
/// A failing or panicking handler only aborts the command it was given.
pub trait CommandHandler: Send + Sync {
    /// Handle one command, writing any output to `out`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Handler` (or any other variant) when the command
    /// could not be carried out.
    fn handle<'a>(
        &'a self,
        command: &'a str,
        out: &'a LineBufferedSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Handler that only echoes the command it received.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl CommandHandler for EchoHandler {
    fn handle<'a>(
        &'a self,
        command: &'a str,
        out: &'a LineBufferedSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            out.println(&format!("received: {command}"));
            Ok(())
        })
    }
}

/// Run `command_loop` on its own thread with a current-thread runtime.
///
/// The caller joins the returned handle to wait for the worker to stop.
///
/// # Errors
///
/// Returns `AppError::Worker` if the thread cannot be spawned.
pub fn spawn(command_loop: CommandLoop) -> Result<JoinHandle<Result<()>>> {
    std::thread::Builder::new()
        .name("command-loop".into())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|err| AppError::Worker(format!("failed to build worker runtime: {err}")))?;
            runtime.block_on(command_loop.run())
        })
        .map_err(|err| AppError::Worker(format!("failed to spawn command loop thread: {err}")))
}
