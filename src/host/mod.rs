//! Host collaborators consumed by the command loop.
//!
//! The worker only needs three things from its host: somewhere to show a
//! status line, somewhere to log a line of text, and a queue to poll for
//! operator commands. Each is a trait so the loop can be driven by the real
//! console integration or by test doubles.

pub mod console;
pub mod queue;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::AppError;

/// Externally visible one-line activity indicator.
pub trait StatusLine: Send + Sync {
    /// Replace the current status text. Best-effort.
    fn set_line(&self, text: &str);
}

/// Line-oriented log channel.
///
/// The text is a format pattern: `%%` stands for a literal `%`.
pub trait LogSink: Send + Sync {
    /// Log one line. Best-effort.
    fn log_message(&self, text: &str);
}

/// Reasons a command poll did not produce a value.
#[derive(Debug)]
pub enum PollError {
    /// The poll was interrupted because the worker is shutting down.
    Interrupted,
    /// Quit was already requested when the poll ran.
    QuitPending,
    /// Any other failure of the command source.
    Failed(AppError),
}

impl Display for PollError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupted => f.write_str("poll interrupted"),
            Self::QuitPending => f.write_str("quit is pending"),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PollError {}

impl From<AppError> for PollError {
    fn from(err: AppError) -> Self {
        Self::Failed(err)
    }
}

/// Queue of operator commands.
pub trait CommandSource: Send + Sync {
    /// Wait up to `timeout` for the next command.
    ///
    /// Resolves to `Ok(None)` when the timeout elapses without a command.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::QuitPending`] once quit has been requested,
    /// [`PollError::Interrupted`] when shutdown interrupts the wait, and
    /// [`PollError::Failed`] for any other failure.
    fn poll(
        &self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, PollError>> + Send + '_>>;

    /// Whether the host has asked the worker to quit.
    fn is_quit_pending(&self) -> bool;
}

/// Apply a format pass with no arguments to a log pattern.
///
/// `%%` collapses to `%`; any other `%` sequence is kept as written because
/// there is no argument to substitute.
#[must_use]
pub fn render_log_pattern(pattern: &str) -> String {
    let mut rendered = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' && chars.peek() == Some(&'%') {
            chars.next();
        }
        rendered.push(c);
    }
    rendered
}
