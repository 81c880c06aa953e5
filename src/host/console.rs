//! Console-backed host collaborators: the log channel and the status line.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, Dispatch};

use super::{render_log_pattern, LogSink, StatusLine};

/// Log channel that writes through a captured `tracing` dispatcher.
///
/// The dispatcher is captured at construction, so lines keep reaching the
/// process console even while a thread's default dispatcher is redirected.
#[derive(Clone)]
pub struct ConsoleLog {
    dispatch: Dispatch,
}

impl ConsoleLog {
    /// Log through the given dispatcher.
    #[must_use]
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Log through the dispatcher that is current for the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tracing::dispatcher::get_default(Dispatch::clone))
    }
}

impl std::fmt::Debug for ConsoleLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleLog").finish_non_exhaustive()
    }
}

impl LogSink for ConsoleLog {
    fn log_message(&self, text: &str) {
        let line = render_log_pattern(text);
        tracing::dispatcher::with_default(&self.dispatch, || {
            info!(target: "console", "{line}");
        });
    }
}

/// Status line value together with the time it was set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    /// Current status text.
    pub line: String,
    /// When the text was last replaced.
    pub since: DateTime<Utc>,
}

/// Status line published through a `tokio::sync::watch` channel.
#[derive(Debug)]
pub struct WatchStatusLine {
    tx: watch::Sender<StatusSnapshot>,
}

impl WatchStatusLine {
    /// Create a status line showing `initial`.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot {
            line: initial.to_owned(),
            since: Utc::now(),
        });
        Self { tx }
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    /// The status currently shown.
    #[must_use]
    pub fn current(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }
}

impl StatusLine for WatchStatusLine {
    fn set_line(&self, text: &str) {
        self.tx.send_replace(StatusSnapshot {
            line: text.to_owned(),
            since: Utc::now(),
        });
        debug!(status = text, "status line updated");
    }
}
