//! Command-polling status loop.
//!
//! The loop moves the status line `Initializing → Idle ⇄ Processing Command`
//! and exits once the command source reports quit. Interruption and "quit is
//! pending" end the loop quietly; any other poll failure is logged through
//! the original, unredirected dispatcher and ends the loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};

use super::redirect::panic_message;
use super::{CommandHandler, EchoHandler, OutputRedirect, WorkerStatus};
use crate::config::WorkerConfig;
use crate::host::{CommandSource, LogSink, PollError, StatusLine};
use crate::sink::{escape_percent, LineBufferedSink};
use crate::Result;

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Cooperative worker loop polling a [`CommandSource`].
pub struct CommandLoop {
    name: String,
    diagnostics_prefix: Option<String>,
    poll_timeout: Duration,
    verbose: bool,
    status: Arc<dyn StatusLine>,
    log: Arc<dyn LogSink>,
    source: Arc<dyn CommandSource>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandLoop {
    /// Build a loop with the echo handler and a five-second poll timeout.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        status: Arc<dyn StatusLine>,
        log: Arc<dyn LogSink>,
        source: Arc<dyn CommandSource>,
    ) -> Self {
        Self {
            name: name.into(),
            diagnostics_prefix: None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            verbose: false,
            status,
            log,
            source,
            handler: Arc::new(EchoHandler),
        }
    }

    /// Build a loop from the worker configuration.
    #[must_use]
    pub fn from_config(
        config: &WorkerConfig,
        status: Arc<dyn StatusLine>,
        log: Arc<dyn LogSink>,
        source: Arc<dyn CommandSource>,
    ) -> Self {
        Self::new(config.name.clone(), status, log, source)
            .with_diagnostics_prefix(config.diagnostics_prefix())
            .with_poll_timeout(config.poll_timeout())
            .with_verbose(config.debug)
    }

    /// Replace the command handler.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Set the prefix of redirected diagnostic lines.
    #[must_use]
    pub fn with_diagnostics_prefix(mut self, prefix: Option<String>) -> Self {
        self.diagnostics_prefix = prefix;
        self
    }

    /// Set how long a single poll may block.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Include debug-level diagnostics in the redirected output.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run until the command source reports quit or shutdown.
    ///
    /// The diagnostic redirection installed at entry is removed on every
    /// exit path before the outcome is reported.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when the command source fails for any
    /// reason other than interruption or a pending quit. The error has
    /// already been logged when this returns.
    pub async fn run(&self) -> Result<()> {
        self.set_status(WorkerStatus::Initializing);

        let outcome = {
            let redirect = OutputRedirect::install(
                self.diagnostics_sink(),
                self.diagnostics_sink(),
                self.verbose,
            );
            self.poll_commands(&redirect).await
        };

        match outcome {
            Ok(()) => {
                info!(worker = %self.name, "command loop stopped");
                Ok(())
            }
            Err(PollError::Interrupted) => {
                debug!(worker = %self.name, "command loop interrupted");
                Ok(())
            }
            Err(PollError::QuitPending) => {
                debug!(worker = %self.name, "quit was pending during poll");
                Ok(())
            }
            Err(PollError::Failed(err)) => {
                error!(worker = %self.name, %err, "command loop failed");
                Err(err)
            }
        }
    }

    async fn poll_commands(&self, redirect: &OutputRedirect) -> std::result::Result<(), PollError> {
        self.log_line("Started");
        self.set_status(WorkerStatus::Idle);

        while !self.source.is_quit_pending() {
            tokio::task::yield_now().await;

            loop {
                if self.source.is_quit_pending() {
                    break;
                }
                match self.source.poll(self.poll_timeout).await? {
                    Some(command) => self.dispatch(&command, redirect.out()).await,
                    None => break,
                }
            }
        }

        Ok(())
    }

    async fn dispatch(&self, command: &str, out: &LineBufferedSink) {
        self.set_status(WorkerStatus::ProcessingCommand);

        let handled = AssertUnwindSafe(self.handler.handle(command, out))
            .catch_unwind()
            .await;
        match handled {
            Ok(Ok(())) => debug!(command, "command handled"),
            Ok(Err(err)) => warn!(command, %err, "command handler failed"),
            Err(payload) => {
                let panic = panic_message(payload.as_ref());
                error!(command, panic, "command handler panicked");
            }
        }

        self.set_status(WorkerStatus::Idle);
    }

    fn diagnostics_sink(&self) -> LineBufferedSink {
        let log = Arc::clone(&self.log);
        LineBufferedSink::new(self.diagnostics_prefix.clone(), move |line| {
            log.log_message(line);
        })
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.set_line(status.as_str());
    }

    fn log_line(&self, message: &str) {
        self.log
            .log_message(&escape_percent(&format!("{}: {message}", self.name)));
    }
}

impl std::fmt::Debug for CommandLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLoop")
            .field("name", &self.name)
            .field("diagnostics_prefix", &self.diagnostics_prefix)
            .field("poll_timeout", &self.poll_timeout)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}
