//! Scoped redirection of diagnostic output into line sinks.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

use tracing::subscriber::DefaultGuard;
use tracing::{debug, Level};

use crate::sink::LineBufferedSink;

thread_local! {
    static PANIC_SINK: RefCell<Option<LineBufferedSink>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Routes the current thread's diagnostic output into line sinks.
///
/// While the guard lives, `tracing` events raised on this thread are
/// formatted as plain lines and written to the error sink, panic reports from
/// this thread go to the error sink instead of stderr, and handlers are given
/// the output sink to write to. Dropping the guard flushes both sinks and
/// restores the thread's previous dispatcher and panic destination.
pub struct OutputRedirect {
    out: LineBufferedSink,
    err: LineBufferedSink,
    previous_panic_sink: Option<LineBufferedSink>,
    _previous: DefaultGuard,
}

impl OutputRedirect {
    /// Install `out` and `err` as the calling thread's diagnostic destinations.
    #[must_use]
    pub fn install(out: LineBufferedSink, err: LineBufferedSink, verbose: bool) -> Self {
        install_panic_hook();

        let max_level = if verbose { Level::DEBUG } else { Level::INFO };
        let subscriber = tracing_subscriber::fmt()
            .with_writer(err.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(max_level)
            .finish();
        let previous = tracing::subscriber::set_default(subscriber);
        let previous_panic_sink = PANIC_SINK
            .try_with(|slot| slot.replace(Some(err.clone())))
            .ok()
            .flatten();
        debug!("diagnostic output redirected");

        Self {
            out,
            err,
            previous_panic_sink,
            _previous: previous,
        }
    }

    /// Sink standing in for standard output.
    #[must_use]
    pub fn out(&self) -> &LineBufferedSink {
        &self.out
    }
}

impl std::fmt::Debug for OutputRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRedirect")
            .field("out", &self.out)
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

impl Drop for OutputRedirect {
    fn drop(&mut self) {
        let previous = self.previous_panic_sink.take();
        let _ = PANIC_SINK.try_with(|slot| *slot.borrow_mut() = previous);
        self.out.flush();
        self.err.flush();
    }
}

/// Text of a panic payload, when it carries one.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Chain a hook in front of the existing one, once per process.
///
/// Threads with a redirect installed report into their error sink; every
/// other thread keeps the previous behaviour.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let sink = PANIC_SINK
                .try_with(|slot| slot.borrow().clone())
                .ok()
                .flatten();
            match sink {
                Some(sink) => {
                    let location = info.location().map(ToString::to_string);
                    report_panic(&sink, panic_message(info.payload()), location.as_deref());
                }
                None => previous(info),
            }
        }));
    });
}

fn report_panic(sink: &LineBufferedSink, message: &str, location: Option<&str>) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let location = location.map(|at| format!(" at {at}")).unwrap_or_default();

    sink.flush();
    sink.println(&format!("thread '{name}' panicked{location}: {message}"));

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        sink.println(&backtrace.to_string());
    }
}
