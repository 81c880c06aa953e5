//! Line-buffered text sink.
//!
//! [`LineBufferedSink`] accepts arbitrary text fragments from any thread,
//! reassembles them into complete lines and hands each line to a callback
//! exactly once. Partial lines are held per thread (see [`buffer`]) so
//! concurrent writers never share a line and the write path takes no lock.
//!
//! Emitted text has every `%` doubled because the downstream log channel
//! treats its input as a format pattern.

mod buffer;
mod writer;

use std::fmt::{self, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SINK_ID: AtomicU64 = AtomicU64::new(1);

/// Receives one fully assembled, prefixed and escaped line, from any
/// thread that writes to the sink.
type LineCallback = Box<dyn Fn(&str) + Send + Sync>;

/// A single renderable value accepted by [`LineBufferedSink::print_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkValue {
    /// Boolean, rendered as `true` / `false`.
    Bool(bool),
    /// Single character. `\n` and `\r` end the current line.
    Char(char),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float.
    Double(f64),
    /// Arbitrary text, possibly containing line breaks.
    Text(String),
}

impl Display for SinkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for SinkValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for SinkValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<i32> for SinkValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for SinkValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for SinkValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for SinkValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for SinkValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SinkValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Double every `%` so a format-capable consumer prints it literally.
#[must_use]
pub fn escape_percent(line: &str) -> String {
    line.replace('%', "%%")
}

struct SinkInner {
    id: u64,
    alive: Arc<()>,
    prefix: Option<String>,
    callback: LineCallback,
}

impl SinkInner {
    fn emit_line(&self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }

        let escaped = escape_percent(line);
        let text = match &self.prefix {
            Some(prefix) => format!("{prefix}: {escaped}"),
            None => escaped,
        };
        (self.callback)(&text);
    }

    fn flush(&self) {
        if let Some(pending) = buffer::take(self.id) {
            self.emit_line(&pending);
        }
    }
}

impl Drop for SinkInner {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Thread-safe, line-assembling text sink.
///
/// Cloning is cheap; clones share the prefix, the callback and the per-thread
/// pending tails.
#[derive(Clone)]
pub struct LineBufferedSink {
    inner: Arc<SinkInner>,
}

impl fmt::Debug for LineBufferedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineBufferedSink")
            .field("id", &self.inner.id)
            .field("prefix", &self.inner.prefix)
            .finish_non_exhaustive()
    }
}

impl LineBufferedSink {
    /// Create a sink that prefixes every line with `"<prefix>: "`.
    ///
    /// An empty or absent prefix emits lines unprefixed.
    #[must_use]
    pub fn new<F>(prefix: Option<String>, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let callback: LineCallback = Box::new(callback);
        Self {
            inner: Arc::new(SinkInner {
                id: NEXT_SINK_ID.fetch_add(1, Ordering::Relaxed),
                alive: Arc::new(()),
                prefix: prefix.filter(|p| !p.is_empty()),
                callback,
            }),
        }
    }

    /// Prefix applied to emitted lines.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.inner.prefix.as_deref()
    }

    /// Write a fragment.
    ///
    /// Every line break completes the calling thread's pending line; the text
    /// after the last break stays pending.
    pub fn print(&self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }

        let mut pieces = fragment.split(['\r', '\n']).peekable();
        while let Some(piece) = pieces.next() {
            if pieces.peek().is_none() {
                buffer::append(self.inner.id, &self.inner.alive, piece);
                break;
            }

            let line = match buffer::take(self.inner.id) {
                Some(mut pending) => {
                    pending.push_str(piece);
                    pending
                }
                None => piece.to_owned(),
            };
            self.inner.emit_line(&line);
        }
    }

    /// Write a fragment and end the current line.
    ///
    /// An empty fragment only flushes.
    pub fn println(&self, fragment: &str) {
        self.print(fragment);
        self.flush();
    }

    /// Render a value and write it.
    ///
    /// A `\n` or `\r` character ends the current line.
    pub fn print_value(&self, value: impl Into<SinkValue>) {
        match value.into() {
            SinkValue::Char('\n' | '\r') => self.flush(),
            SinkValue::Text(text) => self.print(&text),
            other => buffer::append(self.inner.id, &self.inner.alive, &other.to_string()),
        }
    }

    /// Render a value, write it and end the current line.
    pub fn println_value(&self, value: impl Into<SinkValue>) {
        self.print_value(value);
        self.flush();
    }

    /// Write the `Display` rendering of an arbitrary object.
    pub fn print_display(&self, value: &dyn Display) {
        self.print(&value.to_string());
    }

    /// Write pre-formatted arguments, as produced by [`format_args!`].
    pub fn print_fmt(&self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(text) => self.print(text),
            None => self.print(&args.to_string()),
        }
    }

    /// Decode bytes as UTF-8 (replacing invalid sequences) and write them.
    pub fn write_bytes(&self, bytes: &[u8]) {
        self.print(&String::from_utf8_lossy(bytes));
    }

    /// Emit the calling thread's pending text as a final line.
    ///
    /// Does nothing when nothing is pending.
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// Bytes the calling thread has written that do not yet form a line.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        buffer::pending_len(self.inner.id)
    }
}
