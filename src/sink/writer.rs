//! Standard writer adapters so existing output code can target a sink.

use std::{fmt, io};

use tracing_subscriber::fmt::MakeWriter;

use super::LineBufferedSink;

impl io::Write for LineBufferedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        LineBufferedSink::flush(self);
        Ok(())
    }
}

impl fmt::Write for LineBufferedSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.print(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.print_value(c);
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LineBufferedSink {
    type Writer = LineBufferedSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
