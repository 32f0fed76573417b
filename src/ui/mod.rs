//! User-facing diagnostic output.
//!
//! Progress, retry and error notices are meant for a human watching the
//! terminal and always go to stderr, never stdout. [`Diagnostics`] is a
//! cheap, cloneable handle over that stream so library code can report
//! progress without writing to the process streams directly, and tests can
//! capture exactly what a user would have seen.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Shared sink for human-readable progress and error notices
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Diagnostics {
    /// Notices go to stderr
    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    /// Notices go to an arbitrary writer
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Notices are kept in memory; read them back with [`CapturedOutput::contents`]
    pub fn capture() -> (Self, CapturedOutput) {
        let buffer = CapturedOutput::default();
        (Self::from_writer(buffer.clone()), buffer)
    }

    /// Write a notice fragment and flush it, so partial lines such as
    /// `"[1/3] "` show up before a slow operation finishes.
    ///
    /// Write errors are ignored: a closed stderr must not abort a download.
    pub fn write_fmt(&self, args: fmt::Arguments<'_>) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.write_fmt(args);
            let _ = sink.flush();
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

/// In-memory notice buffer returned by [`Diagnostics::capture`]
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.buffer.lock() {
            Ok(mut buf) => {
                buf.extend_from_slice(data);
                Ok(data.len())
            }
            Err(_) => Err(io::Error::other("diagnostic buffer poisoned")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
