//! Console streams: line-based input and a cloneable output sink
//!
//! The output sink is shared between the dispatching thread and the
//! throbber's ticker thread, hence the mutex.

use std::fmt;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{Arc, Mutex};

/// Cloneable handle to the application's output stream.
#[derive(Clone)]
pub struct SharedOutput {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedOutput {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Write a string and flush in one lock.
    pub fn write_flushed(&self, text: &str) -> io::Result<()> {
        let mut sink = self.lock()?;
        sink.write_all(text.as_bytes())?;
        sink.flush()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Box<dyn Write + Send>>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("output stream lock poisoned"))
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl fmt::Debug for SharedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedOutput")
    }
}

/// In-memory output for embedding and tests.
#[derive(Clone, Default, Debug)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut b) = self.buffer.lock() {
            b.clear();
        }
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut b = self
            .buffer
            .lock()
            .map_err(|_| io::Error::other("captured output lock poisoned"))?;
        b.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Input and output streams of one application instance.
pub struct Console {
    input: Box<dyn BufRead + Send>,
    output: SharedOutput,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").field("output", &self.output).finish()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdio()
    }
}

impl Console {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: SharedOutput::new(output),
        }
    }

    pub fn stdio() -> Self {
        Self {
            input: Box::new(BufReader::new(io::stdin())),
            output: SharedOutput::stdout(),
        }
    }

    pub fn set_input(&mut self, input: impl BufRead + Send + 'static) {
        self.input = Box::new(input);
    }

    pub fn set_output(&mut self, output: impl Write + Send + 'static) {
        self.output = SharedOutput::new(output);
    }

    /// Handle to the output stream; clones share the same sink.
    pub fn output(&self) -> SharedOutput {
        self.output.clone()
    }

    /// Read one line without its line terminator. `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_crlf_input_when_reading_lines_then_terminators_are_stripped() {
        let out = CapturedOutput::new();
        let mut console = Console::new(io::Cursor::new("first\r\nsecond\n"), out);

        assert_eq!(console.read_line().unwrap().as_deref(), Some("first"));
        assert_eq!(console.read_line().unwrap().as_deref(), Some("second"));
        assert_eq!(console.read_line().unwrap(), None);
    }

    #[test]
    fn given_cloned_output_when_writing_from_both_then_captures_in_order() {
        let out = CapturedOutput::new();
        let mut console = Console::new(io::empty(), out.clone());
        let mut other = console.output();

        console.write_str("a").unwrap();
        other.write_all(b"b").unwrap();
        console.output().write_flushed("c").unwrap();

        assert_eq!(out.contents(), "abc");
    }
}
