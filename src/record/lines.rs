//! Line-at-a-time reading shared by every record format.

use std::io::{self, BufRead, BufReader, Read};

use crate::READ_BUFFER_SIZE;

/// Buffered line reader over any byte stream.
///
/// Lines keep their original terminators so records can be reassembled
/// byte-for-byte. Bytes that are not valid UTF-8 (legacy dumps mix
/// encodings freely) are replaced rather than treated as a read fault.
pub(crate) struct LineReader {
    inner: BufReader<Box<dyn Read + Send>>,
    raw: Vec<u8>,
    line: String,
    lines_read: u64,
}

impl LineReader {
    pub(crate) fn new(reader: Box<dyn Read + Send>) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_SIZE, reader),
            raw: Vec::with_capacity(256),
            line: String::with_capacity(256),
            lines_read: 0,
        }
    }

    /// Reads the next line, or `Ok(None)` at end of input.
    pub(crate) fn next_line(&mut self) -> io::Result<Option<&str>> {
        self.raw.clear();
        if self.inner.read_until(b'\n', &mut self.raw)? == 0 {
            return Ok(None);
        }
        self.lines_read += 1;

        self.line.clear();
        match std::str::from_utf8(&self.raw) {
            Ok(text) => self.line.push_str(text),
            Err(_) => {
                log::trace!("line {} is not valid UTF-8", self.lines_read);
                self.line.push_str(&String::from_utf8_lossy(&self.raw));
            }
        }
        Ok(Some(&self.line))
    }

    /// Returns true if no bytes remain.
    pub(crate) fn at_eof(&mut self) -> io::Result<bool> {
        Ok(self.inner.fill_buf()?.is_empty())
    }

    /// Number of lines returned so far.
    pub(crate) fn lines_read(&self) -> u64 {
        self.lines_read
    }
}
