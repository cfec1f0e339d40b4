//! Line scanner over a decompressed byte stream
//!
//! [`LineScanner`] splits any `AsyncBufRead` into lines. A line ends at `\n`; one
//! `\r` directly before the `\n` (or before end-of-stream) is dropped with it, so
//! `\n` and `\r\n` inputs scan to the same lines. A final line without a
//! terminator is still produced. A bare `\r` elsewhere is ordinary content.
//!
//! Two retrieval modes are offered:
//! - [`LineScanner::next_borrowed`] hands out a view of the scanner's internal
//!   buffer, which the next call overwrites (the borrow checker enforces that it
//!   is not kept across calls)
//! - [`LineScanner::next_owned`] returns an independently owned [`BString`]
//!
//! Both produce exactly the same bytes.

use bstr::BString;
use memchr::memchr;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Default maximum line length in bytes, terminator excluded
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Failure while scanning, kept distinct from end-of-stream
#[derive(Error, Debug)]
pub enum ScanError {
    /// A line grew past the scanner's limit before its terminator was found
    #[error("line exceeds the maximum length of {limit} bytes")]
    LineTooLong { limit: usize },

    /// The underlying stream failed (I/O or decompression error)
    #[error("read failed")]
    Read(#[source] io::Error),
}

/// Sequential line splitter with a reusable line buffer
#[derive(Debug)]
pub struct LineScanner<R> {
    reader: R,

    /// Bytes of the most recent line, reused across calls
    line: Vec<u8>,

    max_line_len: usize,

    /// Lines produced so far
    lines_read: u64,

    /// Set once end-of-stream or an error was observed; no line follows
    finished: bool,
}

impl<R> LineScanner<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_max_line_len(reader, DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(reader: R, max_line_len: usize) -> Self {
        Self {
            reader,
            line: Vec::with_capacity(4096),
            max_line_len,
            lines_read: 0,
            finished: false,
        }
    }

    /// Scan the next line and return a view into the reused buffer.
    ///
    /// Returns `Ok(None)` at end-of-stream. After an error or end-of-stream,
    /// every further call returns `Ok(None)`.
    pub async fn next_borrowed(&mut self) -> Result<Option<&[u8]>, ScanError> {
        if self.advance().await? {
            Ok(Some(&self.line))
        } else {
            Ok(None)
        }
    }

    /// Scan the next line and return an owned copy of it.
    pub async fn next_owned(&mut self) -> Result<Option<BString>, ScanError> {
        if self.advance().await? {
            Ok(Some(BString::from(self.line.as_slice())))
        } else {
            Ok(None)
        }
    }

    /// Number of lines produced so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Whether end-of-stream or an error has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Give back the underlying reader so it can be closed
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Fill `self.line` with the next line. Returns false at end-of-stream.
    async fn advance(&mut self) -> Result<bool, ScanError> {
        if self.finished {
            return Ok(false);
        }
        self.line.clear();

        // One extra byte leaves room for a '\r' that is stripped afterwards
        let limit = self.max_line_len.saturating_add(1);
        let mut saw_bytes = false;

        loop {
            let (terminated, used) = {
                let available = match self.reader.fill_buf().await {
                    Ok(available) => available,
                    Err(e) => {
                        self.finished = true;
                        return Err(ScanError::Read(e));
                    }
                };

                if available.is_empty() {
                    self.finished = true;
                    if !saw_bytes {
                        return Ok(false);
                    }
                    break;
                }
                saw_bytes = true;

                match memchr(b'\n', available) {
                    Some(i) => {
                        self.line.extend_from_slice(&available[..i]);
                        (true, i + 1)
                    }
                    None => {
                        self.line.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            };
            self.reader.consume(used);

            if self.line.len() > limit {
                self.finished = true;
                return Err(ScanError::LineTooLong {
                    limit: self.max_line_len,
                });
            }
            if terminated {
                break;
            }
        }

        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        if self.line.len() > self.max_line_len {
            self.finished = true;
            return Err(ScanError::LineTooLong {
                limit: self.max_line_len,
            });
        }

        self.lines_read += 1;
        Ok(true)
    }
}
