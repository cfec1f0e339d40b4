//! Buffered output file with existence policies
//!
//! [`OutputSink`] opens the destination under an [`ExistencePolicy`], buffers
//! writes, and optionally compresses them on the way out. [`OutputSink::close`]
//! flushes everything and releases the handle; the drivers call it on success
//! and on failure alike.

use crate::codec::Codec;
use crate::error::{ConvertError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Write buffer size; gzip has a 32KB window so a smaller buffer gains nothing
pub const WRITE_BUFFER_SIZE: usize = 32 * 1024;

/// What to do when the output file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ExistencePolicy {
    /// Truncate and rewrite the existing file
    #[default]
    Overwrite,
    /// Keep existing bytes and write after them
    Append,
    /// Refuse to touch an existing file
    Fail,
}

/// Buffered sink over a destination file
pub struct OutputSink {
    path: PathBuf,
    writer: BufWriter<Box<dyn AsyncWrite + Unpin + Send>>,
    bytes_written: u64,
    closed: bool,
}

impl OutputSink {
    /// Open a plain output file.
    ///
    /// `Fail` creates the file exclusively, so a file that appeared after the
    /// caller's existence check is still reported as `OutputExists`.
    pub async fn open(path: &Path, policy: ExistencePolicy) -> Result<Self> {
        let file = open_file(path, policy).await?;
        Ok(Self::from_writer(path, Box::new(file)))
    }

    /// Open an output file whose content is compressed with `codec`.
    ///
    /// With `Append` a new compressed member is started after the existing ones.
    pub async fn open_encoded(path: &Path, policy: ExistencePolicy, codec: Codec) -> Result<Self> {
        let file = open_file(path, policy).await?;
        Ok(Self::from_writer(path, codec.encoder(file)))
    }

    fn from_writer(path: &Path, inner: Box<dyn AsyncWrite + Unpin + Send>) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(WRITE_BUFFER_SIZE, inner),
            bytes_written: 0,
            closed: false,
        }
    }

    /// Append `bytes` to the buffer, flushing to the file as it fills
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Write `line` followed by a single `\n`
    pub async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.write_bytes(line).await?;
        self.write_bytes(b"\n").await
    }

    /// Bytes accepted so far (before any compression)
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered data, finish any compressed stream and close the file.
    ///
    /// Returns the number of bytes accepted by the sink.
    pub async fn close(mut self) -> Result<u64> {
        self.closed = true;
        self.writer
            .shutdown()
            .await
            .map_err(|source| ConvertError::Flush {
                path: self.path.clone(),
                source,
            })?;
        log::debug!(
            "Closed output {} ({} bytes)",
            self.path.display(),
            self.bytes_written
        );
        Ok(self.bytes_written)
    }
}

impl Drop for OutputSink {
    fn drop(&mut self) {
        if !self.closed && !self.writer.buffer().is_empty() {
            log::warn!(
                "Output {} dropped without close; {} buffered bytes discarded",
                self.path.display(),
                self.writer.buffer().len()
            );
        }
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("path", &self.path)
            .field("bytes_written", &self.bytes_written)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

async fn open_file(path: &Path, policy: ExistencePolicy) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    match policy {
        ExistencePolicy::Overwrite => options.create(true).truncate(true),
        ExistencePolicy::Append => options.create(true).append(true),
        ExistencePolicy::Fail => options.create_new(true),
    };

    options.open(path).await.map_err(|source| {
        if policy == ExistencePolicy::Fail && source.kind() == io::ErrorKind::AlreadyExists {
            ConvertError::OutputExists {
                path: path.to_path_buf(),
            }
        } else {
            ConvertError::OutputOpen {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
