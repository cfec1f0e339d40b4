//! Memory-mapped byte source for large inputs
//!
//! [`MappedFile`] maps a whole file read-only and hands it out through the
//! `AsyncRead`/`AsyncBufRead` traits, so a decoder or line scanner consumes the
//! mapping in place instead of issuing a read syscall per chunk. The output of a
//! run must not depend on whether its input came through here or through a
//! buffered file reader.

use crate::error::{ConvertError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

/// Read-only memory mapping of a whole file with a read cursor.
///
/// The mapping is released when the value is dropped, on every exit path.
#[derive(Debug)]
pub struct MappedFile {
    /// Mapped file content; pages are faulted in by the OS on first access
    mmap: Mmap,

    /// Read cursor into `mmap`
    pos: usize,

    path: PathBuf,
}

impl MappedFile {
    /// Map `path` into memory.
    ///
    /// # Errors
    /// * `InputOpen` if the file cannot be opened
    /// * `Map` if it is empty or the platform refuses the mapping
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|source| ConvertError::InputOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let len = file
            .metadata()
            .map_err(|source| ConvertError::InputOpen {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if len == 0 {
            return Err(ConvertError::Map {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "file is empty"),
            });
        }
        if usize::try_from(len).is_err() {
            return Err(ConvertError::Map {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "file is too large"),
            });
        }

        let mmap = unsafe {
            Mmap::map(&file).map_err(|source| ConvertError::Map {
                path: path.to_path_buf(),
                source,
            })?
        };

        // Inputs are consumed front to back exactly once
        #[cfg(unix)]
        {
            if let Err(e) = mmap.advise(memmap2::Advice::Sequential) {
                log::warn!("Failed to set mmap advice for {}: {}", path.display(), e);
            }
        }

        log::debug!("Mapped {} ({} bytes)", path.display(), len);

        Ok(Self {
            mmap,
            pos: 0,
            path: path.to_path_buf(),
        })
    }

    /// Whole mapped content, independent of the read cursor
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Bytes not yet consumed through the reader traits
    pub fn remaining(&self) -> &[u8] {
        &self.mmap[self.pos..]
    }

    /// Mapped length in bytes
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unmap the file
    pub fn close(self) {
        log::debug!("Unmapped {}", self.path.display());
    }
}

impl AsyncRead for MappedFile {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = &this.mmap[this.pos..];
        let n = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl AsyncBufRead for MappedFile {
    fn poll_fill_buf(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        let this = self.get_mut();
        Poll::Ready(Ok(&this.mmap[this.pos..]))
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        let this = self.get_mut();
        this.pos = (this.pos + amt).min(this.mmap.len());
    }
}
