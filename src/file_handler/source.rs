//! Input adapters: raw byte sources and the decompressing reader
//!
//! A [`ByteSource`] yields the raw bytes of a file, either through a buffered file
//! reader or from a memory mapping. A [`CompressedSource`] validates the codec
//! header on a `ByteSource` and exposes the decompressed stream as an
//! `AsyncBufRead`, ready for the line scanner.

use crate::codec::{detect_by_magic, Codec};
use crate::error::{ConvertError, Result};
use crate::file_handler::mmap::MappedFile;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, ReadBuf};

/// Read buffer size for streaming inputs
pub const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Buffer between the decoder and the line scanner
pub const DECODE_BUFFER_SIZE: usize = 64 * 1024;

/// How raw input bytes are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
pub enum InputMode {
    /// Incremental buffered reads from the file
    #[default]
    #[cfg_attr(feature = "config", serde(rename = "none"))]
    Streaming,
    /// The whole file mapped into memory
    #[cfg_attr(feature = "config", serde(rename = "scanner"))]
    Mapped,
}

/// Raw (still compressed, or plain text) bytes of an input file
#[derive(Debug)]
pub enum ByteSource {
    /// Buffered incremental reads
    Streaming(BufReader<File>),
    /// Memory-mapped file content
    Mapped(MappedFile),
}

impl ByteSource {
    /// Open `path` using the requested input mode.
    pub async fn open(path: &Path, mode: InputMode) -> Result<Self> {
        match mode {
            InputMode::Streaming => {
                let file = File::open(path)
                    .await
                    .map_err(|source| ConvertError::InputOpen {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Ok(Self::Streaming(BufReader::with_capacity(
                    READ_BUFFER_SIZE,
                    file,
                )))
            }
            InputMode::Mapped => Ok(Self::Mapped(MappedFile::open(path)?)),
        }
    }

    pub fn mode(&self) -> InputMode {
        match self {
            Self::Streaming(_) => InputMode::Streaming,
            Self::Mapped(_) => InputMode::Mapped,
        }
    }

    /// Release the file handle or mapping
    pub fn close(self) {
        match self {
            Self::Streaming(_) => log::debug!("Closed streaming input"),
            Self::Mapped(mapped) => mapped.close(),
        }
    }
}

impl AsyncRead for ByteSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Streaming(reader) => Pin::new(reader).poll_read(cx, buf),
            Self::Mapped(mapped) => Pin::new(mapped).poll_read(cx, buf),
        }
    }
}

impl AsyncBufRead for ByteSource {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        match self.get_mut() {
            Self::Streaming(reader) => Pin::new(reader).poll_fill_buf(cx),
            Self::Mapped(mapped) => Pin::new(mapped).poll_fill_buf(cx),
        }
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        match self.get_mut() {
            Self::Streaming(reader) => Pin::new(reader).consume(amt),
            Self::Mapped(mapped) => Pin::new(mapped).consume(amt),
        }
    }
}

/// Decompressing reader over an opened compressed file.
///
/// Owns the file handle or mapping for its whole lifetime; [`CompressedSource::close`]
/// consumes it, so it is released exactly once.
pub struct CompressedSource {
    path: PathBuf,
    codec: Codec,
    mode: InputMode,
    reader: BufReader<Box<dyn AsyncRead + Unpin + Send>>,
}

impl CompressedSource {
    /// Open `path`, check its header against `codec` and set up the decoder.
    ///
    /// # Errors
    /// * `InputOpen` / `Map` when the file cannot be opened or mapped
    /// * `Codec` when the leading bytes are not the codec's magic signature
    pub async fn open(path: &Path, codec: Codec, mode: InputMode) -> Result<Self> {
        let mut source = ByteSource::open(path, mode).await?;

        let header = source
            .fill_buf()
            .await
            .map_err(|e| ConvertError::InputOpen {
                path: path.to_path_buf(),
                source: e,
            })?;
        if !codec.has_magic(header) {
            let message = if header.len() < codec.magic().len() {
                format!("input is too short for a {codec} header")
            } else if let Some(other) = detect_by_magic(header) {
                format!("missing {codec} magic bytes; input looks like {other}")
            } else {
                format!("missing {codec} magic bytes")
            };
            return Err(ConvertError::bad_header(codec, path, message));
        }

        log::debug!(
            "Opened {} as {} input ({:?})",
            path.display(),
            codec,
            mode
        );

        Ok(Self {
            path: path.to_path_buf(),
            codec,
            mode,
            reader: BufReader::with_capacity(DECODE_BUFFER_SIZE, codec.decoder(source)),
        })
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the decoder and the underlying file or mapping
    pub fn close(self) {
        log::debug!("Closed {} input {}", self.codec, self.path.display());
    }
}

impl std::fmt::Debug for CompressedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressedSource")
            .field("path", &self.path)
            .field("codec", &self.codec)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl AsyncRead for CompressedSource {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

impl AsyncBufRead for CompressedSource {
    fn poll_fill_buf(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<&[u8]>> {
        Pin::new(&mut self.get_mut().reader).poll_fill_buf(cx)
    }

    fn consume(self: Pin<&mut Self>, amt: usize) {
        Pin::new(&mut self.get_mut().reader).consume(amt)
    }
}
