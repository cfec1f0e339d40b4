//! Error types and handling infrastructure for csvzip.
//!
//! Library code returns [`ConvertError`] (built with `thiserror`); the binaries wrap it
//! in `anyhow` and print the whole chain before exiting with a failure status.
//!
//! Every variant carries the file it concerns and, for failures in the middle of a
//! run, the 1-based number of the line that was being produced. That is enough to
//! tell which stage failed (open-input, open-output, scan, write) without re-running.

use crate::codec::Codec;
use crate::file_handler::scanner::ScanError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for csvzip operations.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Missing or malformed command-line input; raised before any file is touched
    #[error("Invalid usage: {message}")]
    Usage { message: String },

    /// The `fail` existence policy found a pre-existing output file
    #[error("Output file already exists: {path}")]
    OutputExists { path: PathBuf },

    /// The input file could not be opened
    #[error("Cannot open input file: {path}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The input file could not be memory mapped
    #[error("Cannot memory map input file: {path}")]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Header bytes or compressed data are not valid for the selected codec
    #[error("Invalid {codec} data in {path}{}", at_line(.line))]
    Codec {
        codec: Codec,
        path: PathBuf,
        line: Option<u64>,
        #[source]
        source: io::Error,
    },

    /// The compressed stream ended in the middle of a block
    #[error("Truncated {codec} stream in {path} at line {line}")]
    TruncatedStream {
        codec: Codec,
        path: PathBuf,
        line: u64,
        #[source]
        source: io::Error,
    },

    /// Plain I/O failure while reading the input
    #[error("Failed to read {path} at line {line}")]
    Read {
        path: PathBuf,
        line: u64,
        #[source]
        source: io::Error,
    },

    /// A line could not be scanned (e.g. it exceeds the maximum line length)
    #[error("Failed to scan {path} at line {line}")]
    Scan {
        path: PathBuf,
        line: u64,
        #[source]
        source: ScanError,
    },

    /// The output file could not be created or opened
    #[error("Cannot open output file: {path}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the output failed
    #[error("Failed to write {path}{}", at_line(.line))]
    Write {
        path: PathBuf,
        line: Option<u64>,
        #[source]
        source: io::Error,
    },

    /// Flushing or closing the output failed
    #[error("Failed to flush output file: {path}")]
    Flush {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A driver was asked to run again after it reached `Done` or `Failed`
    #[error("Conversion of {path} has already finished")]
    AlreadyFinished { path: PathBuf },

    /// Settings file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Standard Result type for csvzip operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

fn at_line(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" at line {line}"),
        None => String::new(),
    }
}

impl ConvertError {
    /// Create a Usage error with a descriptive message
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a Config error with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a header-level Codec error (no line has been produced yet)
    pub fn bad_header(codec: Codec, path: &Path, message: impl Into<String>) -> Self {
        Self::Codec {
            codec,
            path: path.to_path_buf(),
            line: None,
            source: io::Error::new(io::ErrorKind::InvalidData, message.into()),
        }
    }

    /// Map a scanner failure to the error describing it.
    ///
    /// `codec` is `None` for plain text inputs; their read failures are never
    /// attributed to a codec.
    pub fn from_scan(err: ScanError, codec: Option<Codec>, path: &Path, line: u64) -> Self {
        let path = path.to_path_buf();
        match err {
            ScanError::Read(source) => match (codec, source.kind()) {
                (Some(codec), io::ErrorKind::UnexpectedEof) => Self::TruncatedStream {
                    codec,
                    path,
                    line,
                    source,
                },
                (
                    Some(codec),
                    io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::Other,
                ) => Self::Codec {
                    codec,
                    path,
                    line: Some(line),
                    source,
                },
                _ => Self::Read { path, line, source },
            },
            other => Self::Scan {
                path,
                line,
                source: other,
            },
        }
    }

    /// Short name of the stage that failed, used in log lines
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Usage { .. } | Self::Config { .. } | Self::AlreadyFinished { .. } => "startup",
            Self::OutputExists { .. } | Self::OutputOpen { .. } => "open-output",
            Self::InputOpen { .. } | Self::Map { .. } => "open-input",
            Self::Codec { line: None, .. } => "open-input",
            Self::Codec { .. }
            | Self::TruncatedStream { .. }
            | Self::Read { .. }
            | Self::Scan { .. } => "scan",
            Self::Write { .. } => "write",
            Self::Flush { .. } => "close",
        }
    }
}
