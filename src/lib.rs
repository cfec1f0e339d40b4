//! # csvzip - Streaming Archive to CSV Converters
//!
//! Decompresses gzip, bzip2 and xz archives line by line into CSV files, and
//! compresses text files back into archives.
//!
//! ## Features
//!
//! - **Streaming**: memory use is bounded by buffer sizes, not by file size
//! - **Memory Mapping**: optional mapped input, byte-identical output
//! - **Line Normalisation**: `\n` and `\r\n` inputs both produce LF-terminated lines
//! - **Existence Policies**: overwrite, append to or refuse an existing output
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`codec`] - Codec names, extensions, magic bytes, decoders and encoders
//! - [`file_handler`] - Byte sources, line scanner and output sink
//! - [`pipeline`] - Run configuration and the conversion drivers
//! - [`config`] - Persisted defaults (feature `config`)
//! - [`cli`] - Shared command-line front end of the binaries

// Core modules
pub mod codec;
pub mod error;
pub mod file_handler;

// Drivers and front end
pub mod cli;
pub mod config;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use codec::Codec;
pub use error::{ConvertError, Result};

// Public API surface for external usage
pub use file_handler::{ExistencePolicy, InputMode};
pub use pipeline::{
    compress_file, decompress_to_csv, CompressConfig, CompressMode, DecompressConfig, LineMode,
    RunReport, RunState,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
