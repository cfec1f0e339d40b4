//! File handling: byte sources, decompression, line scanning and output sinks.
//!
//! Data flows leaf to root as
//! `ByteSource` (streaming or [`MappedFile`]) → [`CompressedSource`] →
//! [`LineScanner`] → driver → [`OutputSink`].

pub mod mmap;
pub mod scanner;
pub mod sink;
pub mod source;
pub mod validation;

pub use mmap::MappedFile;
pub use scanner::{LineScanner, ScanError, DEFAULT_MAX_LINE_LEN};
pub use sink::{ExistencePolicy, OutputSink};
pub use source::{ByteSource, CompressedSource, InputMode};
pub use validation::{validate_archive_name, validate_input_file, validate_plain_name};
