//! Run configuration and reporting types shared by the drivers.

use crate::codec::Codec;
use crate::error::{ConvertError, Result};
use crate::file_handler::{
    validate_archive_name, validate_plain_name, ExistencePolicy, InputMode, DEFAULT_MAX_LINE_LEN,
};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Extension appended to a decompressed archive's name
pub const CSV_EXTENSION: &str = "csv";

/// Which scanner retrieval mode the driver uses; output is identical either way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum LineMode {
    /// Borrow each line from the scanner's reused buffer
    #[default]
    Bytes,
    /// Take an owned copy of each line
    Text,
}

/// Input strategy for the compressing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressMode {
    /// Streaming line scan; line endings normalised to LF
    #[default]
    Streaming,
    /// Line scan over the mapped file; line endings normalised to LF
    Mapped,
    /// Mapped file handed to the encoder unchanged
    Direct,
}

/// Pipeline driver states.
///
/// `Idle → InputOpened → OutputOpened → Streaming → Done`, or `Failed` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    InputOpened,
    OutputOpened,
    Streaming,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: PathBuf,
    /// Lines scanned and written; `None` when content was copied without scanning
    pub lines: Option<u64>,
    /// Bytes handed to the output sink (before any compression)
    pub bytes_written: u64,
    pub elapsed: Duration,
}

/// Settings for one archive → CSV run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressConfig {
    pub input: PathBuf,
    pub codec: Codec,
    pub input_mode: InputMode,
    pub policy: ExistencePolicy,
    pub line_mode: LineMode,
    pub max_line_len: usize,
}

impl DecompressConfig {
    /// Validate the input name (no filesystem access) and use default settings.
    pub fn new(input: impl Into<PathBuf>, codec: Codec) -> Result<Self> {
        let input = input.into();
        validate_archive_name(&input, codec)?;
        Ok(Self {
            input,
            codec,
            input_mode: InputMode::default(),
            policy: ExistencePolicy::default(),
            line_mode: LineMode::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    pub fn with_input_mode(mut self, input_mode: InputMode) -> Self {
        self.input_mode = input_mode;
        self
    }

    pub fn with_policy(mut self, policy: ExistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_line_mode(mut self, line_mode: LineMode) -> Self {
        self.line_mode = line_mode;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// `<input>.csv`: the suffix is appended, the archive extension stays
    pub fn output_path(&self) -> PathBuf {
        append_extension(&self.input, CSV_EXTENSION)
    }
}

/// Settings for one text → archive run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressConfig {
    pub input: PathBuf,
    pub codec: Codec,
    pub mode: CompressMode,
    pub policy: ExistencePolicy,
    pub line_mode: LineMode,
    pub max_line_len: usize,
}

impl CompressConfig {
    /// Validate the input name (no filesystem access) and use default settings.
    pub fn new(input: impl Into<PathBuf>, codec: Codec) -> Result<Self> {
        let input = input.into();
        validate_plain_name(&input, codec)?;
        Ok(Self {
            input,
            codec,
            mode: CompressMode::default(),
            policy: ExistencePolicy::default(),
            line_mode: LineMode::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    pub fn with_mode(mut self, mode: CompressMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: ExistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_line_mode(mut self, line_mode: LineMode) -> Self {
        self.line_mode = line_mode;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// `<input>.<codec extension>`
    pub fn output_path(&self) -> PathBuf {
        append_extension(&self.input, self.codec.extension())
    }
}

/// Append `.ext` to the full path without replacing any existing extension
pub fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

// Command-line spellings of each mode

impl FromStr for InputMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::Streaming),
            "scanner" => Ok(Self::Mapped),
            other => Err(ConvertError::usage(format!(
                "unknown mmap mode '{other}', expected one of: none, scanner"
            ))),
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Streaming => "none",
            Self::Mapped => "scanner",
        })
    }
}

impl FromStr for CompressMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::Streaming),
            "scanner" => Ok(Self::Mapped),
            "direct" => Ok(Self::Direct),
            other => Err(ConvertError::usage(format!(
                "unknown mmap mode '{other}', expected one of: none, direct, scanner"
            ))),
        }
    }
}

impl fmt::Display for CompressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Streaming => "none",
            Self::Mapped => "scanner",
            Self::Direct => "direct",
        })
    }
}

impl FromStr for ExistencePolicy {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "append" => Ok(Self::Append),
            "fail" => Ok(Self::Fail),
            other => Err(ConvertError::usage(format!(
                "unknown existence policy '{other}', expected one of: overwrite, append, fail"
            ))),
        }
    }
}

impl fmt::Display for ExistencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overwrite => "overwrite",
            Self::Append => "append",
            Self::Fail => "fail",
        })
    }
}

impl FromStr for LineMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bytes" => Ok(Self::Bytes),
            "text" => Ok(Self::Text),
            other => Err(ConvertError::usage(format!(
                "unknown line mode '{other}', expected one of: bytes, text"
            ))),
        }
    }
}

impl fmt::Display for LineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bytes => "bytes",
            Self::Text => "text",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_appends_csv() {
        let config = DecompressConfig::new("data.csv.gz", Codec::Gzip).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("data.csv.gz.csv"));

        let config = DecompressConfig::new("/srv/ticks.bz2", Codec::Bzip2).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("/srv/ticks.bz2.csv"));
    }

    #[test]
    fn test_compress_output_path_appends_codec_extension() {
        let config = CompressConfig::new("prices.csv", Codec::Xz).unwrap();
        assert_eq!(config.output_path(), PathBuf::from("prices.csv.xz"));
    }

    #[test]
    fn test_bad_extension_is_usage_error_without_io() {
        // The path does not exist; only the name is checked
        let err = DecompressConfig::new("/no/such/dir/data.csv", Codec::Gzip).unwrap_err();
        assert!(matches!(err, ConvertError::Usage { .. }));

        let err = CompressConfig::new("/no/such/dir/data.csv.bz2", Codec::Bzip2).unwrap_err();
        assert!(matches!(err, ConvertError::Usage { .. }));
    }

    #[test]
    fn test_defaults_and_builders() {
        let config = DecompressConfig::new("a.xz", Codec::Xz).unwrap();
        assert_eq!(config.input_mode, InputMode::Streaming);
        assert_eq!(config.policy, ExistencePolicy::Overwrite);
        assert_eq!(config.line_mode, LineMode::Bytes);
        assert_eq!(config.max_line_len, DEFAULT_MAX_LINE_LEN);

        let config = config
            .with_input_mode(InputMode::Mapped)
            .with_policy(ExistencePolicy::Append)
            .with_line_mode(LineMode::Text)
            .with_max_line_len(10);
        assert_eq!(config.input_mode, InputMode::Mapped);
        assert_eq!(config.policy, ExistencePolicy::Append);
        assert_eq!(config.line_mode, LineMode::Text);
        assert_eq!(config.max_line_len, 10);
    }

    #[test]
    fn test_flag_spellings_round_trip() {
        for value in ["none", "scanner"] {
            assert_eq!(value.parse::<InputMode>().unwrap().to_string(), value);
        }
        for value in ["none", "scanner", "direct"] {
            assert_eq!(value.parse::<CompressMode>().unwrap().to_string(), value);
        }
        for value in ["overwrite", "append", "fail"] {
            assert_eq!(value.parse::<ExistencePolicy>().unwrap().to_string(), value);
        }
        assert!("direct".parse::<InputMode>().is_err());
        assert!("FAIL".parse::<ExistencePolicy>().is_err());
        assert_eq!("text".parse::<LineMode>().unwrap(), LineMode::Text);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Done.is_terminal());
        assert!(RunState::Failed.is_terminal());
        assert!(!RunState::Streaming.is_terminal());
    }
}
