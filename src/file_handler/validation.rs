//! Input validation run before any file is opened.
//!
//! Name checks (`validate_archive_name`, `validate_plain_name`) look at the path
//! string only and never touch the filesystem, so a wrong extension fails before
//! any I/O. `validate_input_file` then checks that the path is a readable regular file.

use crate::codec::Codec;
use crate::error::{ConvertError, Result};
use std::io;
use std::path::Path;

/// Require `path` to carry the codec's archive extension
pub fn validate_archive_name(path: &Path, codec: Codec) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ConvertError::usage(format!(
            "expecting input {codec} file name as the positional argument"
        )));
    }
    if !codec.matches_path(path) {
        return Err(ConvertError::usage(format!(
            "input {codec} file name should have '.{}' extension: {}",
            codec.extension(),
            path.display()
        )));
    }
    Ok(())
}

/// Require `path` to NOT carry the codec's archive extension
pub fn validate_plain_name(path: &Path, codec: Codec) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ConvertError::usage(
            "expecting input text file name as the positional argument",
        ));
    }
    if codec.matches_path(path) {
        return Err(ConvertError::usage(format!(
            "input text file name shouldn't have '.{}' extension: {}",
            codec.extension(),
            path.display()
        )));
    }
    Ok(())
}

/// Validate that an input path exists and is a regular file
///
/// # Error Cases
/// - File does not exist
/// - Path points to a directory or other non-regular file
pub fn validate_input_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|source| ConvertError::InputOpen {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(ConvertError::InputOpen {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    Ok(())
}
