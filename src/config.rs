//! Persisted defaults for the command-line tools
//!
//! With the `config` feature, defaults are read from the TOML file named by
//! `$CSVZIP_CONFIG`, or `<config dir>/csvzip/config.toml`:
//!
//! ```toml
//! mmap = "scanner"
//! csv = "append"
//! lines = "text"
//! max_line_len = 131072
//! ```
//!
//! Every key is optional and command-line flags override them. Without the
//! feature [`load`] always yields empty settings.

use crate::error::Result;
use crate::file_handler::{ExistencePolicy, InputMode};
use crate::pipeline::LineMode;

/// Environment variable naming an explicit settings file
pub const CONFIG_ENV: &str = "CSVZIP_CONFIG";

/// Defaults that apply when the matching flag is absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(deny_unknown_fields))]
pub struct Settings {
    /// Input mode of the decompressors
    pub mmap: Option<InputMode>,
    /// Existence policy for the output file
    pub csv: Option<ExistencePolicy>,
    pub lines: Option<LineMode>,
    pub max_line_len: Option<usize>,
}

#[cfg(feature = "config")]
impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| crate::error::ConvertError::config(e.to_string()))
    }
}

/// Location of the settings file, if one can be determined
#[cfg(feature = "config")]
pub fn settings_path() -> Option<std::path::PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(path.into());
    }
    dirs::config_dir().map(|dir| dir.join("csvzip").join("config.toml"))
}

/// Load persisted defaults; a missing file yields empty settings.
#[cfg(feature = "config")]
pub fn load() -> Result<Settings> {
    use crate::error::ConvertError;

    let Some(path) = settings_path() else {
        return Ok(Settings::default());
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            log::debug!("Loading settings from {}", path.display());
            Settings::from_toml_str(&text)
                .map_err(|e| ConvertError::config(format!("{}: {e}", path.display())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(e) => Err(ConvertError::config(format!(
            "cannot read {}: {e}",
            path.display()
        ))),
    }
}

#[cfg(not(feature = "config"))]
pub fn load() -> Result<Settings> {
    Ok(Settings::default())
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn test_parse_full_settings() {
        let settings = Settings::from_toml_str(
            r#"
            mmap = "scanner"
            csv = "fail"
            lines = "text"
            max_line_len = 1024
            "#,
        )
        .unwrap();

        assert_eq!(settings.mmap, Some(InputMode::Mapped));
        assert_eq!(settings.csv, Some(ExistencePolicy::Fail));
        assert_eq!(settings.lines, Some(LineMode::Text));
        assert_eq!(settings.max_line_len, Some(1024));
    }

    #[test]
    fn test_empty_settings() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let err = Settings::from_toml_str(r#"mmap = "direct""#).unwrap_err();
        assert!(matches!(err, ConvertError::Config { .. }));

        let err = Settings::from_toml_str("colour = true").unwrap_err();
        assert!(matches!(err, ConvertError::Config { .. }));
    }
}
