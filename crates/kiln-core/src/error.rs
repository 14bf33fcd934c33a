//! Error types for Kiln

use thiserror::Error;

/// The main error type for Kiln operations
#[derive(Debug, Error)]
pub enum KilnError {
    #[error("Unsupported scene version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// Result type alias for Kiln operations
pub type Result<T> = std::result::Result<T, KilnError>;

impl From<serde_json::Error> for KilnError {
    fn from(err: serde_json::Error) -> Self {
        KilnError::JsonError(err.to_string())
    }
}

impl From<toml::de::Error> for KilnError {
    fn from(err: toml::de::Error) -> Self {
        KilnError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for KilnError {
    fn from(err: toml::ser::Error) -> Self {
        KilnError::TomlSerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_converts() {
        let err: KilnError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(err, KilnError::JsonError(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }

    #[test]
    fn test_toml_error_converts() {
        let err: KilnError = toml::from_str::<toml::Table>("key = ").unwrap_err().into();
        assert!(matches!(err, KilnError::TomlParseError(_)));
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/kiln/scene.json")?)
        }
        assert!(matches!(open_missing(), Err(KilnError::IoError(_))));
    }

    #[test]
    fn test_version_message() {
        let err = KilnError::UnsupportedVersion { found: 9, supported: 2 };
        assert_eq!(
            err.to_string(),
            "Unsupported scene version 9 (newest supported is 2)"
        );
    }
}
