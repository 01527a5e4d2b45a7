//! TOML configuration file parsing.
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Load a TOML file into `T`, or `T`'s empty-document value if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file exists but cannot be read, and
/// [`ConfigError::InvalidConfigFile`] if it cannot be parsed.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidConfigFile {
        path: path.display().to_string(),
        message,
    };

    if !path.exists() {
        // Missing files behave like an empty document
        return toml::from_str("").map_err(|e| invalid(e.to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| invalid(e.message().to_string()))
}
