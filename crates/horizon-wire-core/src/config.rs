//! Dispatcher configuration loaded from TOML.
//!
//! ```toml
//! [coercion]
//! color_fallback = "black"
//! number_format = "de-DE"
//! trim = true
//!
//! [reporting]
//! level = "warn"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::coerce::CoercionConfig;
use crate::report::ReportLevel;

/// Errors raised while loading configuration or property sheets.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid TOML or does not match the expected layout.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A key holds a value that cannot be used as property text.
    #[error("Unsupported value for '{key}': {found}")]
    UnsupportedValue { key: String, found: &'static str },
}

impl ConfigError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Reporting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportingConfig {
    /// Level at which the default sink logs failures.
    pub level: ReportLevel,
}

/// Top-level configuration of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WireConfig {
    pub coercion: CoercionConfig,
    pub reporting: ReportingConfig,
}

impl WireConfig {
    /// Parse configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
        Self::from_toml_str(&text)
    }
}
