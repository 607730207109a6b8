//! Engine configuration.
//!
//! Loaded from TOML (or built from `Default`) once at startup and handed to
//! the `RegistryBuilder`. A frozen `Registry` carries its config so routing
//! and export always agree on the separator.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default token used to join collapsed group ids during export.
pub const DEFAULT_SEPARATOR: &str = "_";

/// Nesting depth allowed by the registration protocol: root, group, leaf.
pub const PROTOCOL_MAX_DEPTH: usize = 3;

/// Maximum description length accepted by the registration protocol.
pub const PROTOCOL_DESCRIPTION_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml: {source}")]
    ParseToml {
        #[source]
        source: toml::de::Error,
    },

    #[error("separator must not be empty")]
    EmptySeparator,

    #[error("separator `{0}` must not contain whitespace")]
    WhitespaceSeparator(String),

    #[error("description limit must be between 1 and {max}, got {got}")]
    DescriptionLimit { got: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Reserved merge separator. Never allowed inside a node id.
    pub separator: String,

    /// Validate ids and parameter names against the protocol's name pattern.
    pub enforce_protocol_names: bool,

    /// Upper bound on node and parameter descriptions.
    pub description_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            enforce_protocol_names: true,
            description_limit: PROTOCOL_DESCRIPTION_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|source| ConfigError::ParseToml { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        if self.separator.chars().any(char::is_whitespace) {
            return Err(ConfigError::WhitespaceSeparator(self.separator.clone()));
        }
        if self.description_limit == 0 || self.description_limit > PROTOCOL_DESCRIPTION_LIMIT {
            return Err(ConfigError::DescriptionLimit {
                got: self.description_limit,
                max: PROTOCOL_DESCRIPTION_LIMIT,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.separator, "_");
    }

    #[test]
    fn custom_separator_is_read() {
        let config = EngineConfig::from_toml_str("separator = \"--\"\n").unwrap();
        assert_eq!(config.separator, "--");
        assert!(config.enforce_protocol_names);
    }

    #[test]
    fn rejects_empty_and_whitespace_separators() {
        assert!(matches!(
            EngineConfig::from_toml_str("separator = \"\""),
            Err(ConfigError::EmptySeparator)
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("separator = \" \""),
            Err(ConfigError::WhitespaceSeparator(_))
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_depth = 4"),
            Err(ConfigError::ParseToml { .. })
        ));
    }

    #[test]
    fn description_limit_is_capped_by_protocol() {
        assert!(matches!(
            EngineConfig::from_toml_str("description_limit = 500"),
            Err(ConfigError::DescriptionLimit { got: 500, .. })
        ));
    }
}
