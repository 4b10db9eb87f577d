//! Protocol Configuration
//!
//! Knobs for how protocols are declared and extended. Loaded from TOML;
//! every field has a default so partial files are accepted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{Classifier, DEFAULT_TYPE_KEY};
use crate::protocol::DEFAULT_REST_MARKER;
use crate::value::Keyword;

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration for protocol declaration and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Metadata key holding a value's nominal type.
    pub type_meta_key: String,

    /// Parameter name that introduces the rest collector.
    pub rest_marker: String,

    /// What a flat `extend` does with a trailing protocol that has no
    /// method table.
    pub odd_arguments: OddArgumentPolicy,

    /// What declaring an already-bound protocol name does to its registry.
    pub redeclare: RedeclarePolicy,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            type_meta_key: DEFAULT_TYPE_KEY.to_string(),
            rest_marker: DEFAULT_REST_MARKER.to_string(),
            odd_arguments: OddArgumentPolicy::Ignore,
            redeclare: RedeclarePolicy::Reset,
        }
    }
}

/// Trailing-argument policy for flat `extend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddArgumentPolicy {
    /// Drop the leftover argument and log a warning.
    #[default]
    Ignore,
    /// Fail with `InvalidArgumentCount` before registering anything.
    Reject,
}

/// Redeclaration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeclarePolicy {
    /// Bind a fresh empty registry; earlier registrations are lost.
    #[default]
    Reset,
    /// Keep the existing registry and only regenerate forwarders.
    Preserve,
}

impl ProtocolConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Renders this configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns a classifier reading the configured type key.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(Keyword::new(&self.type_meta_key))
    }
}
