//! Router configuration.
//!
//! Supports loading configuration from:
//! - Environment variables (`QUILL_PREFIX`, `QUILL_MATCH_CASE`, `QUILL_USAGE_PREFIX`)
//! - TOML text

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

const DEFAULT_PREFIX: &str = "!";
const DEFAULT_USAGE_PREFIX: &str = "Usage: ";

/// Configuration for text command matching and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Prefix that marks a message as a command.
    pub prefix: String,
    /// Match command names case-sensitively.
    pub match_case: bool,
    /// Prepended to usage replies.
    pub usage_prefix: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            match_case: false,
            usage_prefix: DEFAULT_USAGE_PREFIX.to_string(),
        }
    }
}

impl RouterConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_match_case(mut self, match_case: bool) -> Self {
        self.match_case = match_case;
        self
    }

    pub fn with_usage_prefix(mut self, usage_prefix: impl Into<String>) -> Self {
        self.usage_prefix = usage_prefix.into();
        self
    }

    /// Load configuration from environment variables, keeping defaults for
    /// unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(prefix) = lookup("QUILL_PREFIX") {
            config.prefix = prefix;
        }

        if let Some(raw) = lookup("QUILL_MATCH_CASE") {
            config.match_case = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        variable: "QUILL_MATCH_CASE",
                        value: raw,
                    });
                }
            };
        }

        if let Some(usage_prefix) = lookup("QUILL_USAGE_PREFIX") {
            config.usage_prefix = usage_prefix;
        }

        debug!(prefix = %config.prefix, match_case = config.match_case, "loaded router config");
        Ok(config)
    }

    /// Parse configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
