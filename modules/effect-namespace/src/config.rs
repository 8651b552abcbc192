use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::NamespaceError;

pub const SHARDING_ENV: &str = "EFFECT_NAMESPACE_SHARDING";
pub const WARN_UNNAMESPACED_ENV: &str = "EFFECT_NAMESPACE_WARN_UNNAMESPACED";

/// How a [`NamespaceContext`](crate::NamespaceContext) picks a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sharding {
    /// The designated affinity thread gets an unlocked thread-local stack,
    /// every other thread shares the locked one.
    #[default]
    Affinity,
    /// Every thread uses the locked shared stack.
    Shared,
}

impl FromStr for Sharding {
    type Err = NamespaceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "affinity" => Ok(Self::Affinity),
            "shared" => Ok(Self::Shared),
            _ => Err(NamespaceError::InvalidConfig {
                key: SHARDING_ENV,
                value: value.to_string(),
                expected: "affinity or shared",
            }),
        }
    }
}

impl fmt::Display for Sharding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Affinity => f.write_str("affinity"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

/// Namespace context configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamespaceConfig {
    pub sharding: Sharding,
    /// Warn (once per declaration site) when an identity is read with an
    /// empty namespace after namespacing has been seen in the process.
    pub warn_unnamespaced_reads: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            sharding: Sharding::Affinity,
            warn_unnamespaced_reads: true,
        }
    }
}

impl NamespaceConfig {
    /// Load configuration from environment variables. Unset variables keep
    /// their defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self, NamespaceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same parsing as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NamespaceError> {
        let mut config = Self::default();
        if let Some(value) = lookup(SHARDING_ENV) {
            config.sharding = value.parse()?;
        }
        if let Some(value) = lookup(WARN_UNNAMESPACED_ENV) {
            config.warn_unnamespaced_reads = parse_bool(WARN_UNNAMESPACED_ENV, &value)?;
        }
        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, NamespaceError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(NamespaceError::InvalidConfig {
            key,
            value: value.to_string(),
            expected: "true or false",
        }),
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<NamespaceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: NamespaceConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
