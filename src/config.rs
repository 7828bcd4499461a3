//! Configuration for promises and the combinators built on them.
//!
//! This module provides:
//! - [`PromiseConfig`]: per-promise tuning, inherited by derived promises
//! - Validation for guardrail invariants
//! - Layered loading (defaults + env + overrides) via [`ConfigLoader`]
//!
//! Environment variables use the `SETTLE_` prefix:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SETTLE_LISTENER_WARN_THRESHOLD` | [`PromiseConfig::listener_warn_threshold`] |
//! | `SETTLE_CATCH_LISTENER_PANICS` | [`PromiseConfig::catch_listener_panics`] |
//! | `SETTLE_CATCH_TRANSFORM_PANICS` | [`PromiseConfig::catch_transform_panics`] |

use std::collections::BTreeMap;

const ENV_KEYS: [&str; 3] = [
    "SETTLE_LISTENER_WARN_THRESHOLD",
    "SETTLE_CATCH_LISTENER_PANICS",
    "SETTLE_CATCH_TRANSFORM_PANICS",
];

/// Tuning knobs carried by every promise.
///
/// Promises created by a combinator from a source promise copy the source's
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseConfig {
    /// Number of queued listeners on a pending promise after which a single
    /// warning is logged. Must be greater than zero.
    pub listener_warn_threshold: usize,
    /// Log and swallow panics raised by completion listeners. Every
    /// listener runs either way; when false the first panic is re-raised
    /// on the settling thread after the last listener returns.
    pub catch_listener_panics: bool,
    /// Swallow panics raised by map transforms once they have rejected the
    /// derived promise. When false the panic is re-raised afterwards.
    pub catch_transform_panics: bool,
}

impl PromiseConfig {
    /// Default listener warning threshold.
    pub const DEFAULT_LISTENER_WARN_THRESHOLD: usize = 64;

    /// Returns the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listener_warn_threshold: Self::DEFAULT_LISTENER_WARN_THRESHOLD,
            catch_listener_panics: true,
            catch_transform_panics: true,
        }
    }

    /// Sets the listener warning threshold.
    #[must_use]
    pub const fn listener_warn_threshold(mut self, threshold: usize) -> Self {
        self.listener_warn_threshold = threshold;
        self
    }

    /// Sets whether listener panics are caught.
    #[must_use]
    pub const fn catch_listener_panics(mut self, catch: bool) -> Self {
        self.catch_listener_panics = catch;
        self
    }

    /// Sets whether transform panics are caught.
    #[must_use]
    pub const fn catch_transform_panics(mut self, catch: bool) -> Self {
        self.catch_transform_panics = catch;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidListenerThreshold`] for a zero threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listener_warn_threshold == 0 {
            return Err(ConfigError::InvalidListenerThreshold);
        }
        Ok(())
    }

    /// Loads defaults layered with `SETTLE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable does not parse or the result
    /// fails [`validate`](Self::validate).
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }
}

impl Default for PromiseConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration loader with layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base: PromiseConfig,
    read_env: bool,
    overrides: BTreeMap<String, String>,
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults that reads the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: PromiseConfig::default(),
            read_env: true,
            overrides: BTreeMap::new(),
        }
    }

    /// Sets the base configuration (lowest precedence).
    #[must_use]
    pub fn base(mut self, config: PromiseConfig) -> Self {
        self.base = config;
        self
    }

    /// Skips the environment layer.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Adds a programmatic override (highest precedence).
    #[must_use]
    pub fn override_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads configuration with precedence:
    /// 1. Base configuration (lowest)
    /// 2. Environment variables
    /// 3. Programmatic overrides (highest)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] for an unknown override key,
    /// [`ConfigError::Parse`] for a value that does not parse, and any
    /// validation error of the merged configuration.
    pub fn load(&self) -> Result<PromiseConfig, ConfigError> {
        let mut config = self.base;
        if self.read_env {
            apply_env_overrides(&mut config)?;
        }
        apply_overrides(&mut config, &self.overrides)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from configuration loading and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A value could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
    /// An override key is not recognised.
    #[error("unknown config key: {0}")]
    InvalidOverride(String),
    /// The listener warning threshold is zero.
    #[error("listener_warn_threshold must be > 0")]
    InvalidListenerThreshold,
}

fn apply_env_overrides(config: &mut PromiseConfig) -> Result<(), ConfigError> {
    // Unknown SETTLE_* variables are ignored; only overrides are strict.
    let mut overrides = BTreeMap::new();
    for key in ENV_KEYS {
        if let Ok(value) = std::env::var(key) {
            overrides.insert(key.to_string(), value);
        }
    }
    apply_overrides(config, &overrides)
}

fn apply_overrides(
    config: &mut PromiseConfig,
    overrides: &BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    for (key, value) in overrides {
        apply_override(config, key, value)?;
    }
    Ok(())
}

fn apply_override(config: &mut PromiseConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "SETTLE_LISTENER_WARN_THRESHOLD" => {
            config.listener_warn_threshold = parse_usize(value, key)?;
        }
        "SETTLE_CATCH_LISTENER_PANICS" => {
            config.catch_listener_panics = parse_bool(value, key)?;
        }
        "SETTLE_CATCH_TRANSFORM_PANICS" => {
            config.catch_transform_panics = parse_bool(value, key)?;
        }
        _ => return Err(ConfigError::InvalidOverride(key.to_string())),
    }
    Ok(())
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::Parse(format!("invalid usize for {key}: {value}")))
}

fn parse_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Parse(format!(
            "invalid bool for {key}: {value}"
        ))),
    }
}
