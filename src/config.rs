//! Injector configuration and the sources it is loaded from.
//!
//! Settings come from a [`ConfigSource`]: the process environment (keys
//! prefixed with `FERROUS_INJECTOR_`), an in-memory map, or with the `config`
//! feature a JSON document.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default prefix for environment variables.
pub const ENV_PREFIX: &str = "FERROUS_INJECTOR";

/// Source of raw configuration values.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Value for a lowercase key such as `max_depth`.
    fn get(&self, key: &str) -> Option<String>;

    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source.
#[derive(Debug, Clone)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl Default for EnvironmentConfigSource {
    fn default() -> Self {
        Self::with_prefix(ENV_PREFIX)
    }
}

impl EnvironmentConfigSource {
    /// Unprefixed variables.
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(self.env_key(key)).ok()
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => key
                    .strip_prefix(&format!("{}_", prefix.to_uppercase()))
                    .map(str::to_lowercase),
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory configuration source.
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    values: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Runtime settings of an injector.
///
/// # Examples
///
/// ```
/// use ferrous_injector::{InjectorConfig, MapConfigSource};
///
/// let source = MapConfigSource::new().set("max_depth", "32");
/// let config = InjectorConfig::load(&source).unwrap();
/// assert_eq!(config.max_depth, 32);
/// assert!(config.release_idle_resolutions);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct InjectorConfig {
    /// Longest provider chain a single resolution may build.
    pub max_depth: usize,
    /// Remove short-lived resolution nodes that ended up owning nothing.
    pub release_idle_resolutions: bool,
    /// Emit a `trace` event with timing for every resolution.
    pub trace_resolutions: bool,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            release_idle_resolutions: true,
            trace_resolutions: false,
        }
    }
}

impl InjectorConfig {
    /// Defaults overridden by whatever `source` provides.
    pub fn load(source: &dyn ConfigSource) -> DiResult<Self> {
        let defaults = Self::default();
        let config = Self {
            max_depth: parse_or(source, "max_depth", defaults.max_depth)?,
            release_idle_resolutions: parse_or(
                source,
                "release_idle_resolutions",
                defaults.release_idle_resolutions,
            )?,
            trace_resolutions: parse_or(source, "trace_resolutions", defaults.trace_resolutions)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads `FERROUS_INJECTOR_*` environment variables.
    pub fn from_env() -> DiResult<Self> {
        Self::load(&EnvironmentConfigSource::default())
    }

    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| DiError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::Configuration("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(source: &dyn ConfigSource, key: &str, default: T) -> DiResult<T> {
    match source.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DiError::Configuration(format!("invalid value `{raw}` for {key}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_valid() {
        let config = InjectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, 256);
    }

    #[test]
    fn bad_values_are_configuration_errors() {
        let source = MapConfigSource::new().set("release_idle_resolutions", "maybe");
        let err = InjectorConfig::load(&source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: invalid value `maybe` for release_idle_resolutions"
        );

        let source = MapConfigSource::new().set("max_depth", "0");
        assert!(InjectorConfig::load(&source).is_err());
    }

    #[test]
    #[serial]
    fn environment_source_uses_prefix() {
        env::set_var("FERROUS_INJECTOR_TEST_UNIT_KEY", "on");
        let source = EnvironmentConfigSource::default();
        assert_eq!(source.get("test_unit_key").as_deref(), Some("on"));
        assert!(source.keys().contains(&"test_unit_key".to_string()));
        env::remove_var("FERROUS_INJECTOR_TEST_UNIT_KEY");
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = InjectorConfig::from_json_str(r#"{ "trace_resolutions": true }"#).unwrap();
        assert!(config.trace_resolutions);
        assert_eq!(config.max_depth, 256);
    }
}
