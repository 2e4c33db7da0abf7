//! Engine configuration.
//!
//! [`EngineConfig`] holds the few knobs the resolution engine has. It can be
//! built directly or loaded from a [`ConfigProvider`], which layers
//! [`ConfigSource`]s such as environment variables or a JSON file.

use std::collections::HashMap;
use std::env;

use parking_lot::RwLock;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};
use crate::internal::MAX_DEPTH;

/// A configuration value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(untagged))]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    pub fn as_string(&self) -> DiResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(DiError::Config(format!("{:?} is not a string", other))),
        }
    }

    pub fn as_i64(&self) -> DiResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(DiError::Config(format!("{:?} is not an integer", other))),
        }
    }

    /// Floats, with integers widened.
    pub fn as_f64(&self) -> DiResult<f64> {
        match self {
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::Integer(i) => Ok(*i as f64),
            other => Err(DiError::Config(format!("{:?} is not a number", other))),
        }
    }

    pub fn as_bool(&self) -> DiResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            other => Err(DiError::Config(format!("{:?} is not a boolean", other))),
        }
    }

    /// Parses raw text the way environment variables are read.
    fn parse(raw: String) -> Self {
        if let Ok(int_val) = raw.parse::<i64>() {
            ConfigValue::Integer(int_val)
        } else if let Ok(float_val) = raw.parse::<f64>() {
            ConfigValue::Float(float_val)
        } else if let Ok(bool_val) = raw.parse::<bool>() {
            ConfigValue::Boolean(bool_val)
        } else {
            ConfigValue::String(raw)
        }
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Value for a dotted key such as `resolution.max_depth`
    fn get(&self, key: &str) -> Option<ConfigValue>;

    fn keys(&self) -> Vec<String>;
}

/// Environment variable source.
///
/// A dotted key maps to an upper-case variable with dots replaced by
/// underscores, behind the optional prefix: with prefix `app`, the key
/// `resolution.max_depth` reads `APP_RESOLUTION_MAX_DEPTH`.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable(&self, key: &str) -> String {
        let key = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key),
            None => key,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.variable(key)).ok().map(ConfigValue::parse)
    }

    fn keys(&self) -> Vec<String> {
        let prefix = self.prefix.as_ref().map(|p| format!("{}_", p.to_uppercase()));
        env::vars()
            .filter_map(|(key, _)| match &prefix {
                Some(prefix) => key.strip_prefix(prefix.as_str()).map(str::to_lowercase),
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// Source backed by a map, handy for tests and embedded defaults.
#[derive(Debug, Default)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// JSON file source with a flat object of dotted keys.
#[cfg(feature = "config")]
#[derive(Debug)]
pub struct JsonConfigSource {
    file_path: std::path::PathBuf,
    config: RwLock<Option<HashMap<String, ConfigValue>>>,
}

#[cfg(feature = "config")]
impl JsonConfigSource {
    pub fn new(file_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            config: RwLock::new(None),
        }
    }

    /// Reload configuration from file
    pub fn reload(&self) -> DiResult<()> {
        let content = std::fs::read_to_string(&self.file_path)
            .map_err(|e| DiError::Config(format!("{}: {}", self.file_path.display(), e)))?;
        let parsed: HashMap<String, ConfigValue> = serde_json::from_str(&content)
            .map_err(|e| DiError::Config(format!("{}: {}", self.file_path.display(), e)))?;
        *self.config.write() = Some(parsed);
        Ok(())
    }
}

#[cfg(feature = "config")]
impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        if self.config.read().is_none() {
            if let Err(error) = self.reload() {
                tracing::warn!(%error, "configuration file could not be loaded");
                return None;
            }
        }
        self.config.read().as_ref()?.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.config
            .read()
            .as_ref()
            .map(|cfg| cfg.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Layered configuration lookup.
///
/// Sources are consulted in the order they were added; the first one holding
/// a key wins.
#[derive(Debug, Default)]
pub struct ConfigProvider {
    sources: Vec<Box<dyn ConfigSource>>,
    cache: RwLock<HashMap<String, ConfigValue>>,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider reading environment variables behind `prefix`.
    pub fn from_env(prefix: impl Into<String>) -> Self {
        let mut provider = Self::new();
        provider.add_source(Box::new(EnvironmentConfigSource::with_prefix(prefix)));
        provider
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
        self.cache.write().clear();
    }

    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    fn require(&self, key: &str) -> DiResult<ConfigValue> {
        self.get(key)
            .ok_or_else(|| DiError::Config(format!("key {} not found", key)))
    }

    pub fn get_string(&self, key: &str) -> DiResult<String> {
        self.require(key)?.as_string().map(str::to_string)
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_i64(&self, key: &str) -> DiResult<i64> {
        self.require(key)?.as_i64()
    }

    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get_i64(key).unwrap_or(default)
    }

    pub fn get_f64(&self, key: &str) -> DiResult<f64> {
        self.require(key)?.as_f64()
    }

    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        self.get_f64(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> DiResult<bool> {
        self.require(key)?.as_bool()
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Resolution engine settings.
///
/// ```
/// use ferrous_injector::{ConfigProvider, ConfigValue, EngineConfig, MapConfigSource};
///
/// let mut provider = ConfigProvider::new();
/// provider.add_source(Box::new(
///     MapConfigSource::new().with("resolution.max_depth", ConfigValue::Integer(64)),
/// ));
///
/// let config = EngineConfig::load(&provider).unwrap();
/// assert_eq!(config.max_depth, 64);
/// assert_eq!(config.root_name, "Root");
/// assert!(config.single_flight);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct EngineConfig {
    /// Name of the root injector in diagnostic paths
    pub root_name: String,
    /// Maximum nesting of constructions in one resolution chain
    pub max_depth: usize,
    /// Serialize concurrent first builds of one identifier on one injector
    pub single_flight: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_name: "Root".to_string(),
            max_depth: MAX_DEPTH,
            single_flight: true,
        }
    }
}

impl EngineConfig {
    /// Loads settings, keeping defaults for absent keys.
    ///
    /// Keys: `root.name`, `resolution.max_depth`, `resolution.single_flight`.
    pub fn load(config: &ConfigProvider) -> DiResult<Self> {
        let defaults = Self::default();
        let max_depth = config.get_i64_or("resolution.max_depth", defaults.max_depth as i64);
        if max_depth <= 0 {
            return Err(DiError::Config(format!(
                "resolution.max_depth must be positive, got {}",
                max_depth
            )));
        }

        let loaded = Self {
            root_name: config.get_string_or("root.name", &defaults.root_name),
            max_depth: max_depth as usize,
            single_flight: config.get_bool_or("resolution.single_flight", defaults.single_flight),
        };
        tracing::debug!(
            root_name = %loaded.root_name,
            max_depth = loaded.max_depth,
            single_flight = loaded.single_flight,
            "engine configuration loaded"
        );
        Ok(loaded)
    }
}
