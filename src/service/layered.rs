// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered view over the installed configuration sources.
//!
//! This module provides `LayeredConfig`, a consumer of the ordered source list that
//! decodes each source with a content parser and answers key lookups in priority
//! order.

use crate::domain::{
    ConfigError, ConfigKey, ConfigType, ConfigValue, ConfigurationService, ConfigurationSource,
    Result,
};
use crate::ports::{ConfigParser, LayeredConfigConsumer};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Callback invoked with the name of a source whose content changed.
pub type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

type Decoded = Arc<HashMap<String, String>>;

/// Layered configuration built from ordered sources.
///
/// Sources are queried from index 0 (highest priority) and the first hit wins. Each
/// source is decoded at most once per content revision.
///
/// # Examples
///
/// ```rust
/// use cfgweave::domain::{ConfigKey, ConfigType, ConfigurationService, ConfigurationSource};
/// use cfgweave::ports::LayeredConfigConsumer;
/// use cfgweave::service::LayeredConfig;
/// use std::sync::Arc;
///
/// let high = Arc::new(ConfigurationSource::new("high", "G", ConfigType::Properties, "port=9000"));
/// let low = Arc::new(ConfigurationSource::new("low", "G", ConfigType::Properties, "port=80\nhost=db"));
///
/// let config = LayeredConfig::new();
/// config.install(&[high, low]);
///
/// assert_eq!(config.get(&ConfigKey::from("port")).unwrap().as_str(), "9000");
/// assert_eq!(config.get(&ConfigKey::from("host")).unwrap().as_str(), "db");
/// ```
pub struct LayeredConfig {
    sources: RwLock<Vec<Arc<ConfigurationSource>>>,
    parsers: Vec<Box<dyn ConfigParser>>,
    cache: RwLock<HashMap<String, (u64, Decoded)>>,
    callbacks: RwLock<Vec<ChangeCallback>>,
}

impl LayeredConfig {
    /// Creates an empty layered configuration with the built-in parsers.
    pub fn new() -> Self {
        let mut parsers: Vec<Box<dyn ConfigParser>> =
            vec![Box::new(crate::adapters::PropertiesParser::new())];
        #[cfg(feature = "yaml")]
        parsers.push(Box::new(crate::adapters::YamlParser::new()));

        Self {
            sources: RwLock::new(Vec::new()),
            parsers,
            cache: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Adds a parser; it takes precedence over earlier parsers for the types it supports.
    pub fn with_parser(mut self, parser: Box<dyn ConfigParser>) -> Self {
        self.parsers.insert(0, parser);
        self
    }

    /// Registers a callback run after a source's content changed.
    pub fn on_change(&self, callback: ChangeCallback) {
        if let Ok(mut callbacks) = self.callbacks.write() {
            callbacks.push(callback);
        }
    }

    /// Currently installed sources in priority order.
    pub fn sources(&self) -> Vec<Arc<ConfigurationSource>> {
        self.sources
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Decoded properties of the named source.
    ///
    /// Returns `Ok(None)` if no installed source has that name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the content cannot be decoded.
    pub fn properties_of(&self, name: &str) -> Result<Option<Decoded>> {
        let source = self
            .sources()
            .into_iter()
            .find(|s| s.name() == name);
        source.map(|s| self.decode(&s)).transpose()
    }

    fn parser_for(&self, config_type: ConfigType) -> Option<&dyn ConfigParser> {
        self.parsers
            .iter()
            .find(|p| p.supports(config_type))
            .map(|p| &**p)
    }

    /// Decodes a source's current content, reusing the cached result for its revision.
    fn decode(&self, source: &ConfigurationSource) -> Result<Decoded> {
        let snapshot = source.snapshot();

        if let Ok(cache) = self.cache.read() {
            if let Some((revision, decoded)) = cache.get(source.name()) {
                if *revision == snapshot.revision {
                    return Ok(Arc::clone(decoded));
                }
            }
        }

        let parser = self
            .parser_for(source.config_type())
            .ok_or_else(|| ConfigError::ParseError {
                message: format!(
                    "no parser for content type '{}' of source '{}'",
                    source.config_type(),
                    source.name()
                ),
                source: None,
            })?;
        let decoded = Arc::new(parser.parse(&snapshot.content)?);

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                source.name().to_string(),
                (snapshot.revision, Arc::clone(&decoded)),
            );
        }
        Ok(decoded)
    }

    /// Queries the sources in priority order.
    fn query_sources(&self, key: &ConfigKey) -> Option<ConfigValue> {
        for source in self.sources() {
            match self.decode(&source) {
                Ok(decoded) => {
                    if let Some(value) = decoded.get(key.as_str()) {
                        return Some(ConfigValue::new(value.as_str(), source.name()));
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        "Skipping source '{}' for key '{}': {}",
                        source.name(),
                        key,
                        e
                    );
                }
            }
        }
        None
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationService for LayeredConfig {
    fn get(&self, key: &ConfigKey) -> Result<ConfigValue> {
        self.query_sources(key)
            .ok_or_else(|| ConfigError::ConfigKeyNotFound {
                key: key.as_str().to_string(),
            })
    }

    fn has(&self, key: &ConfigKey) -> bool {
        self.query_sources(key).is_some()
    }

    fn source_names(&self) -> Vec<String> {
        self.sources()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}

impl LayeredConfigConsumer for LayeredConfig {
    fn install(&self, sources: &[Arc<ConfigurationSource>]) {
        if let Ok(mut installed) = self.sources.write() {
            *installed = sources.to_vec();
        }
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    fn source_changed(&self, source: &ConfigurationSource) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(source.name());
        }
        let callbacks = self
            .callbacks
            .read()
            .map(|c| c.clone())
            .unwrap_or_default();
        for callback in callbacks {
            callback(source.name());
        }
    }
}

impl std::fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("sources", &self.source_names())
            .field("parsers", &self.parsers.len())
            .finish()
    }
}
