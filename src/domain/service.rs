// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query interface over the layered configuration sources.
//!
//! This module defines the `ConfigurationService` trait, the read side that an
//! application uses once the ordered sources have been installed into a layered
//! consumer.

use crate::domain::{ConfigKey, ConfigValue, Result};

/// Name reported by [`ConfigurationService::get_or_default`] for fallback values.
pub const DEFAULT_SOURCE_NAME: &str = "<default>";

/// Read access to properties merged from the ordered configuration sources.
///
/// Implementations look keys up in resolved source order, index 0 first, and return
/// the first hit.
///
/// # Examples
///
/// ```rust
/// use cfgweave::domain::{ConfigKey, ConfigValue, ConfigurationService, Result};
///
/// struct Fixed;
///
/// impl ConfigurationService for Fixed {
///     fn get(&self, key: &ConfigKey) -> Result<ConfigValue> {
///         Ok(ConfigValue::new("localhost", "fixed"))
///     }
///
///     fn has(&self, _key: &ConfigKey) -> bool {
///         true
///     }
///
///     fn source_names(&self) -> Vec<String> {
///         vec!["fixed".to_string()]
///     }
/// }
///
/// let service = Fixed;
/// let value = service.get(&ConfigKey::from("database.host")).unwrap();
/// assert_eq!(value.as_str(), "localhost");
/// assert_eq!(value.source_name(), "fixed");
/// ```
pub trait ConfigurationService {
    /// Retrieves the value for `key` from the highest-priority source that defines it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigKeyNotFound`](crate::domain::ConfigError::ConfigKeyNotFound)
    /// when no source defines the key.
    fn get(&self, key: &ConfigKey) -> Result<ConfigValue>;

    /// Retrieves the value for `key`, or `default` attributed to [`DEFAULT_SOURCE_NAME`].
    fn get_or_default(&self, key: &ConfigKey, default: &str) -> ConfigValue {
        self.get(key)
            .unwrap_or_else(|_| ConfigValue::new(default, DEFAULT_SOURCE_NAME))
    }

    /// Checks whether any source defines `key`.
    fn has(&self, key: &ConfigKey) -> bool;

    /// Names of the installed sources in priority order.
    fn source_names(&self) -> Vec<String>;
}
