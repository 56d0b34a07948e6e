// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property value returned from the layered sources.
//!
//! Values are stored as strings and remember which configuration source supplied
//! them, which makes precedence questions easy to answer when debugging.

use crate::domain::errors::{ConfigError, Result};
use std::fmt;
use std::str::FromStr;

/// A property value together with the name of the source it was read from.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::ConfigValue;
///
/// let value = ConfigValue::new("42", "test-2|DEFAULT_GROUP|0");
/// assert_eq!(value.as_i64("answer").unwrap(), 42);
/// assert_eq!(value.source_name(), "test-2|DEFAULT_GROUP|0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigValue {
    value: String,
    source_name: String,
}

impl ConfigValue {
    /// Creates a value attributed to `source_name`.
    pub fn new(value: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source_name: source_name.into(),
        }
    }

    /// Returns the value as a string slice.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Name of the configuration source that supplied this value.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Interprets the value as a boolean.
    ///
    /// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, case-insensitively.
    pub fn as_bool(&self, key: &str) -> Result<bool> {
        match self.value.to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => self
                .value
                .parse::<bool>()
                .map_err(|e| ConfigError::from_parse_bool_error(key.to_string(), e)),
        }
    }

    /// Parses the value as an `i64`.
    pub fn as_i64(&self, key: &str) -> Result<i64> {
        self.value
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e))
    }

    /// Parses the value as an `f64`.
    pub fn as_f64(&self, key: &str) -> Result<f64> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|e| ConfigError::from_parse_float_error(key.to_string(), e))
    }

    /// Parses the value into any `FromStr` type.
    pub fn parse<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.value
            .parse::<T>()
            .map_err(|e| ConfigError::TypeConversionError {
                key: key.to_string(),
                target_type: std::any::type_name::<T>().to_string(),
                source: Box::new(e),
            })
    }
}

impl AsRef<str> for ConfigValue {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
