// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration content parser trait definition.
//!
//! This module defines the `ConfigParser` trait, which decodes the raw content of a
//! configuration source into flat properties. Decoding is delegated to parsers so the
//! pipeline itself stays format-agnostic.

use crate::domain::{ConfigType, Result};
use std::collections::HashMap;

/// A trait for decoding configuration documents.
///
/// # Key Format
///
/// Parsers should flatten nested structures using dot notation. For example,
/// a YAML structure like:
///
/// ```yaml
/// database:
///   host: localhost
///   port: 5432
/// ```
///
/// Should be parsed into:
/// - `database.host` -> `"localhost"`
/// - `database.port` -> `"5432"`
///
/// # Examples
///
/// ```rust
/// use cfgweave::domain::{ConfigType, Result};
/// use cfgweave::ports::ConfigParser;
/// use std::collections::HashMap;
///
/// struct LineParser;
///
/// impl ConfigParser for LineParser {
///     fn parse(&self, content: &str) -> Result<HashMap<String, String>> {
///         Ok(content
///             .lines()
///             .enumerate()
///             .map(|(i, line)| (format!("line.{i}"), line.to_string()))
///             .collect())
///     }
///
///     fn supported_types(&self) -> &[ConfigType] {
///         &[ConfigType::Text]
///     }
/// }
///
/// let parsed = LineParser.parse("a\nb").unwrap();
/// assert_eq!(parsed.get("line.1").map(String::as_str), Some("b"));
/// ```
pub trait ConfigParser: Send + Sync {
    /// Parses content into a flat key-value map.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`](crate::domain::ConfigError::ParseError) when the
    /// content is malformed.
    fn parse(&self, content: &str) -> Result<HashMap<String, String>>;

    /// Content types this parser understands.
    fn supported_types(&self) -> &[ConfigType];

    /// Returns `true` if this parser understands `config_type`.
    fn supports(&self, config_type: ConfigType) -> bool {
        self.supported_types().contains(&config_type)
    }
}
