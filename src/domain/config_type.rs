// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content type of a remote configuration document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format of a configuration document's raw content.
///
/// The type travels with a loaded source so the consumer can pick a decoder; the
/// pipeline itself never decodes content.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::ConfigType;
///
/// assert_eq!(ConfigType::infer("a.yml"), Some(ConfigType::Yaml));
/// assert_eq!(ConfigType::infer("c.json"), Some(ConfigType::Json));
/// assert_eq!(ConfigType::infer("b"), None);
/// assert_eq!(ConfigType::default(), ConfigType::Properties);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    /// Flat `key=value` lines.
    #[default]
    Properties,
    /// YAML document.
    #[serde(alias = "yml")]
    Yaml,
    /// JSON document.
    Json,
    /// XML document.
    Xml,
    /// Opaque text.
    Text,
    /// HTML document.
    Html,
    /// TOML document.
    Toml,
}

impl ConfigType {
    /// Every known content type.
    pub const ALL: [ConfigType; 7] = [
        ConfigType::Properties,
        ConfigType::Yaml,
        ConfigType::Json,
        ConfigType::Xml,
        ConfigType::Text,
        ConfigType::Html,
        ConfigType::Toml,
    ];

    /// Canonical lowercase name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::Properties => "properties",
            ConfigType::Yaml => "yaml",
            ConfigType::Json => "json",
            ConfigType::Xml => "xml",
            ConfigType::Text => "text",
            ConfigType::Html => "html",
            ConfigType::Toml => "toml",
        }
    }

    /// Maps a file extension (without the dot, any case) to a type.
    pub fn from_extension(extension: &str) -> Option<ConfigType> {
        match extension.to_ascii_lowercase().as_str() {
            "properties" => Some(ConfigType::Properties),
            "yaml" | "yml" => Some(ConfigType::Yaml),
            "json" => Some(ConfigType::Json),
            "xml" => Some(ConfigType::Xml),
            "txt" | "text" => Some(ConfigType::Text),
            "html" | "htm" => Some(ConfigType::Html),
            "toml" => Some(ConfigType::Toml),
            _ => None,
        }
    }

    /// Infers the type from the trailing extension of a document identifier.
    ///
    /// Returns `None` when the identifier has no extension or an unknown one.
    pub fn infer(data_id: &str) -> Option<ConfigType> {
        let (stem, extension) = data_id.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Self::from_extension(extension)
    }

    /// Picks the effective type: an explicit hint wins, then inference, then the default.
    pub fn resolve(hint: Option<ConfigType>, data_id: &str) -> ConfigType {
        hint.or_else(|| Self::infer(data_id)).unwrap_or_default()
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .or_else(|| ConfigType::from_extension(s))
            .ok_or_else(|| format!("unknown config type '{}'", s))
    }
}
