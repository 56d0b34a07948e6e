// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML support: a content parser and a file-based descriptor provider.
//!
//! `YamlParser` decodes YAML (and JSON) documents fetched from the store.
//! `YamlDescriptorProvider` reads declaration sites from a YAML file.

use crate::domain::{ConfigError, ConfigType, DeclarationSite, Result};
use crate::ports::{ConfigParser, DescriptorProvider};
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum allowed file size for YAML descriptor files (10MB)
/// This prevents denial of service attacks via extremely large files
const MAX_YAML_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// File name looked up by [`YamlDescriptorProvider::from_default_location`].
pub const DEFAULT_SITES_FILE: &str = "sources.yaml";

/// YAML parser implementation.
///
/// This parser converts YAML documents into flat key-value maps using dot notation
/// for nested structures. JSON documents are accepted as well.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::YamlParser;
/// use cfgweave::ports::ConfigParser;
///
/// let parser = YamlParser::new();
/// let yaml_content = "database:\n  host: localhost\n  port: 5432";
/// let result = parser.parse(yaml_content).unwrap();
/// assert_eq!(result.get("database.host"), Some(&"localhost".to_string()));
/// ```
#[derive(Debug, Clone)]
pub struct YamlParser;

impl YamlParser {
    /// Creates a new YAML parser.
    pub fn new() -> Self {
        YamlParser
    }

    /// Flattens a YAML value into a flat map with dot notation keys.
    fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, result: &mut HashMap<String, String>) {
        match value {
            serde_yaml::Value::Mapping(map) => {
                for (key, val) in map {
                    let key_str = match key {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        _ => continue,
                    };
                    let new_prefix = if prefix.is_empty() {
                        key_str
                    } else {
                        format!("{}.{}", prefix, key_str)
                    };
                    Self::flatten_yaml(val, &new_prefix, result);
                }
            }
            serde_yaml::Value::Sequence(seq) => {
                for (i, val) in seq.iter().enumerate() {
                    let new_prefix = format!("{}[{}]", prefix, i);
                    Self::flatten_yaml(val, &new_prefix, result);
                }
            }
            serde_yaml::Value::String(s) => {
                result.insert(prefix.to_string(), s.clone());
            }
            serde_yaml::Value::Number(n) => {
                result.insert(prefix.to_string(), n.to_string());
            }
            serde_yaml::Value::Bool(b) => {
                result.insert(prefix.to_string(), b.to_string());
            }
            serde_yaml::Value::Null => {
                result.insert(prefix.to_string(), String::new());
            }
            serde_yaml::Value::Tagged(tagged) => {
                Self::flatten_yaml(&tagged.value, prefix, result);
            }
        }
    }
}

impl Default for YamlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigParser for YamlParser {
    fn parse(&self, content: &str) -> Result<HashMap<String, String>> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to parse YAML: {}", e),
                source: Some(Box::new(e)),
            })?;

        let mut result = HashMap::new();
        Self::flatten_yaml(&value, "", &mut result);
        Ok(result)
    }

    fn supported_types(&self) -> &[ConfigType] {
        &[ConfigType::Yaml, ConfigType::Json]
    }
}

#[derive(Debug, Deserialize)]
struct SitesDocument {
    #[serde(default)]
    sites: Vec<DeclarationSite>,
}

/// Declaration sites read from a YAML document.
///
/// ```yaml
/// sites:
///   - origin: billing::Boot
///     declarations:
///       - data_ids: [app.yml, "${stage:dev}.properties"]
///         group: BILLING
///         auto_refresh: true
///       - sources:
///           - data_id: overrides.json
///             first: true
/// ```
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::YamlDescriptorProvider;
/// use cfgweave::ports::DescriptorProvider;
///
/// let provider = YamlDescriptorProvider::from_str(
///     "sites:\n  - origin: app\n    declarations:\n      - data_id: a.yml\n",
/// )
/// .unwrap();
/// assert_eq!(provider.sites().unwrap()[0].origin.as_str(), "app");
/// ```
#[derive(Debug, Clone)]
pub struct YamlDescriptorProvider {
    /// Path the sites were read from, if any
    file_path: Option<PathBuf>,
    /// Parsed declaration sites
    sites: Vec<DeclarationSite>,
}

impl YamlDescriptorProvider {
    /// Parses declaration sites from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the document is malformed.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let document: SitesDocument =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to parse declaration sites: {}", e),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            file_path: None,
            sites: document.sites,
        })
    }

    /// Reads declaration sites from a YAML file.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use cfgweave::adapters::YamlDescriptorProvider;
    ///
    /// let provider = YamlDescriptorProvider::from_file("/etc/myapp/sources.yaml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();

        // Canonicalize path to prevent directory traversal attacks
        let canonical_path = file_path
            .canonicalize()
            .map_err(|e| file_error(&file_path, "Invalid or inaccessible path", e))?;

        // Check file size before reading to prevent DoS via large files
        let metadata = fs::metadata(&canonical_path)
            .map_err(|e| file_error(&canonical_path, "Failed to read file metadata", e))?;

        if metadata.len() > MAX_YAML_FILE_SIZE {
            return Err(ConfigError::DescriptorFileError {
                path: display_name(&canonical_path),
                message: format!(
                    "Descriptor file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_YAML_FILE_SIZE
                ),
                source: None,
            });
        }

        let content = fs::read_to_string(&canonical_path)
            .map_err(|e| file_error(&canonical_path, "Failed to read descriptor file", e))?;

        let mut provider = Self::from_str(&content)?;
        tracing::debug!(
            "Loaded {} declaration sites from {}",
            provider.sites.len(),
            canonical_path.display()
        );
        provider.file_path = Some(canonical_path);
        Ok(provider)
    }

    /// Reads `sources.yaml` from the OS-appropriate configuration directory.
    ///
    /// # Arguments
    ///
    /// * `app_name` - The application name (e.g., "myapp")
    /// * `qualifier` - The organization/qualifier (e.g., "com.example")
    pub fn from_default_location(app_name: &str, qualifier: &str) -> Result<Self> {
        Self::with_filename(app_name, qualifier, DEFAULT_SITES_FILE)
    }

    /// Reads a custom file name from the OS-appropriate configuration directory.
    pub fn with_filename(app_name: &str, qualifier: &str, filename: &str) -> Result<Self> {
        let proj_dirs = ProjectDirs::from(qualifier, "", app_name).ok_or_else(|| {
            ConfigError::DescriptorFileError {
                path: filename.to_string(),
                message: "Failed to determine project directories".to_string(),
                source: None,
            }
        })?;

        Self::from_file(proj_dirs.config_dir().join(filename))
    }

    /// Returns the path the sites were read from.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl DescriptorProvider for YamlDescriptorProvider {
    fn sites(&self) -> Result<Vec<DeclarationSite>> {
        Ok(self.sites.clone())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

fn file_error(path: &Path, message: &str, error: std::io::Error) -> ConfigError {
    ConfigError::DescriptorFileError {
        path: display_name(path),
        message: message.to_string(),
        source: Some(Box::new(error)),
    }
}
