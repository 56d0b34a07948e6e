// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flattened property key used when querying layered sources.

use std::fmt;

/// A dotted property key such as `database.pool.size`.
///
/// Keys are produced by the content parsers when a source document is flattened,
/// and are what callers use to look values up across the layered sources.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::ConfigKey;
///
/// let key = ConfigKey::from("students.0.name");
/// assert_eq!(key.segments().collect::<Vec<_>>(), vec!["students", "0", "name"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Creates a new `ConfigKey` from a `String`.
    pub fn new(key: String) -> Self {
        ConfigKey(key)
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the dot separated segments of the key.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Returns a child key `self.segment`.
    pub fn child(&self, segment: &str) -> ConfigKey {
        if self.0.is_empty() {
            ConfigKey::from(segment)
        } else {
            ConfigKey(format!("{}.{}", self.0, segment))
        }
    }
}

impl From<String> for ConfigKey {
    fn from(s: String) -> Self {
        ConfigKey(s)
    }
}

impl From<&str> for ConfigKey {
    fn from(s: &str) -> Self {
        ConfigKey(s.to_string())
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_key_segments_skip_empty() {
        let key = ConfigKey::from("a..b.");
        assert_eq!(key.segments().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_config_key_child() {
        let root = ConfigKey::from("");
        let people = root.child("people");
        assert_eq!(people.as_str(), "people");
        assert_eq!(people.child("a").as_str(), "people.a");
    }

    #[test]
    fn test_config_key_hash_and_eq() {
        let mut map = HashMap::new();
        map.insert(ConfigKey::from("test.key"), "value1");

        assert_eq!(map.get(&ConfigKey::from("test.key")), Some(&"value1"));
        assert_eq!(map.get(&ConfigKey::from("other.key")), None);
    }

    #[test]
    fn test_config_key_display() {
        let key = ConfigKey::from("test.key");
        assert_eq!(format!("{}", key), "test.key");
    }
}
