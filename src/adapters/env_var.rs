// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-environment adapter for placeholder resolution.
//!
//! This module provides an `Environment` backed by the process environment
//! variables, with optional in-process overrides.

use crate::ports::Environment;
use std::collections::HashMap;
use std::env;
use std::sync::RwLock;

/// Maximum length for environment variable keys (prevents DoS)
const MAX_ENV_KEY_LEN: usize = 512;

/// Maximum length for environment variable values (prevents DoS)
const MAX_ENV_VALUE_LEN: usize = 1048576; // 1MB

/// Environment adapter for process environment variables.
///
/// Lookups are live: every call reads the process environment, so placeholders
/// re-resolved during auto-refresh see the values in effect at that moment.
///
/// A key such as `server.addr` is looked up first verbatim and then in its relaxed
/// form `SERVER_ADDR` (upper case, `.` and `-` replaced by `_`). When a prefix is
/// configured it is prepended to both forms.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::EnvVarAdapter;
/// use cfgweave::ports::Environment;
/// use std::collections::HashMap;
///
/// let adapter = EnvVarAdapter::with_prefix("MYAPP_");
///
/// let mut values = HashMap::new();
/// values.insert("server.addr".to_string(), "127.0.0.1".to_string());
/// let fixed = EnvVarAdapter::with_values(values);
/// assert_eq!(fixed.get("server.addr").as_deref(), Some("127.0.0.1"));
/// ```
#[derive(Debug)]
pub struct EnvVarAdapter {
    /// Optional prefix prepended to variable names
    prefix: Option<String>,
    /// Whether the process environment is consulted at all
    read_process: bool,
    /// In-process values that shadow the process environment
    overrides: RwLock<HashMap<String, String>>,
}

impl EnvVarAdapter {
    /// Creates an adapter over the whole process environment.
    pub fn new() -> Self {
        Self {
            prefix: None,
            read_process: true,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an adapter that only sees variables starting with `prefix`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use cfgweave::adapters::EnvVarAdapter;
    ///
    /// let adapter = EnvVarAdapter::with_prefix("MYAPP_");
    /// ```
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Creates an adapter over a fixed set of values, ignoring the process environment.
    ///
    /// **Note**: This is primarily intended for tests and embedded setups.
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self {
            prefix: None,
            read_process: false,
            overrides: RwLock::new(values),
        }
    }

    /// Sets an in-process value that shadows the process environment.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut overrides) = self.overrides.write() {
            overrides.insert(key.into(), value.into());
        }
    }

    /// Removes an in-process value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.overrides
            .write()
            .ok()
            .and_then(|mut overrides| overrides.remove(key))
    }

    /// Candidate variable names for `key`, in lookup order.
    fn candidates(&self, key: &str) -> Vec<String> {
        let prefix = self.prefix.as_deref().unwrap_or("");
        let relaxed: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        let mut names = vec![format!("{prefix}{key}")];
        let relaxed = format!("{prefix}{relaxed}");
        if relaxed != names[0] {
            names.push(relaxed);
        }
        names
    }

    fn read_process(&self, key: &str) -> Option<String> {
        if key.len() > MAX_ENV_KEY_LEN {
            tracing::debug!(
                "Skipping oversized environment key lookup: key_len={} (max={})",
                key.len(),
                MAX_ENV_KEY_LEN
            );
            return None;
        }

        for name in self.candidates(key) {
            if let Ok(value) = env::var(&name) {
                if value.len() > MAX_ENV_VALUE_LEN {
                    tracing::debug!(
                        "Skipping oversized environment variable '{}': value_len={} (max={})",
                        name,
                        value.len(),
                        MAX_ENV_VALUE_LEN
                    );
                    continue;
                }
                return Some(value);
            }
        }
        None
    }
}

impl Default for EnvVarAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for EnvVarAdapter {
    fn get(&self, key: &str) -> Option<String> {
        if let Ok(overrides) = self.overrides.read() {
            if let Some(value) = overrides.get(key) {
                return Some(value.clone());
            }
        }
        if self.read_process {
            self.read_process(key)
        } else {
            None
        }
    }
}
