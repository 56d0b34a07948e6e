// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host key/value environment used for placeholder resolution.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Read-only key/value lookup that `${key}` placeholders are resolved against.
///
/// Implementations must be `Send + Sync`: auto-refresh re-resolves placeholders on the
/// remote store's notification thread, against whatever the environment holds then.
///
/// # Examples
///
/// ```rust
/// use cfgweave::ports::Environment;
/// use std::collections::HashMap;
///
/// let mut env = HashMap::new();
/// env.insert("server.addr".to_string(), "127.0.0.1:8848".to_string());
///
/// assert_eq!(Environment::get(&env, "server.addr").as_deref(), Some("127.0.0.1:8848"));
/// assert!(!Environment::contains(&env, "missing"));
/// ```
pub trait Environment: Send + Sync {
    /// Looks up `key`, returning `None` when it is missing.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns `true` when `key` is present.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

impl Environment for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for Arc<E> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}
