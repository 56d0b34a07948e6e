// SPDX-License-Identifier: MIT OR Apache-2.0

//! Several environments consulted in order.

use crate::ports::Environment;
use std::sync::Arc;

/// An environment that asks each member in turn; the first hit wins.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::ChainedEnvironment;
/// use cfgweave::ports::Environment;
/// use std::collections::HashMap;
///
/// let mut launch = HashMap::new();
/// launch.insert("stage".to_string(), "prod".to_string());
/// let mut defaults = HashMap::new();
/// defaults.insert("stage".to_string(), "dev".to_string());
/// defaults.insert("region".to_string(), "eu".to_string());
///
/// let env = ChainedEnvironment::new().with(launch).with(defaults);
/// assert_eq!(env.get("stage").as_deref(), Some("prod"));
/// assert_eq!(env.get("region").as_deref(), Some("eu"));
/// ```
#[derive(Clone, Default)]
pub struct ChainedEnvironment {
    members: Vec<Arc<dyn Environment>>,
}

impl ChainedEnvironment {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an environment with lower precedence than those already added.
    pub fn with(self, environment: impl Environment + 'static) -> Self {
        self.with_shared(Arc::new(environment))
    }

    /// Appends an already shared environment.
    pub fn with_shared(mut self, environment: Arc<dyn Environment>) -> Self {
        self.members.push(environment);
        self
    }

    /// Number of chained environments.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Environment for ChainedEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.members.iter().find_map(|member| member.get(key))
    }
}

impl std::fmt::Debug for ChainedEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedEnvironment")
            .field("members", &self.members.len())
            .finish()
    }
}
