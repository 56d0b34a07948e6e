// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing implementations of the ports.
//!
//! Placeholder environments (process variables, command-line definitions, chains of
//! either), content parsers, descriptor providers and remote stores live here. Each
//! backend beyond the in-memory store is behind its own feature flag.

pub mod chained;
pub mod memory;
pub mod properties;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "env")]
pub mod env_var;
#[cfg(feature = "etcd")]
pub mod etcd;
#[cfg(feature = "reload")]
pub mod file_store;
#[cfg(feature = "redis")]
pub mod redis;
#[cfg(feature = "yaml")]
pub mod yaml_file;

pub use chained::ChainedEnvironment;
pub use memory::{InMemoryConfigStore, NAMESPACE_PROPERTY};
pub use properties::PropertiesParser;

// Re-export adapters based on feature flags
#[cfg(feature = "cli")]
pub use cli::CommandLineAdapter;
#[cfg(feature = "env")]
pub use env_var::EnvVarAdapter;
#[cfg(feature = "etcd")]
pub use etcd::EtcdConfigStore;
#[cfg(feature = "reload")]
pub use file_store::FileConfigStore;
#[cfg(feature = "redis")]
pub use redis::RedisConfigStore;
#[cfg(feature = "yaml")]
pub use yaml_file::{YamlDescriptorProvider, YamlParser};
