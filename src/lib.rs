// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative remote configuration sources, resolved into a deterministic layer order.
//!
//! Applications declare which remote documents they need through [`Descriptor`]s
//! attached to declaration sites. A [`ProcessingRegistry`] resolves placeholders in
//! those descriptors, fetches each document from a remote store, orders the resulting
//! sources according to their placement hints, and keeps auto-refresh sources current
//! as the store publishes changes.
//!
//! [`Descriptor`]: crate::domain::Descriptor
//! [`ProcessingRegistry`]: crate::service::ProcessingRegistry
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: descriptors, loaded sources, placeholder resolution and ordering
//! - **Ports**: traits for the environment, remote store, descriptor provider,
//!   layered consumer and content parsers
//! - **Adapters**: environments, parsers, descriptor files and remote stores
//! - **Service**: the processing registry, the refresh registrar and a layered consumer
//!
//! # Feature Flags
//!
//! - `yaml`: YAML/JSON content parsing and YAML descriptor files (default)
//! - `env`: process environment variables as placeholder values (default)
//! - `cli`: `-D key=value` command-line definitions (default)
//! - `reload`: directory-backed store with file watching
//! - `etcd`: etcd remote store
//! - `redis`: Redis remote store
//! - `remote`: all network stores (etcd + redis)
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use cfgweave::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryConfigStore::new();
//! store.publish("app.properties", "DEFAULT_GROUP", "server.port=8080");
//! store.publish("overrides.properties", "DEFAULT_GROUP", "server.port=9090");
//!
//! let layered = Arc::new(LayeredConfig::new());
//! let mut registry = ProcessingRegistry::builder()
//!     .with_environment(HashMap::<String, String>::new())
//!     .with_store(store)
//!     .with_consumer(layered.clone())
//!     .build()?;
//!
//! let site = DeclarationSite::new("app::Boot")
//!     .declare(Descriptor::new(["app.properties"]))
//!     .declare(Descriptor::new(["overrides.properties"]).first());
//! registry.process_all(&[site]);
//! registry.publish()?;
//!
//! let port = layered.get(&ConfigKey::from("server.port"))?;
//! assert_eq!(port.as_str(), "9090");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::adapters::{ChainedEnvironment, InMemoryConfigStore, PropertiesParser};
    pub use crate::domain::{
        ConfigError, ConfigKey, ConfigType, ConfigValue, ConfigurationService,
        ConfigurationSource, DeclarationSite, Descriptor, Result,
    };
    pub use crate::ports::{
        ConfigParser, DescriptorProvider, Environment, LayeredConfigConsumer, RemoteConfigStore,
    };
    pub use crate::service::{LayeredConfig, ProcessingRegistry, RegistryOptions};

    // Re-export adapters based on feature flags
    #[cfg(feature = "cli")]
    pub use crate::adapters::CommandLineAdapter;
    #[cfg(feature = "env")]
    pub use crate::adapters::EnvVarAdapter;
    #[cfg(feature = "etcd")]
    pub use crate::adapters::EtcdConfigStore;
    #[cfg(feature = "reload")]
    pub use crate::adapters::FileConfigStore;
    #[cfg(feature = "redis")]
    pub use crate::adapters::RedisConfigStore;
    #[cfg(feature = "yaml")]
    pub use crate::adapters::{YamlDescriptorProvider, YamlParser};
}
