// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing the core types and algorithms.
//!
//! Descriptors, loaded sources, placeholder resolution and source ordering live here.
//! Nothing in this layer talks to a remote store directly; it only depends on the
//! port traits.

pub mod config_key;
pub mod config_type;
pub mod config_value;
pub mod descriptor;
pub mod errors;
pub mod ordering;
pub mod placeholder;
pub mod service;
pub mod source;

// Re-export commonly used types
pub use config_key::ConfigKey;
pub use config_type::ConfigType;
pub use config_value::ConfigValue;
pub use descriptor::{
    Declaration, DeclarationSite, Descriptor, DescriptorGroup, OrderingHints, Origin, Properties,
    DEFAULT_GROUP, NAMESPACE_PROPERTY,
};
pub use errors::{ConfigError, Result};
pub use ordering::OrderingResolver;
pub use service::ConfigurationService;
pub use source::{derive_name, ConfigurationSource, SourceSnapshot};
