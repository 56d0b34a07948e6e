// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! These traits describe the collaborators the pipeline depends on: the host
//! environment, the remote store, the source of declarations, the layered consumer
//! and content parsers. Adapters in the adapters layer implement them.

pub mod consumer;
pub mod environment;
pub mod parser;
pub mod provider;
pub mod remote;

// Re-export commonly used types
pub use consumer::LayeredConfigConsumer;
pub use environment::Environment;
pub use parser::ConfigParser;
pub use provider::DescriptorProvider;
pub use remote::{ContentListener, RemoteConfigStore, SubscriptionHandle};
