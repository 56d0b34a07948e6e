// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer driving the source pipeline.
//!
//! Descriptors are extracted from declaration sites, built into sources against the
//! remote store, ordered, and optionally kept live by the auto-refresh registrar.
//! `LayeredConfig` is the bundled consumer of the result.

pub mod builder;
pub mod extractor;
pub mod layered;
pub mod refresh;
pub mod registry;

// Re-export commonly used types
pub use builder::SourceBuilder;
pub use extractor::extract;
pub use layered::{ChangeCallback, LayeredConfig};
pub use refresh::{AutoRefreshRegistrar, RegistrationOutcome};
pub use registry::{ProcessReport, ProcessingRegistry, ProcessingRegistryBuilder, RegistryOptions};
