// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the configuration source pipeline.
//!
//! This module defines the errors raised while resolving descriptors, fetching remote
//! documents, ordering sources and decoding their content. All errors use `thiserror`
//! for proper error handling and conversion.

use std::num::{ParseFloatError, ParseIntError};
use std::str::ParseBoolError;
use thiserror::Error;

/// The main error type for configuration source operations.
///
/// The enum is marked `#[non_exhaustive]` to allow for future additions without
/// breaking backwards compatibility.
///
/// # Examples
///
/// ```
/// use cfgweave::domain::errors::ConfigError;
///
/// fn lookup() -> Result<String, ConfigError> {
///     Err(ConfigError::UnresolvedPlaceholder {
///         key: "server.addr".to_string(),
///         expression: "${server.addr}".to_string(),
///     })
/// }
///
/// assert!(!lookup().unwrap_err().is_retryable());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A `${key}` reference had no value in the environment and no default.
    #[error("Could not resolve placeholder '{key}' in \"{expression}\"")]
    UnresolvedPlaceholder {
        /// The key that was missing
        key: String,
        /// The expression being resolved
        expression: String,
    },

    /// A descriptor is structurally unusable (for example it names no documents).
    #[error("Invalid descriptor declared by '{origin}': {message}")]
    InvalidDescriptor {
        /// The declaration site that produced the descriptor
        origin: String,
        /// The error message
        message: String,
    },

    /// The remote store could not be reached or did not answer in time.
    #[error("Failed to fetch '{data_id}' in group '{group}': {message}")]
    RemoteFetchFailure {
        /// The document identifier being fetched
        data_id: String,
        /// The group being fetched
        group: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Ordering hints form a cycle or reference an unknown source.
    #[error("Ordering conflict between [{}]: {message}", .sources.join(", "))]
    OrderingConflict {
        /// The names of the offending sources
        sources: Vec<String>,
        /// The error message
        message: String,
    },

    /// A change subscription could not be established on the remote store.
    #[error("Failed to subscribe to '{data_id}' in group '{group}': {message}")]
    SubscriptionError {
        /// The document identifier being watched
        data_id: String,
        /// The group being watched
        group: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A remote store adapter could not be created or lost its connection.
    #[error("Remote store '{store}' error: {message}")]
    StoreError {
        /// The name of the store adapter
        store: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A resolved data id, group or namespace cannot name a document in the store.
    #[error("Invalid document key '{segment}' for store '{store}': {message}")]
    InvalidDocumentKey {
        /// The name of the store adapter
        store: String,
        /// The rejected key segment
        segment: String,
        /// The error message
        message: String,
    },

    /// A descriptor file could not be located, read or accepted.
    #[error("Descriptor file '{path}' error: {message}")]
    DescriptorFileError {
        /// The path of the descriptor file
        path: String,
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to parse a descriptor document or source content.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// The error message
        message: String,
        /// The underlying parsing error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The requested key is not present in any layered source.
    #[error("Configuration key not found: {key}")]
    ConfigKeyNotFound {
        /// The key that was not found
        key: String,
    },

    /// Failed to convert a configuration value to the requested type.
    #[error(
        "Failed to convert configuration value for key '{key}' to type {target_type}: {source}"
    )]
    TypeConversionError {
        /// The key being converted
        key: String,
        /// The target type name
        target_type: String,
        /// The underlying conversion error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O error occurred while reading configuration.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    /// Returns `true` when the failure is transient and the operation may be retried.
    ///
    /// Retry policy itself belongs to the remote client; this only classifies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConfigError::RemoteFetchFailure { .. }
                | ConfigError::SubscriptionError { .. }
                | ConfigError::StoreError { .. }
        )
    }

    /// Creates a `RemoteFetchFailure` without an underlying cause.
    pub fn fetch_failure(
        data_id: impl Into<String>,
        group: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::RemoteFetchFailure {
            data_id: data_id.into(),
            group: group.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates an `OrderingConflict` naming the given sources.
    pub fn ordering_conflict<I, S>(sources: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConfigError::OrderingConflict {
            sources: sources.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    /// Creates a TypeConversionError from a ParseIntError.
    pub fn from_parse_int_error(key: String, err: ParseIntError) -> Self {
        ConfigError::TypeConversionError {
            key,
            target_type: "integer".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a TypeConversionError from a ParseFloatError.
    pub fn from_parse_float_error(key: String, err: ParseFloatError) -> Self {
        ConfigError::TypeConversionError {
            key,
            target_type: "float".to_string(),
            source: Box::new(err),
        }
    }

    /// Creates a TypeConversionError from a ParseBoolError.
    pub fn from_parse_bool_error(key: String, err: ParseBoolError) -> Self {
        ConfigError::TypeConversionError {
            key,
            target_type: "boolean".to_string(),
            source: Box::new(err),
        }
    }
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
