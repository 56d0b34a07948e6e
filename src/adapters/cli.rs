// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line definitions as a placeholder environment.
//!
//! This module provides an adapter that reads `-D key=value` definitions from
//! command-line arguments, so deployments can pin placeholder values at launch.

use crate::domain::{ConfigError, Result};
use crate::ports::Environment;
use clap::{Arg, ArgAction, Command};
use std::collections::HashMap;

/// Environment adapter for command-line definitions.
///
/// Accepted forms:
/// - `-D key=value` and `-Dkey=value`
/// - `--define key=value` and `--define=key=value`
///
/// When a key is defined more than once the last definition wins.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::CommandLineAdapter;
/// use cfgweave::ports::Environment;
///
/// # fn main() -> cfgweave::domain::Result<()> {
/// let adapter = CommandLineAdapter::from_args(["-D", "server.addr=10.0.0.1", "--define=stage=prod"])?;
/// assert_eq!(adapter.get("server.addr").as_deref(), Some("10.0.0.1"));
/// assert_eq!(adapter.get("stage").as_deref(), Some("prod"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandLineAdapter {
    /// Parsed definitions
    values: HashMap<String, String>,
}

impl CommandLineAdapter {
    /// Creates an adapter with no definitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses definitions from `args`, which must not include the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] for malformed definitions or unknown
    /// arguments.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let matches = command()
            .try_get_matches_from(args)
            .map_err(|e| ConfigError::ParseError {
                message: format!("invalid command-line definitions: {e}"),
                source: None,
            })?;
        Ok(Self::from_matches(&matches))
    }

    /// Parses definitions from the process arguments, skipping anything else.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use cfgweave::adapters::CommandLineAdapter;
    ///
    /// let adapter = CommandLineAdapter::from_env_args();
    /// ```
    pub fn from_env_args() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        match command().ignore_errors(true).try_get_matches_from(args) {
            Ok(matches) => Self::from_matches(&matches),
            Err(e) => {
                tracing::debug!("Ignoring unparsable command-line arguments: {}", e);
                Self::new()
            }
        }
    }

    /// Adds or replaces a definition.
    pub fn define(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was defined.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let values = matches
            .get_many::<(String, String)>("define")
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        Self { values }
    }
}

impl Environment for CommandLineAdapter {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn command() -> Command {
    Command::new("cfgweave")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("define")
                .short('D')
                .long("define")
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .value_parser(parse_definition),
        )
}

fn parse_definition(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
