// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared collaborators for integration tests.
//!
//! Not every test binary uses every helper, hence the `dead_code` allowances.

#![allow(dead_code)]

use cfgweave::adapters::InMemoryConfigStore;
use cfgweave::domain::{ConfigError, ConfigurationSource, Properties, Result};
use cfgweave::ports::{ContentListener, LayeredConfigConsumer, RemoteConfigStore, SubscriptionHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

/// Cached result of Docker availability check.
static DOCKER_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Checks if Docker is available on the system.
///
/// This check is cached after the first call.
pub fn is_docker_available() -> bool {
    *DOCKER_AVAILABLE.get_or_init(|| {
        std::process::Command::new("docker")
            .args(["ps"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    })
}

/// Prints a warning message that a test is skipped due to Docker being unavailable.
pub fn print_docker_unavailable_warning(test_name: &str) {
    eprintln!("\n⚠️  SKIPPED: {} - Docker is not available", test_name);
    eprintln!("   To run this test, ensure Docker is installed and running.");
    eprintln!("   Installation: https://docs.docker.com/get-docker/\n");
}

/// Installs a test-friendly tracing subscriber once per binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// A consumer that records what it was given.
#[derive(Default)]
pub struct RecordingConsumer {
    installed: Mutex<Vec<Vec<String>>>,
    changed: Mutex<Vec<String>>,
}

impl RecordingConsumer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Source names of every install call, oldest first.
    pub fn installs(&self) -> Vec<Vec<String>> {
        self.installed.lock().unwrap().clone()
    }

    /// Names passed to `source_changed`, in arrival order.
    pub fn changed(&self) -> Vec<String> {
        self.changed.lock().unwrap().clone()
    }
}

impl LayeredConfigConsumer for RecordingConsumer {
    fn install(&self, sources: &[Arc<ConfigurationSource>]) {
        self.installed
            .lock()
            .unwrap()
            .push(sources.iter().map(|s| s.name().to_string()).collect());
    }

    fn source_changed(&self, source: &ConfigurationSource) {
        self.changed.lock().unwrap().push(source.name().to_string());
    }
}

/// Wraps an in-memory store and fails the first `failures` fetches of one document.
pub struct FlakyStore {
    inner: InMemoryConfigStore,
    data_id: String,
    remaining: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: InMemoryConfigStore, data_id: &str, failures: usize) -> Self {
        Self {
            inner,
            data_id: data_id.to_string(),
            remaining: AtomicUsize::new(failures),
        }
    }
}

impl RemoteConfigStore for FlakyStore {
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        timeout: Duration,
    ) -> Result<Option<String>> {
        if data_id == self.data_id {
            let failing = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ConfigError::fetch_failure(data_id, group, "connection reset"));
            }
        }
        self.inner.fetch(data_id, group, properties, timeout)
    }

    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle> {
        self.inner.subscribe(data_id, group, properties, listener)
    }
}
