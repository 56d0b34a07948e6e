// SPDX-License-Identifier: MIT OR Apache-2.0

//! etcd remote store adapter.
//!
//! Documents are stored as values at `<prefix>[<namespace>/]<group>/<data_id>` and
//! subscriptions use etcd's native watch API. The async client is driven from a
//! shared tokio runtime so the store can be used from synchronous code.

use crate::adapters::memory::NAMESPACE_PROPERTY;
use crate::domain::{ConfigError, Properties, Result};
use crate::ports::{ContentListener, RemoteConfigStore, SubscriptionHandle};
use etcd_client::{Client, EventType};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Runtime shared by every etcd store in the process
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn shared_runtime() -> Result<Arc<Runtime>> {
    RUNTIME
        .get_or_try_init(|| Runtime::new().map(Arc::new))
        .map(Arc::clone)
        .map_err(|e| ConfigError::StoreError {
            store: "etcd".to_string(),
            message: "Failed to create tokio runtime".to_string(),
            source: Some(Box::new(e)),
        })
}

/// Remote store backed by an etcd cluster.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::EtcdConfigStore;
/// use cfgweave::domain::Properties;
/// use cfgweave::ports::RemoteConfigStore;
/// use std::time::Duration;
///
/// # fn main() -> cfgweave::domain::Result<()> {
/// let store = EtcdConfigStore::connect(["localhost:2379"], "myapp/")?;
/// let content = store.fetch("app.yml", "DEFAULT_GROUP", &Properties::new(), Duration::from_secs(3))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EtcdConfigStore {
    /// etcd client; clones share the underlying channel
    client: Client,
    /// Prefix prepended to every document key
    prefix: String,
    /// Runtime driving the async client
    runtime: Arc<Runtime>,
}

impl EtcdConfigStore {
    /// Connects to the given endpoints.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - etcd endpoints (e.g., `["localhost:2379"]`)
    /// * `prefix` - key prefix for every document (e.g., `"myapp/"`)
    pub fn connect<I, S>(endpoints: I, prefix: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints: Vec<String> = endpoints
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let runtime = shared_runtime()?;

        let client = block_on(&runtime, Client::connect(endpoints, None)).map_err(|e| {
            ConfigError::StoreError {
                store: "etcd".to_string(),
                message: format!("Failed to connect to etcd: {}", e),
                source: Some(Box::new(e)),
            }
        })?;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
            runtime,
        })
    }

    /// Returns the etcd key holding a document.
    pub fn document_key(&self, data_id: &str, group: &str, properties: &Properties) -> String {
        match properties.get(NAMESPACE_PROPERTY).filter(|ns| !ns.is_empty()) {
            Some(namespace) => format!("{}{}/{}/{}", self.prefix, namespace, group, data_id),
            None => format!("{}{}/{}", self.prefix, group, data_id),
        }
    }

    /// Writes a document in the default namespace.
    pub fn publish(&self, data_id: &str, group: &str, content: &str) -> Result<()> {
        let key = self.document_key(data_id, group, &Properties::new());
        let mut client = self.client.clone();
        block_on(&self.runtime, client.put(key.as_str(), content, None)).map_err(|e| {
            ConfigError::StoreError {
                store: "etcd".to_string(),
                message: format!("Failed to write '{}': {}", key, e),
                source: Some(Box::new(e)),
            }
        })?;
        tracing::debug!("Published {}", key);
        Ok(())
    }
}

impl std::fmt::Debug for EtcdConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdConfigStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl RemoteConfigStore for EtcdConfigStore {
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let key = self.document_key(data_id, group, properties);
        let mut client = self.client.clone();

        let response = block_on(&self.runtime, async {
            tokio::time::timeout(timeout, client.get(key.as_str(), None)).await
        })
        .map_err(|_| {
            ConfigError::fetch_failure(
                data_id,
                group,
                format!("timed out after {}ms", timeout.as_millis()),
            )
        })?
        .map_err(|e| ConfigError::RemoteFetchFailure {
            data_id: data_id.to_string(),
            group: group.to_string(),
            message: format!("Failed to read '{}': {}", key, e),
            source: Some(Box::new(e)),
        })?;

        match response.kvs().first() {
            Some(kv) => kv
                .value_str()
                .map(|v| Some(v.to_string()))
                .map_err(|e| ConfigError::RemoteFetchFailure {
                    data_id: data_id.to_string(),
                    group: group.to_string(),
                    message: format!("Value of '{}' is not UTF-8", key),
                    source: Some(Box::new(e)),
                }),
            None => Ok(None),
        }
    }

    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle> {
        let key = self.document_key(data_id, group, properties);
        let (stop_tx, stop_rx) = channel::<()>();

        let client = self.client.clone();
        let runtime = Arc::clone(&self.runtime);
        let watched = key.clone();
        let watch_thread = thread::spawn(move || {
            runtime.block_on(watch_key(client, &watched, &stop_rx, &listener));
        });

        tracing::debug!("Watching etcd key {}", key);
        Ok(SubscriptionHandle::with_cancel(
            format!("etcd:{}", key),
            move || {
                let _ = stop_tx.send(());
                if watch_thread.join().is_err() {
                    tracing::warn!("etcd watch thread panicked");
                }
            },
        ))
    }
}

async fn watch_key(mut client: Client, key: &str, stop_rx: &Receiver<()>, listener: &ContentListener) {
    loop {
        if stop_rx.try_recv().is_ok() {
            tracing::debug!("etcd watcher stopping");
            return;
        }

        let (mut watcher, mut stream) = match client.watch(key, None).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("Failed to create etcd watch on {}: {}", key, e);
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        tracing::info!("Starting etcd watch on key: {}", key);

        loop {
            if stop_rx.try_recv().is_ok() {
                tracing::debug!("etcd watcher stopping");
                let _ = watcher.cancel().await;
                return;
            }

            tokio::select! {
                message = stream.message() => match message {
                    Ok(Some(response)) => {
                        for event in response.events() {
                            let content = match event.event_type() {
                                EventType::Put => event
                                    .kv()
                                    .and_then(|kv| kv.value_str().ok())
                                    .map(str::to_string),
                                EventType::Delete => None,
                            };
                            tracing::debug!("etcd key changed: {}", key);
                            listener(content);
                        }
                    }
                    Ok(None) => {
                        tracing::warn!("etcd watch stream on {} closed", key);
                        break;
                    }
                    Err(e) => {
                        tracing::error!("etcd watch error on {}: {}", key, e);
                        break;
                    }
                },
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

/// Runs a future to completion, moving to a helper thread when already inside a runtime.
fn block_on<F>(runtime: &Runtime, future: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        thread::scope(|scope| {
            let handle = scope.spawn(|| runtime.block_on(future));
            match handle.join() {
                Ok(output) => output,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        })
    } else {
        runtime.block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_unreachable_endpoint() {
        // Nothing listens on port 1; connect fails without a server.
        let result = EtcdConfigStore::connect(["127.0.0.1:1"], "app/");
        if let Err(e) = result {
            assert!(matches!(e, ConfigError::StoreError { .. }));
        }
    }

    #[test]
    fn test_shared_runtime_is_reused() {
        let a = shared_runtime().unwrap();
        let b = shared_runtime().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
