// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process remote store.
//!
//! `InMemoryConfigStore` keeps documents in memory and delivers change notifications
//! synchronously on the publishing thread. It also simulates latency and outages, so
//! the pipeline's timeout and retry behavior can be exercised without a server.

pub use crate::domain::NAMESPACE_PROPERTY;

use crate::domain::{ConfigError, Properties, Result};
use crate::ports::{ContentListener, RemoteConfigStore, SubscriptionHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

/// `(namespace, group, data_id)`
type DocumentKey = (String, String, String);

#[derive(Default)]
struct Inner {
    documents: RwLock<HashMap<DocumentKey, String>>,
    listeners: Mutex<HashMap<DocumentKey, Vec<(u64, ContentListener)>>>,
    next_listener: AtomicU64,
    latency_ms: AtomicU64,
    offline: AtomicBool,
    fetches: AtomicUsize,
}

/// A remote configuration store held in memory.
///
/// Clones share the same documents and subscribers.
///
/// # Examples
///
/// ```rust
/// use cfgweave::adapters::InMemoryConfigStore;
/// use cfgweave::domain::Properties;
/// use cfgweave::ports::RemoteConfigStore;
/// use std::time::Duration;
///
/// let store = InMemoryConfigStore::new();
/// store.publish("b", "G", "KEY=V");
///
/// let content = store.fetch("b", "G", &Properties::new(), Duration::from_secs(1)).unwrap();
/// assert_eq!(content.as_deref(), Some("KEY=V"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<Inner>,
}

impl InMemoryConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a document in the default namespace and notifies its subscribers.
    pub fn publish(&self, data_id: &str, group: &str, content: impl Into<String>) {
        self.publish_in("", data_id, group, content);
    }

    /// Publishes a document in `namespace` and notifies its subscribers.
    pub fn publish_in(
        &self,
        namespace: &str,
        data_id: &str,
        group: &str,
        content: impl Into<String>,
    ) {
        let key = document_key(namespace, data_id, group);
        let content = content.into();
        if let Ok(mut documents) = self.inner.documents.write() {
            documents.insert(key.clone(), content.clone());
        }
        tracing::debug!(namespace, data_id, group, "published document");
        self.notify(&key, Some(content));
    }

    /// Removes a document from the default namespace and notifies its subscribers.
    pub fn remove(&self, data_id: &str, group: &str) -> Option<String> {
        let key = document_key("", data_id, group);
        let removed = self
            .inner
            .documents
            .write()
            .ok()
            .and_then(|mut documents| documents.remove(&key));
        if removed.is_some() {
            self.notify(&key, None);
        }
        removed
    }

    /// Delays every fetch by `latency`; a latency above the fetch timeout fails the fetch.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Simulates an outage: fetches and new subscriptions fail while offline.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of listeners on a document in the default namespace.
    pub fn subscriber_count(&self, data_id: &str, group: &str) -> usize {
        self.subscriber_count_in("", data_id, group)
    }

    /// Number of listeners on a document in `namespace`.
    pub fn subscriber_count_in(&self, namespace: &str, data_id: &str, group: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|listeners| {
                listeners
                    .get(&document_key(namespace, data_id, group))
                    .map_or(0, Vec::len)
            })
            .unwrap_or_default()
    }

    /// Number of fetch calls served so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    fn notify(&self, key: &DocumentKey, content: Option<String>) {
        let listeners: Vec<ContentListener> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners
                .get(key)
                .map(|l| l.iter().map(|(_, listener)| Arc::clone(listener)).collect())
                .unwrap_or_default(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(content.clone());
        }
    }
}

impl RemoteConfigStore for InMemoryConfigStore {
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        timeout: Duration,
    ) -> Result<Option<String>> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);

        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(ConfigError::fetch_failure(data_id, group, "store is offline"));
        }

        let latency = Duration::from_millis(self.inner.latency_ms.load(Ordering::SeqCst));
        if latency > timeout {
            std::thread::sleep(timeout);
            return Err(ConfigError::fetch_failure(
                data_id,
                group,
                format!("timed out after {}ms", timeout.as_millis()),
            ));
        }
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }

        let key = document_key(namespace_of(properties), data_id, group);
        Ok(self
            .inner
            .documents
            .read()
            .ok()
            .and_then(|documents| documents.get(&key).cloned()))
    }

    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(ConfigError::SubscriptionError {
                data_id: data_id.to_string(),
                group: group.to_string(),
                message: "store is offline".to_string(),
                source: None,
            });
        }

        let key = document_key(namespace_of(properties), data_id, group);
        let id = self.inner.next_listener.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.entry(key.clone()).or_default().push((id, listener));
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle_id = format!("memory:{}/{}/{}#{id}", key.0, key.1, key.2);
        Ok(SubscriptionHandle::with_cancel(handle_id, move || {
            if let Some(inner) = weak.upgrade() {
                if let Ok(mut listeners) = inner.listeners.lock() {
                    if let Some(attached) = listeners.get_mut(&key) {
                        attached.retain(|(listener_id, _)| *listener_id != id);
                        if attached.is_empty() {
                            listeners.remove(&key);
                        }
                    }
                }
            }
        }))
    }
}

impl std::fmt::Debug for InMemoryConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let documents = self.inner.documents.read().map(|d| d.len()).unwrap_or(0);
        f.debug_struct("InMemoryConfigStore")
            .field("documents", &documents)
            .field("offline", &self.inner.offline.load(Ordering::SeqCst))
            .finish()
    }
}

fn namespace_of(properties: &Properties) -> &str {
    properties
        .get(NAMESPACE_PROPERTY)
        .map(String::as_str)
        .unwrap_or("")
}

fn document_key(namespace: &str, data_id: &str, group: &str) -> DocumentKey {
    (namespace.to_string(), group.to_string(), data_id.to_string())
}
