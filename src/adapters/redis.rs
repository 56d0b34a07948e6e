// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis remote store adapter.
//!
//! Each document is a plain Redis string at `<prefix>[<namespace>:]<group>:<data_id>`.
//! Subscriptions listen for keyspace notifications on that key, which requires
//! `notify-keyspace-events` to be enabled on the server.

use crate::adapters::memory::NAMESPACE_PROPERTY;
use crate::domain::{ConfigError, Properties, Result};
use crate::ports::{ContentListener, RemoteConfigStore, SubscriptionHandle};
use redis::{Client, Commands};
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Remote store backed by Redis string keys.
///
/// **Note**: Redis keyspace notifications must be enabled for subscriptions. Set in
/// redis.conf:
/// ```text
/// notify-keyspace-events KEA
/// ```
/// or call [`RedisConfigStore::try_enable_keyspace_notifications`].
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::RedisConfigStore;
/// use cfgweave::domain::Properties;
/// use cfgweave::ports::RemoteConfigStore;
/// use std::time::Duration;
///
/// # fn main() -> cfgweave::domain::Result<()> {
/// let store = RedisConfigStore::new("redis://localhost:6379", "myapp:")?;
/// store.publish("app.yml", "DEFAULT_GROUP", "server:\n  port: 8080\n")?;
///
/// let content = store.fetch("app.yml", "DEFAULT_GROUP", &Properties::new(), Duration::from_secs(3))?;
/// assert!(content.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RedisConfigStore {
    /// Redis client
    client: Client,
    /// Prefix prepended to every document key
    prefix: String,
    /// Database index, used for keyspace channel names
    db: i64,
}

impl RedisConfigStore {
    /// Validates the key prefix to prevent pattern injection
    fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.contains(['*', '?', '[', ']', '\\']) {
            return Err(store_error(
                "Key prefix contains invalid characters (* ? [ ] \\)",
                None,
            ));
        }
        Ok(())
    }

    /// Creates a store for the given connection URL and key prefix.
    ///
    /// No connection is made until the first fetch or subscription.
    pub fn new(url: &str, prefix: &str) -> Result<Self> {
        Self::validate_prefix(prefix)?;

        let client = Client::open(url).map_err(|e| {
            store_error(format!("Failed to create Redis client: {}", e), Some(e))
        })?;
        let db = client.get_connection_info().redis.db;

        Ok(Self {
            client,
            prefix: prefix.to_string(),
            db,
        })
    }

    /// Returns the Redis key holding a document.
    pub fn document_key(&self, data_id: &str, group: &str, properties: &Properties) -> String {
        match properties.get(NAMESPACE_PROPERTY).filter(|ns| !ns.is_empty()) {
            Some(namespace) => format!("{}{}:{}:{}", self.prefix, namespace, group, data_id),
            None => format!("{}{}:{}", self.prefix, group, data_id),
        }
    }

    /// Writes a document in the default namespace.
    pub fn publish(&self, data_id: &str, group: &str, content: &str) -> Result<()> {
        let key = self.document_key(data_id, group, &Properties::new());
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| store_error(format!("Failed to connect to Redis: {}", e), Some(e)))?;
        conn.set::<_, _, ()>(&key, content)
            .map_err(|e| store_error(format!("Failed to write '{}': {}", key, e), Some(e)))?;
        tracing::debug!("Published {}", key);
        Ok(())
    }

    /// Attempts to enable keyspace notifications.
    ///
    /// This sets `notify-keyspace-events` to `KEA`, which requires permission to run
    /// `CONFIG SET` on the server.
    pub fn try_enable_keyspace_notifications(&self) -> Result<()> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| store_error(format!("Failed to connect to Redis: {}", e), Some(e)))?;

        redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("KEA")
            .query::<()>(&mut conn)
            .map_err(|e| {
                store_error(
                    format!(
                        "Failed to enable keyspace notifications. Enable manually with: CONFIG SET notify-keyspace-events KEA. Error: {}",
                        e
                    ),
                    Some(e),
                )
            })?;

        tracing::info!("Enabled Redis keyspace notifications");
        Ok(())
    }
}

impl RemoteConfigStore for RedisConfigStore {
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let key = self.document_key(data_id, group, properties);
        let failure = |message: String, e: redis::RedisError| ConfigError::RemoteFetchFailure {
            data_id: data_id.to_string(),
            group: group.to_string(),
            message,
            source: Some(Box::new(e)),
        };

        let mut conn = self
            .client
            .get_connection_with_timeout(timeout)
            .map_err(|e| failure(format!("Failed to connect to Redis: {}", e), e))?;
        conn.set_read_timeout(Some(timeout))
            .map_err(|e| failure(format!("Failed to set read timeout: {}", e), e))?;

        conn.get::<_, Option<String>>(&key)
            .map_err(|e| failure(format!("Failed to read '{}': {}", key, e), e))
    }

    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle> {
        // Fail fast when the server is unreachable; the watch thread reconnects later.
        self.client
            .get_connection()
            .map_err(|e| ConfigError::SubscriptionError {
                data_id: data_id.to_string(),
                group: group.to_string(),
                message: format!("Failed to connect to Redis: {}", e),
                source: Some(Box::new(e)),
            })?;

        let key = self.document_key(data_id, group, properties);
        let channel_name = format!("__keyspace@{}__:{}", self.db, key);
        let (stop_tx, stop_rx) = channel::<()>();

        let client = self.client.clone();
        let watched = key.clone();
        let watch_thread =
            thread::spawn(move || watch_key(&client, &channel_name, &watched, &stop_rx, &listener));

        tracing::debug!("Watching Redis key {}", key);
        Ok(SubscriptionHandle::with_cancel(
            format!("redis:{}", key),
            move || {
                let _ = stop_tx.send(());
                if watch_thread.join().is_err() {
                    tracing::warn!("Redis watch thread panicked");
                }
            },
        ))
    }
}

fn watch_key(
    client: &Client,
    channel_name: &str,
    key: &str,
    stop_rx: &Receiver<()>,
    listener: &ContentListener,
) {
    loop {
        if stop_rx.try_recv().is_ok() {
            tracing::debug!("Redis watcher stopping");
            return;
        }

        let (mut watch_conn, mut read_conn) = match (client.get_connection(), client.get_connection()) {
            (Ok(w), Ok(r)) => (w, r),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Failed to connect to Redis for watching: {}", e);
                if stop_rx.recv_timeout(RECONNECT_DELAY).is_ok() {
                    return;
                }
                continue;
            }
        };

        let mut pubsub = watch_conn.as_pubsub();
        if let Err(e) = pubsub.subscribe(channel_name) {
            tracing::error!("Failed to subscribe to Redis keyspace events: {}. Ensure keyspace notifications are enabled with: CONFIG SET notify-keyspace-events KEA", e);
            if stop_rx.recv_timeout(RECONNECT_DELAY).is_ok() {
                return;
            }
            continue;
        }
        // Periodic timeouts let the loop observe the stop signal.
        pubsub.set_read_timeout(Some(POLL_INTERVAL)).ok();
        tracing::info!("Starting Redis watch on channel: {}", channel_name);

        loop {
            if stop_rx.try_recv().is_ok() {
                tracing::debug!("Redis watcher stopping");
                return;
            }

            match pubsub.get_message() {
                Ok(msg) => {
                    let event: String = msg.get_payload().unwrap_or_default();
                    tracing::debug!("Redis key {} changed ({})", key, event);
                    match read_conn.get::<_, Option<String>>(key) {
                        Ok(content) => listener(content),
                        Err(e) => tracing::warn!("Failed to read changed key {}: {}", key, e),
                    }
                }
                Err(e) if e.is_timeout() => continue,
                Err(e) => {
                    tracing::error!("Redis pub/sub error: {}", e);
                    break;
                }
            }
        }
    }
}

fn store_error(message: impl Into<String>, source: Option<redis::RedisError>) -> ConfigError {
    ConfigError::StoreError {
        store: "redis".to_string(),
        message: message.into(),
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_pattern_characters() {
        assert!(matches!(
            RedisConfigStore::new("redis://localhost:6379", "app*"),
            Err(ConfigError::StoreError { .. })
        ));
    }

    #[test]
    fn test_invalid_url() {
        assert!(RedisConfigStore::new("not a url", "app:").is_err());
    }

    #[test]
    fn test_document_key_layout() {
        let store = RedisConfigStore::new("redis://localhost:6379/2", "app:").unwrap();
        assert_eq!(store.db, 2);
        assert_eq!(
            store.document_key("a.yml", "G", &Properties::new()),
            "app:G:a.yml"
        );

        let mut props = Properties::new();
        props.insert(NAMESPACE_PROPERTY.to_string(), "dev".to_string());
        assert_eq!(store.document_key("a.yml", "G", &props), "app:dev:G:a.yml");
    }
}
