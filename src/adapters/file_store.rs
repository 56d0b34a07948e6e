// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-backed remote store.
//!
//! Documents live at `<root>/[<namespace>/]<group>/<data_id>`. Subscriptions watch the
//! group directory with `notify` and deliver the new file content once writes settle.

use crate::adapters::memory::NAMESPACE_PROPERTY;
use crate::domain::{ConfigError, Properties, Result};
use crate::ports::{ContentListener, RemoteConfigStore, SubscriptionHandle};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Maximum size of a single document (10MB).
const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A remote store backed by a directory tree.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgweave::adapters::FileConfigStore;
/// use cfgweave::domain::Properties;
/// use cfgweave::ports::RemoteConfigStore;
/// use std::time::Duration;
///
/// # fn main() -> cfgweave::domain::Result<()> {
/// let store = FileConfigStore::new("/etc/myapp/store")?;
/// store.write_document("app.yml", "DEFAULT_GROUP", "server:\n  port: 8080\n")?;
///
/// let content = store.fetch("app.yml", "DEFAULT_GROUP", &Properties::new(), Duration::from_secs(1))?;
/// assert!(content.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    /// Canonical store root
    root: PathBuf,
    /// Quiet period before a change is delivered
    debounce_delay: Duration,
}

impl FileConfigStore {
    /// Opens the store rooted at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| ConfigError::StoreError {
            store: "file".to_string(),
            message: format!("Invalid store root '{}'", root.display()),
            source: Some(Box::new(e)),
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::StoreError {
                store: "file".to_string(),
                message: format!("Store root '{}' is not a directory", canonical.display()),
                source: None,
            });
        }
        Ok(Self {
            root: canonical,
            debounce_delay: DEFAULT_DEBOUNCE,
        })
    }

    /// Sets the quiet period a document must observe before listeners are notified.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Returns the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a document in the default namespace, creating its group directory.
    pub fn write_document(&self, data_id: &str, group: &str, content: &str) -> Result<()> {
        let path = self.document_path(data_id, group, &Properties::new())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(())
    }

    fn group_dir(&self, group: &str, properties: &Properties) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        if let Some(namespace) = properties.get(NAMESPACE_PROPERTY) {
            if !namespace.is_empty() {
                dir.push(checked_segment(namespace)?);
            }
        }
        dir.push(checked_segment(group)?);
        Ok(dir)
    }

    fn document_path(&self, data_id: &str, group: &str, properties: &Properties) -> Result<PathBuf> {
        Ok(self
            .group_dir(group, properties)?
            .join(checked_segment(data_id)?))
    }
}

impl RemoteConfigStore for FileConfigStore {
    // Local reads do not block long enough for the timeout to matter.
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        let path = self.document_path(data_id, group, properties)?;
        read_document(&path).map_err(|e| ConfigError::RemoteFetchFailure {
            data_id: data_id.to_string(),
            group: group.to_string(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })
    }

    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle> {
        let subscription_error = |message: String, source: Option<notify::Error>| {
            ConfigError::SubscriptionError {
                data_id: data_id.to_string(),
                group: group.to_string(),
                message,
                source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            }
        };

        let path = self.document_path(data_id, group, properties)?;
        let dir = self.group_dir(group, properties)?;
        fs::create_dir_all(&dir).map_err(|e| subscription_error(e.to_string(), None))?;

        let (event_tx, event_rx) = channel::<notify::Result<Event>>();
        let (stop_tx, stop_rx) = channel::<()>();

        let mut watcher = RecommendedWatcher::new(event_tx, notify::Config::default())
            .map_err(|e| subscription_error(format!("Failed to create file watcher: {}", e), Some(e)))?;
        // Watch the directory; editors often replace files instead of writing in place.
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| subscription_error(format!("Failed to start watching: {}", e), Some(e)))?;

        let file_name = path.file_name().map(|n| n.to_os_string());
        let debounce_delay = self.debounce_delay;
        let watched = path.clone();

        let watch_thread = thread::spawn(move || {
            let mut pending_since: Option<Instant> = None;

            loop {
                if stop_rx.try_recv().is_ok() {
                    break;
                }

                match event_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(Ok(event)) => {
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                        if ours {
                            pending_since = Some(Instant::now());
                        }
                    }
                    Ok(Err(e)) => tracing::warn!("File watch error on {}: {}", watched.display(), e),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                if pending_since.is_some_and(|since| since.elapsed() >= debounce_delay) {
                    pending_since = None;
                    match read_document(&watched) {
                        Ok(content) => listener(content),
                        Err(e) => tracing::warn!("Failed to read {}: {}", watched.display(), e),
                    }
                }
            }
        });

        tracing::debug!("Watching {}", path.display());
        Ok(SubscriptionHandle::with_cancel(
            format!("file:{}", path.display()),
            move || {
                let _ = stop_tx.send(());
                drop(watcher);
                if watch_thread.join().is_err() {
                    tracing::warn!("File watch thread panicked");
                }
            },
        ))
    }
}

/// Accepts a single path segment; anything that could escape the root is rejected.
fn checked_segment(segment: &str) -> Result<&str> {
    let problem = if segment.is_empty() {
        Some("empty segment")
    } else if segment == "." || segment == ".." {
        Some("relative path component")
    } else if segment.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if segment.contains('\0') {
        Some("contains a NUL byte")
    } else {
        None
    };
    match problem {
        Some(message) => Err(ConfigError::InvalidDocumentKey {
            store: "file".to_string(),
            segment: segment.to_string(),
            message: message.to_string(),
        }),
        None => Ok(segment),
    }
}

fn read_document(path: &Path) -> std::io::Result<Option<String>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if metadata.len() > MAX_DOCUMENT_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "document too large: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_DOCUMENT_SIZE
            ),
        ));
    }
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
