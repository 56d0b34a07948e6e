// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote configuration store trait definition.
//!
//! This module defines the `RemoteConfigStore` trait, the interface to whatever
//! service holds the configuration documents, and the handle type returned for
//! change subscriptions.

use crate::domain::{Properties, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with the new content of a watched document.
///
/// `None` means the document was removed or came back empty.
pub type ContentListener = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// A store of configuration documents addressed by `(data_id, group)`.
///
/// The merged store properties are passed with every call; stores use them to pick a
/// namespace or tenant. Reads must be idempotent and change notifications are
/// delivered at least once, possibly on a background thread.
///
/// # Examples
///
/// ```rust
/// use cfgweave::domain::{Properties, Result};
/// use cfgweave::ports::{ContentListener, RemoteConfigStore, SubscriptionHandle};
/// use std::time::Duration;
///
/// struct Constant;
///
/// impl RemoteConfigStore for Constant {
///     fn fetch(&self, _: &str, _: &str, _: &Properties, _: Duration) -> Result<Option<String>> {
///         Ok(Some("KEY=V".to_string()))
///     }
///
///     fn subscribe(
///         &self,
///         data_id: &str,
///         group: &str,
///         _: &Properties,
///         _: ContentListener,
///     ) -> Result<SubscriptionHandle> {
///         Ok(SubscriptionHandle::new(format!("{group}/{data_id}")))
///     }
/// }
///
/// let store = Constant;
/// let content = store.fetch("b", "G", &Properties::new(), Duration::from_secs(1)).unwrap();
/// assert_eq!(content.as_deref(), Some("KEY=V"));
/// ```
pub trait RemoteConfigStore: Send + Sync {
    /// Reads the current content of a document.
    ///
    /// Returns `Ok(None)` when the document does not exist.
    ///
    /// # Errors
    ///
    /// Connectivity problems and timeouts are reported as
    /// [`ConfigError::RemoteFetchFailure`](crate::domain::ConfigError::RemoteFetchFailure).
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        timeout: Duration,
    ) -> Result<Option<String>>;

    /// Registers `listener` for changes to a document.
    ///
    /// The subscription lasts until the returned handle is cancelled or dropped.
    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle>;
}

impl<S: RemoteConfigStore + ?Sized> RemoteConfigStore for Arc<S> {
    fn fetch(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        timeout: Duration,
    ) -> Result<Option<String>> {
        (**self).fetch(data_id, group, properties, timeout)
    }

    fn subscribe(
        &self,
        data_id: &str,
        group: &str,
        properties: &Properties,
        listener: ContentListener,
    ) -> Result<SubscriptionHandle> {
        (**self).subscribe(data_id, group, properties, listener)
    }
}

/// Keeps a store subscription alive; cancels it when dropped.
pub struct SubscriptionHandle {
    id: String,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Creates a handle with nothing to release on cancel.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cancel: None,
        }
    }

    /// Creates a handle that runs `cancel` once when cancelled or dropped.
    pub fn with_cancel(id: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: id.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Store-specific identifier of the subscription.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ends the subscription.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cancel_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = SubscriptionHandle::with_cancel("g/a", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(handle.id(), "g/a");
        handle.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&calls);
            let _handle = SubscriptionHandle::with_cancel("g/a", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plain_handle_drops_quietly() {
        let handle = SubscriptionHandle::new("noop");
        assert!(format!("{handle:?}").contains("active: false"));
    }
}
