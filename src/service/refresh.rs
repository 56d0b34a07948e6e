// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change subscriptions for auto-refreshing sources.
//!
//! One store subscription is opened per document: `(data_id, group)` within the
//! namespace selected by the source's resolved store properties. Every source
//! registered under that key is attached to the same subscription, so a notification
//! updates all of them while the store only ever sees a single listener.

use crate::domain::placeholder;
use crate::domain::{ConfigurationSource, Properties, Result, NAMESPACE_PROPERTY};
use crate::ports::{
    ContentListener, Environment, LayeredConfigConsumer, RemoteConfigStore, SubscriptionHandle,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Identifies one remote document; the empty namespace is the store default.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SubscriptionKey {
    namespace: String,
    data_id: String,
    group: String,
}

impl SubscriptionKey {
    fn of(source: &ConfigurationSource, properties: &Properties) -> Self {
        Self {
            namespace: properties.get(NAMESPACE_PROPERTY).cloned().unwrap_or_default(),
            data_id: source.data_id().to_string(),
            group: source.group().to_string(),
        }
    }
}

/// What [`AutoRefreshRegistrar::register`] did with a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new store subscription was opened for the source's key.
    Subscribed,
    /// The source joined an existing subscription.
    Attached,
    /// A source with the same name was already registered under the key.
    AlreadyRegistered,
}

struct RefreshTarget {
    source: Arc<ConfigurationSource>,
    environment: Arc<dyn Environment>,
}

type Targets = Arc<RwLock<Vec<RefreshTarget>>>;

struct Subscription {
    targets: Targets,
    _handle: SubscriptionHandle,
}

/// Subscribes auto-refresh sources to remote changes and republishes new content.
pub struct AutoRefreshRegistrar {
    store: Arc<dyn RemoteConfigStore>,
    consumer: Option<Arc<dyn LayeredConfigConsumer>>,
    subscriptions: Mutex<HashMap<SubscriptionKey, Subscription>>,
}

impl AutoRefreshRegistrar {
    /// Creates a registrar over `store`, notifying `consumer` of content changes.
    pub fn new(
        store: Arc<dyn RemoteConfigStore>,
        consumer: Option<Arc<dyn LayeredConfigConsumer>>,
    ) -> Self {
        Self {
            store,
            consumer,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `source` for change notifications.
    ///
    /// Registering is idempotent per document and per source name. Sources for the
    /// same `(data_id, group)` in different namespaces get separate subscriptions,
    /// each opened with the registering source's own properties.
    /// Re-registering a name swaps in the new source instance without touching the
    /// store subscription.
    ///
    /// # Errors
    ///
    /// Returns the store's error when a new subscription cannot be opened.
    pub fn register(
        &self,
        source: Arc<ConfigurationSource>,
        environment: Arc<dyn Environment>,
    ) -> Result<RegistrationOutcome> {
        let properties = source.snapshot().properties.clone();
        let key = SubscriptionKey::of(&source, &properties);
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(subscription) = subscriptions.get(&key) {
            let mut targets = subscription
                .targets
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(existing) = targets
                .iter_mut()
                .find(|t| t.source.name() == source.name())
            {
                debug!(name = source.name(), "source already registered for refresh");
                existing.source = source;
                existing.environment = environment;
                return Ok(RegistrationOutcome::AlreadyRegistered);
            }
            debug!(
                name = source.name(),
                data_id = %key.data_id,
                group = %key.group,
                namespace = %key.namespace,
                "attaching source to existing subscription"
            );
            targets.push(RefreshTarget {
                source,
                environment,
            });
            return Ok(RegistrationOutcome::Attached);
        }

        let targets: Targets = Arc::new(RwLock::new(vec![RefreshTarget {
            source,
            environment,
        }]));
        let listener = self.listener(&key, Arc::clone(&targets));
        let handle = self
            .store
            .subscribe(&key.data_id, &key.group, &properties, listener)?;

        info!(
            data_id = %key.data_id,
            group = %key.group,
            namespace = %key.namespace,
            subscription = handle.id(),
            "subscribed to remote changes"
        );
        subscriptions.insert(
            key,
            Subscription {
                targets,
                _handle: handle,
            },
        );
        Ok(RegistrationOutcome::Subscribed)
    }

    /// Number of open store subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .map(|s| s.len())
            .unwrap_or_default()
    }

    /// Number of sources attached to the subscription for `(data_id, group)` in the
    /// default namespace.
    pub fn target_count(&self, data_id: &str, group: &str) -> usize {
        self.target_count_in("", data_id, group)
    }

    /// Number of sources attached to the subscription for `(data_id, group)` in
    /// `namespace`.
    pub fn target_count_in(&self, namespace: &str, data_id: &str, group: &str) -> usize {
        let subscriptions = match self.subscriptions.lock() {
            Ok(subscriptions) => subscriptions,
            Err(_) => return 0,
        };
        let key = SubscriptionKey {
            namespace: namespace.to_string(),
            data_id: data_id.to_string(),
            group: group.to_string(),
        };
        subscriptions
            .get(&key)
            .and_then(|s| s.targets.read().ok().map(|t| t.len()))
            .unwrap_or_default()
    }

    /// Cancels every store subscription.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = match self.subscriptions.lock() {
            Ok(mut subscriptions) => subscriptions.drain().collect(),
            Err(_) => return,
        };
        for (key, _subscription) in drained {
            info!(
                data_id = %key.data_id,
                group = %key.group,
                namespace = %key.namespace,
                "cancelled remote subscription"
            );
        }
    }

    fn listener(&self, key: &SubscriptionKey, targets: Targets) -> ContentListener {
        let consumer = self.consumer.clone();
        let SubscriptionKey { data_id, group, .. } = key.clone();
        Arc::new(move |content: Option<String>| {
            let content = match content {
                Some(content) if !content.trim().is_empty() => content,
                _ => {
                    warn!(
                        data_id = %data_id,
                        group = %group,
                        "ignoring empty change notification"
                    );
                    return;
                }
            };

            let attached: Vec<(Arc<ConfigurationSource>, Arc<dyn Environment>)> = targets
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .iter()
                .map(|t| (Arc::clone(&t.source), Arc::clone(&t.environment)))
                .collect();

            for (source, environment) in attached {
                refresh_source(&source, environment.as_ref(), &content, consumer.as_deref());
            }
        })
    }
}

impl std::fmt::Debug for AutoRefreshRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoRefreshRegistrar")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Applies new content to one source. Returns `true` if the source changed.
fn refresh_source(
    source: &ConfigurationSource,
    environment: &dyn Environment,
    content: &str,
    consumer: Option<&dyn LayeredConfigConsumer>,
) -> bool {
    let _guard = source.lock_updates();
    let current = source.snapshot();

    let properties =
        match placeholder::resolve_properties(source.property_templates(), environment) {
            Ok(properties) => properties,
            Err(e) => {
                warn!(
                    name = source.name(),
                    error = %e,
                    "keeping previous store properties"
                );
                current.properties.clone()
            }
        };

    if current.content == content && current.properties == properties {
        debug!(name = source.name(), "content unchanged, not republishing");
        return false;
    }

    let snapshot = source.replace(content.to_string(), properties);
    debug!(
        name = source.name(),
        revision = snapshot.revision,
        "source content refreshed"
    );
    if let Some(consumer) = consumer {
        consumer.source_changed(source);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryConfigStore;
    use crate::domain::{ConfigType, Properties};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConsumer {
        changed: AtomicUsize,
    }

    impl LayeredConfigConsumer for CountingConsumer {
        fn install(&self, _sources: &[Arc<ConfigurationSource>]) {}

        fn source_changed(&self, _source: &ConfigurationSource) {
            self.changed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn source(data_id: &str, name: &str) -> Arc<ConfigurationSource> {
        Arc::new(
            ConfigurationSource::new(data_id, "G", ConfigType::Properties, "KEY=V")
                .with_name(name)
                .with_auto_refresh(true),
        )
    }

    fn empty_env() -> Arc<dyn Environment> {
        Arc::new(BTreeMap::<String, String>::new())
    }

    #[test]
    fn test_notification_updates_source() {
        let store = InMemoryConfigStore::new();
        let consumer = Arc::new(CountingConsumer::default());
        let registrar = AutoRefreshRegistrar::new(
            Arc::new(store.clone()),
            Some(consumer.clone() as Arc<dyn LayeredConfigConsumer>),
        );
        let x = source("x", "X");

        let outcome = registrar.register(Arc::clone(&x), empty_env()).unwrap();
        assert_eq!(outcome, RegistrationOutcome::Subscribed);

        store.publish("x", "G", "KEY=222");
        assert_eq!(x.content(), "KEY=222");
        assert_eq!(x.snapshot().revision, 1);
        assert_eq!(consumer.changed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_registration_shares_subscription() {
        let store = InMemoryConfigStore::new();
        let registrar = AutoRefreshRegistrar::new(Arc::new(store.clone()), None);
        let first = source("y", "Y1");
        let second = source("y", "Y2");

        registrar.register(Arc::clone(&first), empty_env()).unwrap();
        let outcome = registrar.register(Arc::clone(&second), empty_env()).unwrap();
        assert_eq!(outcome, RegistrationOutcome::Attached);
        assert_eq!(
            registrar.register(Arc::clone(&second), empty_env()).unwrap(),
            RegistrationOutcome::AlreadyRegistered
        );

        assert_eq!(registrar.subscription_count(), 1);
        assert_eq!(registrar.target_count("y", "G"), 2);
        assert_eq!(store.subscriber_count("y", "G"), 1);

        store.publish("y", "G", "KEY=new");
        assert_eq!(first.content(), "KEY=new");
        assert_eq!(second.content(), "KEY=new");
    }

    #[test]
    fn test_namespaces_get_separate_subscriptions() {
        let store = InMemoryConfigStore::new();
        let registrar = AutoRefreshRegistrar::new(Arc::new(store.clone()), None);
        let in_namespace = |namespace: &str| {
            let mut properties = Properties::new();
            properties.insert(NAMESPACE_PROPERTY.into(), namespace.into());
            Arc::new(
                ConfigurationSource::new("b", "G", ConfigType::Properties, "owner=initial")
                    .with_name(format!("b@{namespace}"))
                    .with_properties(properties.clone(), properties),
            )
        };
        let a = in_namespace("tenant-a");
        let b = in_namespace("tenant-b");

        assert_eq!(
            registrar.register(Arc::clone(&a), empty_env()).unwrap(),
            RegistrationOutcome::Subscribed
        );
        assert_eq!(
            registrar.register(Arc::clone(&b), empty_env()).unwrap(),
            RegistrationOutcome::Subscribed
        );
        assert_eq!(registrar.subscription_count(), 2);
        assert_eq!(registrar.target_count_in("tenant-a", "b", "G"), 1);
        assert_eq!(registrar.target_count_in("tenant-b", "b", "G"), 1);
        assert_eq!(registrar.target_count("b", "G"), 0);

        store.publish_in("tenant-b", "b", "G", "owner=b2");
        assert_eq!(a.content(), "owner=initial");
        assert_eq!(b.content(), "owner=b2");
    }

    #[test]
    fn test_empty_and_duplicate_notifications_are_ignored() {
        let store = InMemoryConfigStore::new();
        let consumer = Arc::new(CountingConsumer::default());
        let registrar = AutoRefreshRegistrar::new(
            Arc::new(store.clone()),
            Some(consumer.clone() as Arc<dyn LayeredConfigConsumer>),
        );
        let x = source("x", "X");
        registrar.register(Arc::clone(&x), empty_env()).unwrap();

        store.publish("x", "G", "");
        store.publish("x", "G", "KEY=V");
        assert_eq!(x.content(), "KEY=V");
        assert_eq!(x.snapshot().revision, 0);
        assert_eq!(consumer.changed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_properties_re_resolved_against_current_environment() {
        let mut templates = Properties::new();
        templates.insert("namespace".into(), "${tenant:public}".into());
        let x = Arc::new(
            ConfigurationSource::new("x", "G", ConfigType::Properties, "KEY=V")
                .with_name("X")
                .with_properties(templates, Properties::new()),
        );
        let mut env = BTreeMap::new();
        env.insert("tenant".to_string(), "acme".to_string());
        let env: Arc<dyn Environment> = Arc::new(env);

        assert!(refresh_source(&x, env.as_ref(), "KEY=V", None));
        assert_eq!(x.snapshot().properties["namespace"], "acme");
        assert_eq!(x.content(), "KEY=V");
    }

    #[test]
    fn test_cancel_all_unsubscribes() {
        let store = InMemoryConfigStore::new();
        let registrar = AutoRefreshRegistrar::new(Arc::new(store.clone()), None);
        registrar.register(source("x", "X"), empty_env()).unwrap();
        assert_eq!(store.subscriber_count("x", "G"), 1);

        registrar.cancel_all();
        assert_eq!(registrar.subscription_count(), 0);
        assert_eq!(store.subscriber_count("x", "G"), 0);
    }
}
