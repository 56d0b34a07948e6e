// SPDX-License-Identifier: MIT OR Apache-2.0

//! The processing registry drives the pipeline from declaration sites to an ordered,
//! refreshing source list.
//!
//! A registry is created once per application context. It remembers which origins it
//! has already processed, so re-running discovery over the same sites is a no-op.

use crate::domain::{
    ConfigError, ConfigurationSource, DeclarationSite, OrderingResolver, Origin, Properties,
    Result, DEFAULT_GROUP,
};
use crate::ports::{DescriptorProvider, Environment, LayeredConfigConsumer, RemoteConfigStore};
use crate::service::builder::SourceBuilder;
use crate::service::extractor::extract;
use crate::service::refresh::AutoRefreshRegistrar;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables shared by every descriptor a registry processes.
///
/// # Examples
///
/// ```
/// use cfgweave::service::RegistryOptions;
/// use std::time::Duration;
///
/// let options = RegistryOptions::default();
/// assert_eq!(options.fetch_timeout, Duration::from_millis(3000));
/// assert_eq!(options.default_group, "DEFAULT_GROUP");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    /// Store properties applied to every descriptor before its own overrides.
    pub global_properties: Properties,
    /// Upper bound for a single remote fetch.
    #[serde(rename = "fetch_timeout_ms", with = "millis")]
    pub fetch_timeout: Duration,
    /// Group used when a descriptor names none.
    pub default_group: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            global_properties: Properties::new(),
            fetch_timeout: Duration::from_millis(3000),
            default_group: DEFAULT_GROUP.to_string(),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Outcome of one [`ProcessingRegistry::process_all`] pass.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Sites processed during this pass.
    pub sites_processed: usize,
    /// Sites skipped because their origin was already processed.
    pub sites_skipped: usize,
    /// Sources built and handed to the ordering resolver.
    pub sources_built: usize,
    /// Documents that were missing or blank in the store.
    pub empty_documents: usize,
    /// Per-descriptor failures, tagged with the declaring origin.
    pub failures: Vec<(Origin, ConfigError)>,
}

impl ProcessReport {
    /// Returns `true` when no descriptor failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turns declaration sites into ordered configuration sources.
///
/// # Examples
///
/// ```
/// use cfgweave::adapters::InMemoryConfigStore;
/// use cfgweave::domain::{DeclarationSite, Descriptor};
/// use cfgweave::service::ProcessingRegistry;
/// use std::collections::HashMap;
///
/// # fn main() -> cfgweave::domain::Result<()> {
/// let store = InMemoryConfigStore::new();
/// store.publish("a.yml", "G", "a: 1");
/// store.publish("b", "G", "KEY=V");
///
/// let mut registry = ProcessingRegistry::builder()
///     .with_environment(HashMap::<String, String>::new())
///     .with_store(store)
///     .build()?;
///
/// let sites = vec![DeclarationSite::new("app::Boot")
///     .declare(Descriptor::new(["a.yml", "b"]).group("G"))];
/// let report = registry.process_all(&sites);
/// assert_eq!(report.sources_built, 2);
///
/// let ordered = registry.resolve()?;
/// assert_eq!(ordered[0].data_id(), "a.yml");
/// # Ok(())
/// # }
/// ```
pub struct ProcessingRegistry {
    environment: Arc<dyn Environment>,
    store: Arc<dyn RemoteConfigStore>,
    consumer: Option<Arc<dyn LayeredConfigConsumer>>,
    options: RegistryOptions,
    processed: HashSet<Origin>,
    resolver: OrderingResolver,
    refresh: AutoRefreshRegistrar,
}

impl ProcessingRegistry {
    /// Creates a new registry builder.
    pub fn builder() -> ProcessingRegistryBuilder {
        ProcessingRegistryBuilder::new()
    }

    /// Processes every site whose origin has not been processed yet.
    ///
    /// Failures are confined to the descriptor that raised them and collected in the
    /// report. A site that hit a retryable failure stays unprocessed so a later call
    /// tries it again; every other site is marked processed, even if it produced no
    /// sources.
    pub fn process_all(&mut self, sites: &[DeclarationSite]) -> ProcessReport {
        let mut report = ProcessReport::default();

        for site in sites {
            if self.processed.contains(&site.origin) {
                debug!(origin = %site.origin, "origin already processed, skipping");
                report.sites_skipped += 1;
                continue;
            }

            let retry = self.process_site(site, &mut report);
            report.sites_processed += 1;
            if retry {
                warn!(origin = %site.origin, "retryable failure, origin left unprocessed");
            } else {
                self.processed.insert(site.origin.clone());
            }
        }

        info!(
            processed = report.sites_processed,
            skipped = report.sites_skipped,
            built = report.sources_built,
            empty = report.empty_documents,
            failed = report.failures.len(),
            "processed declaration sites"
        );
        report
    }

    /// Reads all sites from `provider` and processes them.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the sites cannot be enumerated.
    pub fn process_provider(&mut self, provider: &dyn DescriptorProvider) -> Result<ProcessReport> {
        let sites = provider.sites()?;
        Ok(self.process_all(&sites))
    }

    /// Resolves the accumulated sources into their final order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OrderingConflict`] if the ordering hints conflict.
    pub fn resolve(&self) -> Result<Vec<Arc<ConfigurationSource>>> {
        self.resolver.resolve()
    }

    /// Resolves the order and installs it into the consumer, if one is configured.
    pub fn publish(&self) -> Result<Vec<Arc<ConfigurationSource>>> {
        let ordered = self.resolve()?;
        if let Some(consumer) = &self.consumer {
            consumer.install(&ordered);
            info!(sources = ordered.len(), "installed ordered sources");
        }
        Ok(ordered)
    }

    /// Returns `true` if `origin` has been processed.
    pub fn is_processed(&self, origin: &Origin) -> bool {
        self.processed.contains(origin)
    }

    /// Origins processed so far, in no particular order.
    pub fn processed_origins(&self) -> impl Iterator<Item = &Origin> {
        self.processed.iter()
    }

    /// Accumulated sources in insertion order.
    pub fn sources(&self) -> impl Iterator<Item = &Arc<ConfigurationSource>> {
        self.resolver.iter()
    }

    /// The auto-refresh registrar owned by this registry.
    pub fn refresh_registrar(&self) -> &AutoRefreshRegistrar {
        &self.refresh
    }

    /// The options this registry was built with.
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Builds and registers the sources of one site. Returns `true` when the site
    /// must be retried.
    fn process_site(&mut self, site: &DeclarationSite, report: &mut ProcessReport) -> bool {
        let mut retry = false;
        let mut built = Vec::new();

        {
            let builder = SourceBuilder::new(
                self.environment.as_ref(),
                self.store.as_ref(),
                &self.options.global_properties,
                &self.options.default_group,
                self.options.fetch_timeout,
            );

            for descriptor in extract(site) {
                if let Err(e) = SourceBuilder::validate(descriptor, &site.origin) {
                    warn!(origin = %site.origin, error = %e, "skipping invalid descriptor");
                    report.failures.push((site.origin.clone(), e));
                    continue;
                }
                for index in 0..descriptor.data_ids.len() {
                    match builder.build(descriptor, index, &site.origin) {
                        Ok(Some(source)) => built.push(Arc::new(source)),
                        Ok(None) => report.empty_documents += 1,
                        Err(e) => {
                            warn!(
                                origin = %site.origin,
                                data_id = %descriptor.data_ids[index],
                                error = %e,
                                "failed to build configuration source"
                            );
                            retry |= e.is_retryable();
                            report.failures.push((site.origin.clone(), e));
                        }
                    }
                }
            }
        }

        for source in built {
            report.sources_built += 1;
            self.resolver.add(Arc::clone(&source));
            if source.is_auto_refresh() {
                if let Err(e) = self
                    .refresh
                    .register(Arc::clone(&source), Arc::clone(&self.environment))
                {
                    warn!(name = source.name(), error = %e, "failed to subscribe for refresh");
                    retry |= e.is_retryable();
                    report.failures.push((site.origin.clone(), e));
                }
            }
        }

        retry
    }
}

impl std::fmt::Debug for ProcessingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingRegistry")
            .field("options", &self.options)
            .field("processed", &self.processed.len())
            .field("sources", &self.resolver.len())
            .field("refresh", &self.refresh)
            .finish()
    }
}

/// Builder for constructing a [`ProcessingRegistry`].
pub struct ProcessingRegistryBuilder {
    environment: Option<Arc<dyn Environment>>,
    store: Option<Arc<dyn RemoteConfigStore>>,
    consumer: Option<Arc<dyn LayeredConfigConsumer>>,
    options: RegistryOptions,
}

impl ProcessingRegistryBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            environment: None,
            store: None,
            consumer: None,
            options: RegistryOptions::default(),
        }
    }

    /// Sets the placeholder environment.
    pub fn with_environment(self, environment: impl Environment + 'static) -> Self {
        self.with_shared_environment(Arc::new(environment))
    }

    /// Sets an already shared placeholder environment.
    pub fn with_shared_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the remote configuration store.
    pub fn with_store(self, store: impl RemoteConfigStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    /// Sets an already shared remote configuration store.
    pub fn with_shared_store(mut self, store: Arc<dyn RemoteConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the consumer that receives the ordered sources and change notifications.
    pub fn with_consumer(mut self, consumer: Arc<dyn LayeredConfigConsumer>) -> Self {
        self.consumer = Some(consumer);
        self
    }

    /// Replaces all options.
    pub fn with_options(mut self, options: RegistryOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds a global store property.
    pub fn with_global_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options
            .global_properties
            .insert(key.into(), value.into());
        self
    }

    /// Sets the remote fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.options.fetch_timeout = timeout;
        self
    }

    /// Sets the fallback group.
    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.options.default_group = group.into();
        self
    }

    /// Builds the registry.
    ///
    /// Without an explicit environment the process environment is used (`env` feature),
    /// or an empty one otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StoreError`] when no remote store was supplied.
    pub fn build(self) -> Result<ProcessingRegistry> {
        let store = self.store.ok_or_else(|| ConfigError::StoreError {
            store: "<none>".to_string(),
            message: "no remote configuration store configured".to_string(),
            source: None,
        })?;
        let environment = self.environment.unwrap_or_else(default_environment);
        let refresh = AutoRefreshRegistrar::new(Arc::clone(&store), self.consumer.clone());

        Ok(ProcessingRegistry {
            environment,
            store,
            consumer: self.consumer,
            options: self.options,
            processed: HashSet::new(),
            resolver: OrderingResolver::new(),
            refresh,
        })
    }
}

impl Default for ProcessingRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "env")]
fn default_environment() -> Arc<dyn Environment> {
    Arc::new(crate::adapters::EnvVarAdapter::new())
}

#[cfg(not(feature = "env"))]
fn default_environment() -> Arc<dyn Environment> {
    Arc::new(std::collections::BTreeMap::<String, String>::new())
}
