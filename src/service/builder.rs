// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds loaded configuration sources from descriptors.

use crate::domain::placeholder;
use crate::domain::{
    derive_name, ConfigError, ConfigType, ConfigurationSource, Descriptor, Origin, Properties,
    Result,
};
use crate::ports::{Environment, RemoteConfigStore};
use std::time::Duration;
use tracing::{debug, warn};

/// Turns one document identifier of a descriptor into a [`ConfigurationSource`].
///
/// The builder borrows its collaborators for the duration of a processing pass.
///
/// # Examples
///
/// ```
/// use cfgweave::adapters::InMemoryConfigStore;
/// use cfgweave::domain::{ConfigType, Descriptor, Origin, Properties};
/// use cfgweave::service::SourceBuilder;
/// use std::collections::HashMap;
/// use std::time::Duration;
///
/// let store = InMemoryConfigStore::new();
/// store.publish("b", "G", "KEY=V");
/// let env: HashMap<String, String> = HashMap::new();
/// let globals = Properties::new();
///
/// let builder = SourceBuilder::new(&env, &store, &globals, "DEFAULT_GROUP", Duration::from_secs(1));
/// let descriptor = Descriptor::new(["b"]).group("G");
/// let source = builder.build(&descriptor, 0, &Origin::new("app")).unwrap().unwrap();
///
/// assert_eq!(source.content(), "KEY=V");
/// assert_eq!(source.config_type(), ConfigType::Properties);
/// ```
pub struct SourceBuilder<'a> {
    environment: &'a dyn Environment,
    store: &'a dyn RemoteConfigStore,
    global_properties: &'a Properties,
    default_group: &'a str,
    timeout: Duration,
}

impl<'a> SourceBuilder<'a> {
    /// Creates a builder over the given collaborators.
    pub fn new(
        environment: &'a dyn Environment,
        store: &'a dyn RemoteConfigStore,
        global_properties: &'a Properties,
        default_group: &'a str,
        timeout: Duration,
    ) -> Self {
        Self {
            environment,
            store,
            global_properties,
            default_group,
            timeout,
        }
    }

    /// Checks that a descriptor is structurally usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDescriptor`] when the identifier list is empty.
    pub fn validate(descriptor: &Descriptor, origin: &Origin) -> Result<()> {
        if descriptor.data_ids.is_empty() {
            return Err(ConfigError::InvalidDescriptor {
                origin: origin.to_string(),
                message: "descriptor names no document identifiers".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the source for `descriptor.data_ids[index]`.
    ///
    /// Returns `Ok(None)` when the remote document is missing or blank.
    ///
    /// # Errors
    ///
    /// Placeholder failures surface as [`ConfigError::UnresolvedPlaceholder`]; store
    /// failures are passed through and are retryable.
    pub fn build(
        &self,
        descriptor: &Descriptor,
        index: usize,
        origin: &Origin,
    ) -> Result<Option<ConfigurationSource>> {
        let raw_id = descriptor.data_ids.get(index).ok_or_else(|| {
            ConfigError::InvalidDescriptor {
                origin: origin.to_string(),
                message: format!(
                    "identifier index {index} out of range ({} declared)",
                    descriptor.data_ids.len()
                ),
            }
        })?;

        let data_id = placeholder::resolve(raw_id, self.environment)?;
        let group = match descriptor.group.as_deref() {
            Some(group) => placeholder::resolve(group, self.environment)?,
            None => String::new(),
        };
        let group = if group.is_empty() {
            self.default_group.to_string()
        } else {
            group
        };
        let config_type = ConfigType::resolve(descriptor.config_type, &data_id);

        let mut templates = self.global_properties.clone();
        templates.extend(
            descriptor
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let properties = placeholder::resolve_properties(&templates, self.environment)?;

        let content = self
            .store
            .fetch(&data_id, &group, &properties, self.timeout)?;
        let content = match content {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                warn!(
                    data_id = %data_id,
                    group = %group,
                    origin = %origin,
                    "remote document is empty, skipping"
                );
                return Ok(None);
            }
        };

        let name = match descriptor.name.as_deref() {
            Some(name) => {
                let name = placeholder::resolve(name, self.environment)?;
                if index == 0 {
                    name
                } else {
                    format!("{name}#{index}")
                }
            }
            None => {
                let overrides: Properties = properties
                    .iter()
                    .filter(|(k, _)| descriptor.properties.contains_key(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                derive_name(&data_id, &group, &overrides)
            }
        };

        debug!(
            name = %name,
            data_id = %data_id,
            group = %group,
            config_type = %config_type,
            "built configuration source"
        );

        Ok(Some(
            ConfigurationSource::new(data_id, group, config_type, content)
                .with_name(name)
                .with_auto_refresh(descriptor.auto_refresh)
                .with_hints(descriptor.hints.clone())
                .with_origin(origin.clone())
                .with_properties(templates, properties),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryConfigStore;
    use crate::domain::DEFAULT_GROUP;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn build(
        env: &HashMap<String, String>,
        store: &InMemoryConfigStore,
        globals: &Properties,
        descriptor: &Descriptor,
        index: usize,
    ) -> Result<Option<ConfigurationSource>> {
        SourceBuilder::new(env, store, globals, "DEFAULT_GROUP", Duration::from_secs(1)).build(
            descriptor,
            index,
            &Origin::new("test"),
        )
    }

    #[test]
    fn test_types_follow_extensions() {
        let store = InMemoryConfigStore::new();
        store.publish("a.yml", "G", "a: 1");
        store.publish("b", "G", "KEY=V");
        store.publish("c.json", "G", "{}");
        let descriptor = Descriptor::new(["a.yml", "b", "c.json"]).group("G");
        let e = env(&[]);
        let globals = Properties::new();

        let types: Vec<ConfigType> = (0..3)
            .map(|i| {
                build(&e, &store, &globals, &descriptor, i)
                    .unwrap()
                    .unwrap()
                    .config_type()
            })
            .collect();
        assert_eq!(
            types,
            [ConfigType::Yaml, ConfigType::Properties, ConfigType::Json]
        );
    }

    #[test]
    fn test_explicit_type_wins() {
        let store = InMemoryConfigStore::new();
        store.publish("a.yml", DEFAULT_GROUP, "x");
        let descriptor = Descriptor::new(["a.yml"]).config_type(ConfigType::Text);
        let source = build(&env(&[]), &store, &Properties::new(), &descriptor, 0)
            .unwrap()
            .unwrap();
        assert_eq!(source.config_type(), ConfigType::Text);
        assert_eq!(source.group(), DEFAULT_GROUP);
    }

    #[test]
    fn test_placeholders_in_id_and_group() {
        let store = InMemoryConfigStore::new();
        store.publish("billing.yml", "prod", "a: 1");
        let e = env(&[("app", "billing"), ("stage", "prod")]);
        let descriptor = Descriptor::new(["${app}.yml"]).group("${stage:dev}");

        let source = build(&e, &store, &Properties::new(), &descriptor, 0)
            .unwrap()
            .unwrap();
        assert_eq!(source.data_id(), "billing.yml");
        assert_eq!(source.group(), "prod");
    }

    #[test]
    fn test_unresolved_placeholder_is_error() {
        let store = InMemoryConfigStore::new();
        let descriptor = Descriptor::new(["${missing}"]);
        let err = build(&env(&[]), &store, &Properties::new(), &descriptor, 0).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedPlaceholder { ref key, .. } if key == "missing"));
        assert_eq!(store.fetch_count(), 0);
    }

    #[test]
    fn test_empty_and_missing_documents_are_absent() {
        let store = InMemoryConfigStore::new();
        store.publish("blank", "DEFAULT_GROUP", "  \n");
        let e = env(&[]);
        let globals = Properties::new();
        assert!(build(&e, &store, &globals, &Descriptor::new(["blank"]), 0)
            .unwrap()
            .is_none());
        assert!(build(&e, &store, &globals, &Descriptor::new(["nope"]), 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_overrides_beat_globals_and_are_resolved() {
        let store = InMemoryConfigStore::new();
        store.publish_in("tenant-a", "b", "DEFAULT_GROUP", "KEY=V");
        let e = env(&[("tenant", "tenant-a")]);
        let mut globals = Properties::new();
        globals.insert("namespace".into(), "public".into());
        globals.insert("timeout".into(), "3000".into());
        let descriptor = Descriptor::new(["b"]).property("namespace", "${tenant}");

        let source = build(&e, &store, &globals, &descriptor, 0)
            .unwrap()
            .unwrap();
        let snapshot = source.snapshot();
        assert_eq!(snapshot.properties["namespace"], "tenant-a");
        assert_eq!(snapshot.properties["timeout"], "3000");
        assert_eq!(source.property_templates()["namespace"], "${tenant}");
    }

    #[test]
    fn test_rebuild_is_identical() {
        let store = InMemoryConfigStore::new();
        store.publish("b", "DEFAULT_GROUP", "KEY=V");
        let e = env(&[]);
        let globals = Properties::new();
        let descriptor = Descriptor::new(["b"]);

        let first = build(&e, &store, &globals, &descriptor, 0).unwrap().unwrap();
        let second = build(&e, &store, &globals, &descriptor, 0).unwrap().unwrap();
        assert_eq!(first.name(), second.name());
        assert_eq!(first.content().as_bytes(), second.content().as_bytes());
    }

    #[test]
    fn test_explicit_name_is_suffixed_after_first() {
        let store = InMemoryConfigStore::new();
        store.publish("a", "DEFAULT_GROUP", "x=1");
        store.publish("b", "DEFAULT_GROUP", "x=2");
        let descriptor = Descriptor::new(["a", "b"]).name("shared");
        let e = env(&[]);
        let globals = Properties::new();

        let a = build(&e, &store, &globals, &descriptor, 0).unwrap().unwrap();
        let b = build(&e, &store, &globals, &descriptor, 1).unwrap().unwrap();
        assert_eq!(a.name(), "shared");
        assert_eq!(b.name(), "shared#1");
    }

    #[test]
    fn test_validate_rejects_empty_identifiers() {
        let err = SourceBuilder::validate(&Descriptor::default(), &Origin::new("o")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_store_failure_is_retryable() {
        let store = InMemoryConfigStore::new();
        store.set_offline(true);
        let err = build(&env(&[]), &store, &Properties::new(), &Descriptor::new(["b"]), 0)
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
