// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the processing pipeline.

mod common;

use cfgweave::adapters::{InMemoryConfigStore, NAMESPACE_PROPERTY};
use cfgweave::domain::{ConfigError, ConfigKey, ConfigType, DeclarationSite, Descriptor, Origin};
use cfgweave::prelude::*;
use common::{FlakyStore, RecordingConsumer};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn names(sources: &[Arc<ConfigurationSource>]) -> Vec<String> {
    sources.iter().map(|s| s.data_id().to_string()).collect()
}

#[test]
fn test_identifier_list_builds_one_source_per_document() {
    common::init_tracing();
    let store = InMemoryConfigStore::new();
    store.publish("a.yml", "G", "a: 1");
    store.publish("b", "G", "KEY=V");
    store.publish("c.json", "G", r#"{"c": 1}"#);

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .build()
        .unwrap();

    let site = DeclarationSite::new("app::Boot")
        .declare(Descriptor::new(["a.yml", "b", "c.json"]).group("G"));
    let report = registry.process_all(&[site]);
    assert!(report.is_clean());
    assert_eq!(report.sources_built, 3);

    let ordered = registry.resolve().unwrap();
    assert_eq!(names(&ordered), ["a.yml", "b", "c.json"]);
    assert!(ordered.iter().all(|s| s.group() == "G"));
    assert_eq!(
        ordered.iter().map(|s| s.config_type()).collect::<Vec<_>>(),
        [ConfigType::Yaml, ConfigType::Properties, ConfigType::Json]
    );
}

#[test]
fn test_process_all_is_idempotent() {
    let store = InMemoryConfigStore::new();
    store.publish("a", "DEFAULT_GROUP", "x=1");
    store.publish("b", "DEFAULT_GROUP", "x=2");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store.clone())
        .build()
        .unwrap();

    let sites = vec![
        DeclarationSite::new("one").declare(Descriptor::new(["a"])),
        DeclarationSite::new("two").declare(Descriptor::new(["b"]).first()),
    ];

    let first = registry.process_all(&sites);
    let once = names(&registry.resolve().unwrap());
    let fetches = store.fetch_count();

    let second = registry.process_all(&sites);
    let twice = names(&registry.resolve().unwrap());

    assert_eq!(first.sites_processed, 2);
    assert_eq!(second.sites_processed, 0);
    assert_eq!(second.sites_skipped, 2);
    assert_eq!(once, twice);
    assert_eq!(once, ["b", "a"]);
    assert_eq!(store.fetch_count(), fetches);
}

#[test]
fn test_empty_document_is_skipped_and_site_marked_processed() {
    let store = InMemoryConfigStore::new();
    store.publish("present", "DEFAULT_GROUP", "k=v");
    store.publish("blank", "DEFAULT_GROUP", "   \n");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .build()
        .unwrap();

    let site = DeclarationSite::new("app")
        .declare(Descriptor::new(["missing.yml", "blank", "present"]));
    let report = registry.process_all(&[site]);

    assert!(report.is_clean());
    assert_eq!(report.empty_documents, 2);
    assert_eq!(report.sources_built, 1);
    assert!(registry.is_processed(&Origin::from("app")));
}

#[test]
fn test_site_without_sources_is_still_processed() {
    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(InMemoryConfigStore::new())
        .build()
        .unwrap();

    let report = registry.process_all(&[DeclarationSite::new("empty")]);
    assert_eq!(report.sites_processed, 1);
    assert!(registry.is_processed(&Origin::from("empty")));
    assert!(registry.resolve().unwrap().is_empty());
}

#[test]
fn test_placeholder_failure_is_confined_to_its_descriptor() {
    let store = InMemoryConfigStore::new();
    store.publish("good", "DEFAULT_GROUP", "k=v");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .build()
        .unwrap();

    let site = DeclarationSite::new("app")
        .declare(Descriptor::new(["${missing.key}"]))
        .declare(Descriptor::new(["good"]));
    let report = registry.process_all(&[site]);

    assert_eq!(report.sources_built, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0].1,
        ConfigError::UnresolvedPlaceholder { key, .. } if key == "missing.key"
    ));
    // Not retryable, so the site is done.
    assert!(registry.is_processed(&Origin::from("app")));
}

#[test]
fn test_invalid_descriptor_reported() {
    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(InMemoryConfigStore::new())
        .build()
        .unwrap();

    let site = DeclarationSite::new("app").declare(Descriptor::new(Vec::<String>::new()));
    let report = registry.process_all(&[site]);
    assert!(matches!(
        report.failures[0].1,
        ConfigError::InvalidDescriptor { .. }
    ));
}

#[test]
fn test_placeholders_in_identifier_group_and_properties() {
    let store = InMemoryConfigStore::new();
    store.publish_in("tenant-7", "prod.properties", "BILLING", "stage=prod");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[("stage", "prod"), ("tenant", "tenant-7")]))
        .with_store(store)
        .build()
        .unwrap();

    let site = DeclarationSite::new("app").declare(
        Descriptor::new(["${stage:dev}.properties"])
            .group("${app.group:BILLING}")
            .property(NAMESPACE_PROPERTY, "${tenant}"),
    );
    let report = registry.process_all(&[site]);
    assert!(report.is_clean(), "{:?}", report.failures);

    let ordered = registry.resolve().unwrap();
    assert_eq!(ordered[0].data_id(), "prod.properties");
    assert_eq!(ordered[0].group(), "BILLING");
    assert_eq!(ordered[0].content(), "stage=prod");
    assert_eq!(
        ordered[0].snapshot().properties.get(NAMESPACE_PROPERTY).map(String::as_str),
        Some("tenant-7")
    );
}

#[test]
fn test_descriptor_properties_override_globals() {
    let store = InMemoryConfigStore::new();
    store.publish_in("global", "a", "DEFAULT_GROUP", "from=global");
    store.publish_in("local", "b", "DEFAULT_GROUP", "from=local");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .with_global_property(NAMESPACE_PROPERTY, "global")
        .build()
        .unwrap();

    let site = DeclarationSite::new("app")
        .declare(Descriptor::new(["a"]))
        .declare(Descriptor::new(["b"]).property(NAMESPACE_PROPERTY, "local"));
    registry.process_all(&[site]);

    let ordered = registry.resolve().unwrap();
    assert_eq!(ordered[0].content(), "from=global");
    assert_eq!(ordered[1].content(), "from=local");
}

#[test]
fn test_retryable_failure_leaves_site_for_next_pass() {
    let inner = InMemoryConfigStore::new();
    inner.publish("a", "DEFAULT_GROUP", "x=1");
    inner.publish("b", "DEFAULT_GROUP", "x=2");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(FlakyStore::new(inner, "b", 1))
        .build()
        .unwrap();

    let sites = vec![DeclarationSite::new("app").declare(Descriptor::new(["a", "b"]))];

    let report = registry.process_all(&sites);
    assert_eq!(report.sources_built, 1);
    assert!(report.failures[0].1.is_retryable());
    assert!(!registry.is_processed(&Origin::from("app")));

    let report = registry.process_all(&sites);
    assert!(report.is_clean());
    assert!(registry.is_processed(&Origin::from("app")));
    assert_eq!(names(&registry.resolve().unwrap()), ["a", "b"]);
}

#[test]
fn test_fetch_timeout_is_retryable() {
    let store = InMemoryConfigStore::new();
    store.publish("slow", "DEFAULT_GROUP", "x=1");
    store.set_latency(Duration::from_millis(500));

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .with_fetch_timeout(Duration::from_millis(20))
        .build()
        .unwrap();

    let report = registry.process_all(&[DeclarationSite::new("app").declare(Descriptor::new(["slow"]))]);
    assert!(matches!(
        &report.failures[0].1,
        ConfigError::RemoteFetchFailure { message, .. } if message.contains("timed out")
    ));
    assert!(!registry.is_processed(&Origin::from("app")));
}

#[test]
fn test_explicit_names_are_unique_per_identifier() {
    let store = InMemoryConfigStore::new();
    store.publish("a", "DEFAULT_GROUP", "x=1");
    store.publish("b", "DEFAULT_GROUP", "x=2");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .build()
        .unwrap();

    registry.process_all(&[DeclarationSite::new("app").declare(Descriptor::new(["a", "b"]).name("core"))]);
    let ordered = registry.resolve().unwrap();
    assert_eq!(ordered[0].name(), "core");
    assert_eq!(ordered[1].name(), "core#1");
}

#[test]
fn test_publish_installs_into_consumer() {
    let store = InMemoryConfigStore::new();
    store.publish("a", "DEFAULT_GROUP", "x=1");
    store.publish("b", "DEFAULT_GROUP", "x=2");
    let consumer = RecordingConsumer::new();

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .with_consumer(consumer.clone())
        .build()
        .unwrap();

    registry.process_all(&[DeclarationSite::new("app")
        .declare(Descriptor::new(["a"]).name("low"))
        .declare(Descriptor::new(["b"]).name("high").first())]);
    registry.publish().unwrap();

    assert_eq!(consumer.installs(), vec![vec!["high".to_string(), "low".to_string()]]);
}

#[test]
#[cfg(feature = "yaml")]
fn test_layered_lookup_across_formats() {
    let store = InMemoryConfigStore::new();
    store.publish("app.yml", "DEFAULT_GROUP", "server:\n  port: 8080\n  host: example.org\n");
    store.publish("overrides.properties", "DEFAULT_GROUP", "server.port=9090");
    let layered = Arc::new(LayeredConfig::new());

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .with_consumer(layered.clone())
        .build()
        .unwrap();

    registry.process_all(&[DeclarationSite::new("app")
        .declare(Descriptor::new(["app.yml"]))
        .declare(Descriptor::new(["overrides.properties"]).first())]);
    registry.publish().unwrap();

    assert_eq!(layered.get(&ConfigKey::from("server.port")).unwrap().as_str(), "9090");
    assert_eq!(layered.get(&ConfigKey::from("server.host")).unwrap().as_str(), "example.org");
}

#[test]
#[cfg(feature = "yaml")]
fn test_sites_from_yaml_provider() {
    use cfgweave::adapters::YamlDescriptorProvider;

    let store = InMemoryConfigStore::new();
    store.publish("app.yml", "BILLING", "a: 1");
    store.publish("overrides.json", "DEFAULT_GROUP", r#"{"a": 2}"#);

    let provider = YamlDescriptorProvider::from_str(
        r#"
sites:
  - origin: billing::Boot
    declarations:
      - data_id: app.yml
        group: BILLING
      - sources:
          - data_id: overrides.json
            first: true
"#,
    )
    .unwrap();

    let mut registry = ProcessingRegistry::builder()
        .with_environment(env(&[]))
        .with_store(store)
        .build()
        .unwrap();

    let report = registry.process_provider(&provider).unwrap();
    assert!(report.is_clean());
    assert_eq!(names(&registry.resolve().unwrap()), ["overrides.json", "app.yml"]);
}

#[test]
#[cfg(feature = "cli")]
fn test_command_line_definitions_win_over_defaults() {
    use cfgweave::adapters::{ChainedEnvironment, CommandLineAdapter};

    let store = InMemoryConfigStore::new();
    store.publish("prod.properties", "DEFAULT_GROUP", "stage=prod");

    let environment = ChainedEnvironment::new()
        .with(CommandLineAdapter::from_args(["-D", "stage=prod"]).unwrap())
        .with(env(&[("stage", "dev")]));

    let mut registry = ProcessingRegistry::builder()
        .with_environment(environment)
        .with_store(store)
        .build()
        .unwrap();

    registry.process_all(&[DeclarationSite::new("app").declare(Descriptor::new(["${stage}.properties"]))]);
    assert_eq!(names(&registry.resolve().unwrap()), ["prod.properties"]);
}
