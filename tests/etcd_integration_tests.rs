// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the etcd store using Docker containers.

mod common;

#[cfg(feature = "etcd")]
mod etcd_tests {
    use cfgweave::adapters::{EtcdConfigStore, NAMESPACE_PROPERTY};
    use cfgweave::domain::{ConfigKey, DeclarationSite, Descriptor, Properties};
    use cfgweave::ports::{ContentListener, RemoteConfigStore};
    use cfgweave::prelude::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use testcontainers::{core::WaitFor, runners::AsyncRunner, GenericImage, ImageExt};

    use crate::common as docker_helpers;

    const TIMEOUT: Duration = Duration::from_secs(3);

    /// Helper to set up an etcd container and store for testing.
    async fn setup_etcd_test(
    ) -> Option<(testcontainers::ContainerAsync<GenericImage>, String, EtcdConfigStore)> {
        if !docker_helpers::is_docker_available() {
            docker_helpers::print_docker_unavailable_warning("etcd integration test");
            return None;
        }

        // Use etcd v3.5.0 image
        let etcd_image = GenericImage::new("quay.io/coreos/etcd", "v3.5.0")
            .with_exposed_port(2379.into())
            .with_wait_for(WaitFor::message_on_stderr("ready to serve client requests"))
            .with_env_var("ETCD_ADVERTISE_CLIENT_URLS", "http://0.0.0.0:2379")
            .with_env_var("ETCD_LISTEN_CLIENT_URLS", "http://0.0.0.0:2379");

        let container = etcd_image.start().await.ok()?;
        let port = container.get_host_port_ipv4(2379).await.ok()?;
        let endpoint = format!("127.0.0.1:{}", port);

        // Give etcd a moment to fully start
        tokio::time::sleep(Duration::from_secs(2)).await;

        let store = EtcdConfigStore::connect([endpoint.as_str()], "test/").ok()?;
        Some((container, endpoint, store))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_etcd_publish_and_fetch() {
        let Some((_container, _endpoint, store)) = setup_etcd_test().await else {
            return;
        };

        assert_eq!(store.fetch("app.yml", "G", &Properties::new(), TIMEOUT).unwrap(), None);

        store.publish("app.yml", "G", "server:\n  port: 8080").unwrap();
        assert_eq!(
            store
                .fetch("app.yml", "G", &Properties::new(), TIMEOUT)
                .unwrap()
                .as_deref(),
            Some("server:\n  port: 8080")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_etcd_namespace_key() {
        let Some((_container, endpoint, store)) = setup_etcd_test().await else {
            return;
        };

        let mut client = etcd_client::Client::connect([&endpoint], None).await.unwrap();
        client.put("test/dev/G/b", "env=dev", None).await.unwrap();

        let mut props = Properties::new();
        props.insert(NAMESPACE_PROPERTY.to_string(), "dev".to_string());
        assert_eq!(
            store.fetch("b", "G", &props, TIMEOUT).unwrap().as_deref(),
            Some("env=dev")
        );
        assert_eq!(store.fetch("b", "G", &Properties::new(), TIMEOUT).unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_etcd_subscription_delivers_put_and_delete() {
        let Some((_container, endpoint, store)) = setup_etcd_test().await else {
            return;
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: ContentListener = Arc::new(move |content| {
            sink.lock().unwrap().push(content);
        });

        let handle = store
            .subscribe("live", "G", &Properties::new(), listener)
            .unwrap();

        // Give the watch a moment to register
        tokio::time::sleep(Duration::from_millis(500)).await;
        store.publish("live", "G", "k=2").unwrap();
        let mut client = etcd_client::Client::connect([&endpoint], None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        client.delete("test/G/live", None).await.unwrap();

        let mut events = Vec::new();
        for _ in 0..60 {
            events = seen.lock().unwrap().clone();
            if events.len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(events, [Some("k=2".to_string()), None]);
        handle.cancel();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_etcd_pipeline_with_refresh() {
        let Some((_container, _endpoint, store)) = setup_etcd_test().await else {
            return;
        };
        store.publish("base.properties", "DEFAULT_GROUP", "mode=base\nname=svc").unwrap();
        store.publish("over.properties", "DEFAULT_GROUP", "mode=override").unwrap();

        let layered = Arc::new(LayeredConfig::new());
        let mut registry = ProcessingRegistry::builder()
            .with_environment(HashMap::<String, String>::new())
            .with_store(store.clone())
            .with_consumer(layered.clone())
            .build()
            .unwrap();

        let report = registry.process_all(&[DeclarationSite::new("app")
            .declare(Descriptor::new(["base.properties"]).auto_refresh(true))
            .declare(Descriptor::new(["over.properties"]).before("base.properties"))]);
        assert!(report.is_clean());
        registry.publish().unwrap();

        assert_eq!(layered.get(&ConfigKey::from("mode")).unwrap().as_str(), "override");
        assert_eq!(layered.get(&ConfigKey::from("name")).unwrap().as_str(), "svc");

        tokio::time::sleep(Duration::from_millis(500)).await;
        store.publish("base.properties", "DEFAULT_GROUP", "mode=base\nname=renamed").unwrap();

        let key = ConfigKey::from("name");
        let mut updated = false;
        for _ in 0..60 {
            if layered.get(&key).unwrap().as_str() == "renamed" {
                updated = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(updated);
        registry.refresh_registrar().cancel_all();
    }
}
