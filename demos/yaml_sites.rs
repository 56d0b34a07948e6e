// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declaration sites loaded from a YAML file.
//!
//! This example demonstrates:
//! - Declaring sources in a `sources.yaml` file instead of code
//! - Resolving placeholders from `-D key=value` arguments and defaults
//! - Mixing YAML and properties documents in one layered view
//!
//! To run this example:
//! ```bash
//! cargo run --example yaml_sites
//! cargo run --example yaml_sites --features cli -- -D stage=prod
//! ```

use cfgweave::adapters::YamlDescriptorProvider;
use cfgweave::domain::DEFAULT_GROUP;
use cfgweave::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const SITES: &str = r#"
sites:
  - origin: shop::Boot
    declarations:
      - data_ids: [shop.yaml]
      - data_id: "${stage}.properties"
        before: shop.yaml
  - origin: shop::Ops
    declarations:
      - sources:
          - data_id: ops.json
            group: OPS
            first: true
"#;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== cfgweave: YAML Declaration Sites ===\n");

    let dir = std::env::temp_dir().join(format!("cfgweave-yaml-sites-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let sites_path = dir.join("sources.yaml");
    std::fs::write(&sites_path, SITES)?;

    let provider = YamlDescriptorProvider::from_file(&sites_path)?;
    println!("Loaded declaration sites from {}\n", sites_path.display());

    let store = InMemoryConfigStore::new();
    store.publish(
        "shop.yaml",
        DEFAULT_GROUP,
        "shop:\n  name: Corner Store\n  currency: EUR\n  checkout:\n    enabled: false\n",
    );
    store.publish("dev.properties", DEFAULT_GROUP, "shop.checkout.enabled=true");
    store.publish("prod.properties", DEFAULT_GROUP, "shop.currency=USD");
    store.publish("ops.json", "OPS", r#"{"shop": {"maintenance": false}}"#);

    let defaults = HashMap::from([("stage".to_string(), "dev".to_string())]);
    let environment = launch_environment().with(defaults);

    let layered = Arc::new(LayeredConfig::new());
    let mut registry = ProcessingRegistry::builder()
        .with_environment(environment)
        .with_store(store)
        .with_consumer(layered.clone())
        .build()?;

    let report = registry.process_provider(&provider)?;
    for (origin, error) in &report.failures {
        println!("  ! {}: {}", origin.as_str(), error);
    }
    registry.publish()?;

    println!("--- Sources ---");
    for name in layered.source_names() {
        println!("  {}", name);
    }

    println!("\n--- Values ---");
    for key in [
        "shop.name",
        "shop.currency",
        "shop.checkout.enabled",
        "shop.maintenance",
    ] {
        match layered.get(&ConfigKey::from(key)) {
            Ok(value) => println!("  {} = {} (from {})", key, value.as_str(), value.source_name()),
            Err(e) => println!("  {} missing: {}", key, e),
        }
    }

    std::fs::remove_dir_all(&dir)?;
    println!("\n=== Example Complete ===");
    Ok(())
}

#[cfg(feature = "cli")]
fn launch_environment() -> ChainedEnvironment {
    use cfgweave::adapters::CommandLineAdapter;

    ChainedEnvironment::new().with(CommandLineAdapter::from_env_args())
}

#[cfg(not(feature = "cli"))]
fn launch_environment() -> ChainedEnvironment {
    ChainedEnvironment::new()
}
