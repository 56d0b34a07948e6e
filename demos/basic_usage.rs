// SPDX-License-Identifier: MIT OR Apache-2.0

//! Basic usage example for the cfgweave crate.
//!
//! This example demonstrates:
//! - Declaring sources on declaration sites
//! - Resolving placeholders in data ids and groups
//! - Placement hints (`first`, `before`, `after`)
//! - Reading typed values from the layered view
//!
//! To run this example:
//! ```bash
//! cargo run --example basic_usage
//! ```

use cfgweave::domain::DEFAULT_GROUP;
use cfgweave::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt::init();

    println!("=== cfgweave: Basic Usage ===\n");

    // Documents normally live in a remote store; an in-memory one stands in here.
    let store = InMemoryConfigStore::new();
    store.publish(
        "app.properties",
        DEFAULT_GROUP,
        "app.name=Billing\ndatabase.port=5432\nenable.debug=false\napi.timeout=30.5",
    );
    store.publish("prod.properties", DEFAULT_GROUP, "enable.debug=false\ndatabase.port=6432");
    store.publish("local.properties", "DEV", "enable.debug=true");

    // Placeholder values come from the environment.
    let environment = HashMap::from([("stage".to_string(), "prod".to_string())]);

    let layered = Arc::new(LayeredConfig::new());
    let mut registry = ProcessingRegistry::builder()
        .with_environment(environment)
        .with_store(store)
        .with_consumer(layered.clone())
        .build()?;

    let site = DeclarationSite::new("billing::Boot")
        .declare(Descriptor::new(["app.properties"]))
        .declare(Descriptor::new(["${stage:dev}.properties"]).before("app.properties"))
        .declare(Descriptor::new(["local.properties"]).group("${local.group:DEV}").first());

    let report = registry.process_all(&[site]);
    println!(
        "Processed {} site(s), built {} source(s), {} failure(s)\n",
        report.sites_processed,
        report.sources_built,
        report.failures.len()
    );

    let ordered = registry.publish()?;
    println!("--- Resolved Order (highest priority first) ---");
    for (i, source) in ordered.iter().enumerate() {
        println!("  {}. {} ({})", i + 1, source.data_id(), source.group());
    }

    println!("\n--- Values ---");
    let name = layered.get(&ConfigKey::from("app.name"))?;
    println!("app.name      = {} (from {})", name.as_str(), name.source_name());

    let port = layered.get(&ConfigKey::from("database.port"))?;
    println!("database.port = {} (as i64)", port.as_i64("database.port")?);

    let debug = layered.get(&ConfigKey::from("enable.debug"))?;
    println!("enable.debug  = {} (as bool)", debug.as_bool("enable.debug")?);

    let timeout = layered.get(&ConfigKey::from("api.timeout"))?;
    println!("api.timeout   = {} seconds (as f64)", timeout.as_f64("api.timeout")?);

    let level = layered.get_or_default(&ConfigKey::from("log.level"), "info");
    println!("log.level     = {} (default)", level.as_str());

    println!("\n=== Example Complete ===");
    Ok(())
}
