// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-refresh example.
//!
//! This example demonstrates:
//! - Subscribing auto-refresh sources to store changes
//! - Reacting to changes through a layered view callback
//! - Leaving non-refreshing sources untouched
//!
//! With the `reload` feature the documents live in a temporary directory and are
//! edited on disk; otherwise an in-memory store is used.
//!
//! To run this example:
//! ```bash
//! cargo run --example auto_refresh
//! cargo run --example auto_refresh --features reload
//! ```

use cfgweave::domain::DEFAULT_GROUP;
use cfgweave::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== cfgweave: Auto-Refresh Example ===\n");

    let layered = Arc::new(LayeredConfig::new());
    layered.on_change(Arc::new(|name| {
        println!("  -> source changed: {}", name);
    }));

    run(layered)?;

    println!("\n=== Example Complete ===");
    Ok(())
}

fn show(layered: &LayeredConfig) -> Result<()> {
    let flag = layered.get(&ConfigKey::from("feature.checkout"))?;
    let limit = layered.get(&ConfigKey::from("rate.limit"))?;
    println!(
        "  feature.checkout = {}, rate.limit = {}",
        flag.as_bool("feature.checkout")?,
        limit.as_i64("rate.limit")?
    );
    Ok(())
}

fn declarations() -> Vec<DeclarationSite> {
    vec![DeclarationSite::new("shop::Boot")
        .declare(Descriptor::new(["flags.properties"]).auto_refresh(true).first())
        .declare(Descriptor::new(["limits.properties"]))]
}

#[cfg(not(feature = "reload"))]
fn run(layered: Arc<LayeredConfig>) -> Result<()> {
    let store = InMemoryConfigStore::new();
    store.publish("flags.properties", DEFAULT_GROUP, "feature.checkout=false");
    store.publish("limits.properties", DEFAULT_GROUP, "rate.limit=100");

    let mut registry = ProcessingRegistry::builder()
        .with_environment(HashMap::<String, String>::new())
        .with_store(store.clone())
        .with_consumer(layered.clone())
        .build()?;
    registry.process_all(&declarations());
    registry.publish()?;

    println!("--- Initial ---");
    show(&layered)?;

    println!("\n--- Publishing new flags ---");
    store.publish("flags.properties", DEFAULT_GROUP, "feature.checkout=true");
    show(&layered)?;

    println!("\n--- Publishing new limits (not refreshed) ---");
    store.publish("limits.properties", DEFAULT_GROUP, "rate.limit=5");
    show(&layered)?;

    registry.refresh_registrar().cancel_all();
    Ok(())
}

#[cfg(feature = "reload")]
fn run(layered: Arc<LayeredConfig>) -> Result<()> {
    use cfgweave::adapters::FileConfigStore;
    use std::thread;
    use std::time::Duration;

    let dir = std::env::temp_dir().join(format!("cfgweave-auto-refresh-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    let store = FileConfigStore::new(&dir)?.with_debounce(Duration::from_millis(100));
    store.write_document("flags.properties", DEFAULT_GROUP, "feature.checkout=false")?;
    store.write_document("limits.properties", DEFAULT_GROUP, "rate.limit=100")?;
    println!("Documents stored under {}\n", dir.display());

    let mut registry = ProcessingRegistry::builder()
        .with_environment(HashMap::<String, String>::new())
        .with_store(store.clone())
        .with_consumer(layered.clone())
        .build()?;
    registry.process_all(&declarations());
    registry.publish()?;

    println!("--- Initial ---");
    show(&layered)?;

    // Give the watcher a moment to start
    thread::sleep(Duration::from_millis(200));

    println!("\n--- Editing flags on disk ---");
    store.write_document("flags.properties", DEFAULT_GROUP, "feature.checkout=true")?;
    thread::sleep(Duration::from_millis(500));
    show(&layered)?;

    registry.refresh_registrar().cancel_all();
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
