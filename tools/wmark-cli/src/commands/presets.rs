//! Manage saved presets.

use wmark_common::config::AppConfig;
use wmark_editor::{JsonFileStore, PresetStore};

fn open_store(config: &AppConfig) -> JsonFileStore {
    JsonFileStore::open(config.store_path())
}

pub fn list(config: &AppConfig) -> anyhow::Result<()> {
    let mut store = open_store(config);
    let names = PresetStore::new(&mut store).list();
    if names.is_empty() {
        println!("No presets saved.");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

pub fn show(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let mut store = open_store(config);
    let snapshot = PresetStore::new(&mut store)
        .get(name, chrono::Utc::now())?
        .ok_or_else(|| anyhow::anyhow!("Unknown preset: {name}"))?;

    println!("Preset: {}", name.trim());
    println!("  Objects: {}", snapshot.object_count());
    println!("{}", serde_json::to_string_pretty(&snapshot.to_value()?)?);
    Ok(())
}

pub fn delete(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let mut store = open_store(config);
    if PresetStore::new(&mut store).remove(name)? {
        println!("Deleted preset: {}", name.trim());
        Ok(())
    } else {
        Err(anyhow::anyhow!("Unknown preset: {name}"))
    }
}
