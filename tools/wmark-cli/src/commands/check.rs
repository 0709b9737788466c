//! Check configuration, storage and font availability.

use wmark_common::config::{config_file_path, AppConfig};
use wmark_editor::{ActivityLog, JsonFileStore, PresetStore};
use wmark_render_engine::FontLibrary;
use wmark_scene_model::ExportFormat;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("wmark System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[OK] Config: defaults ({} not found)", config_path.display());
    }

    let store_path = config.store_path();
    let mut store = JsonFileStore::open(&store_path);
    let presets = PresetStore::new(&mut store).list().len();
    let exports = ActivityLog::new(&mut store).entries().len();
    println!("[OK] Data store: {}", store_path.display());
    println!("     {presets} preset(s), {exports} logged export(s)");

    let mut ready = true;
    match config.export.format.parse::<ExportFormat>() {
        Ok(format) => println!(
            "[OK] Default export: {format} (quality {})",
            config.export.quality
        ),
        Err(e) => {
            ready = false;
            println!("[FAIL] Default export: {e}");
        }
    }
    println!("     Batch failure policy: {:?}", config.export.failure_policy);

    let fonts = FontLibrary::load(&config.fonts);
    match fonts.source() {
        Some(path) => println!("[OK] Font: {}", path.display()),
        None => {
            ready = false;
            println!("[WARN] Font: none found, text watermarks cannot be rendered");
            println!("     Set fonts.path in {}", config_path.display());
        }
    }

    println!();
    if ready {
        println!("wmark is ready.");
    } else {
        println!("Some checks failed. See above for fixes.");
    }

    Ok(())
}
