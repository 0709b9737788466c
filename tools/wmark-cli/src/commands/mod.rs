pub mod apply;
pub mod check;
pub mod log;
pub mod presets;
pub mod stamp;

use std::sync::Arc;

use wmark_common::config::AppConfig;
use wmark_common::SystemClock;
use wmark_editor::{Editor, JsonFileStore, Workspace};
use wmark_render_engine::FontLibrary;
use wmark_scene_model::{ExportFormat, ExportSettings};

/// Open the persisted store and build a workspace whose text metrics come
/// from the configured font.
pub fn open_workspace(config: &AppConfig, fonts: &Arc<FontLibrary>) -> Workspace<JsonFileStore> {
    let editor = Editor::new(fonts.clone(), Arc::new(SystemClock))
        .with_font_family(config.fonts.family.clone());
    let store = JsonFileStore::open(config.store_path());
    tracing::debug!(store = %store.path().display(), font = ?fonts.source(), "Opened workspace");
    Workspace::new(editor, store)
}

/// Export settings from config defaults overridden by command-line flags.
pub fn export_settings(
    config: &AppConfig,
    format: Option<String>,
    quality: Option<u8>,
) -> anyhow::Result<ExportSettings> {
    let format: ExportFormat = format
        .as_deref()
        .unwrap_or(&config.export.format)
        .parse()?;
    Ok(ExportSettings::new(
        format,
        quality.unwrap_or(config.export.quality),
    ))
}
