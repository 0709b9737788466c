//! Watermark a single image.

use std::path::PathBuf;
use std::sync::Arc;

use wmark_common::config::AppConfig;
use wmark_editor::PropertyEdit;
use wmark_render_engine::{export_current, DirectorySink, FontLibrary, ImageDecoder, Renderer};

pub struct StampArgs {
    pub image: PathBuf,
    pub text: Option<String>,
    pub logo: Option<PathBuf>,
    pub color: Option<String>,
    pub opacity: Option<f64>,
    pub scale: Option<f64>,
    pub tile: bool,
    pub preset: Option<String>,
    pub save_preset: Option<String>,
    pub save_layout: Option<PathBuf>,
    pub format: Option<String>,
    pub quality: Option<u8>,
    pub output: PathBuf,
}

pub fn run(config: &AppConfig, args: StampArgs) -> anyhow::Result<()> {
    let fonts = Arc::new(FontLibrary::load(&config.fonts));
    let mut workspace = super::open_workspace(config, &fonts);
    workspace.set_settings(super::export_settings(config, args.format, args.quality)?);

    println!("Stamping: {}", args.image.display());
    workspace.open_files(&[&args.image], &ImageDecoder)?;

    if let Some(name) = &args.preset {
        if !workspace.load_preset(name)? {
            anyhow::bail!("Unknown preset: {name}");
        }
        println!("  Preset: {name}");
    }

    if let Some(text) = args.text {
        workspace.editor_mut().add_text()?;
        workspace.editor_mut().apply_edit(&PropertyEdit::Text(text))?;
        if let Some(color) = args.color {
            if !workspace.editor_mut().apply_edit(&PropertyEdit::Fill(color.clone()))? {
                anyhow::bail!("Invalid color: {color}");
            }
        }
        apply_common(&mut workspace, args.opacity, args.scale)?;
    }

    if let Some(logo) = &args.logo {
        workspace.add_logo_file(logo, &ImageDecoder)?;
        apply_common(&mut workspace, args.opacity, args.scale)?;
    }

    if args.tile {
        let count = workspace.editor_mut().tile_active()?;
        println!("  Tiled: {count} copies");
    }

    let objects = workspace.editor().scene().len();
    if objects == 0 {
        println!("  Warning: no watermarks, exporting the image unchanged");
    }

    if let Some(name) = &args.save_preset {
        workspace.save_preset(name)?;
        println!("  Saved preset: {}", name.trim());
    }

    if let Some(path) = &args.save_layout {
        let snapshot = workspace.editor().snapshot()?;
        let value = snapshot.to_value()?;
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
        println!("  Saved layout: {}", path.display());
    }

    let settings = workspace.settings();
    println!("  Objects: {objects}");
    println!("  Format: {} (quality {})", settings.format, settings.quality());

    let mut renderer = Renderer::new(fonts);
    let path = export_current(
        &mut workspace,
        &mut renderer,
        &DirectorySink::new(&args.output),
    )?;
    println!("Export complete: {}", path.display());

    Ok(())
}

/// Opacity and scale apply to the mark just added, which is the selection.
fn apply_common(
    workspace: &mut wmark_editor::Workspace<wmark_editor::JsonFileStore>,
    opacity: Option<f64>,
    scale: Option<f64>,
) -> anyhow::Result<()> {
    if let Some(opacity) = opacity {
        workspace
            .editor_mut()
            .apply_edit(&PropertyEdit::Opacity(opacity))?;
    }
    if let Some(scale) = scale {
        if !workspace.editor_mut().apply_edit(&PropertyEdit::Scale(scale))? {
            anyhow::bail!("Invalid scale: {scale}");
        }
    }
    Ok(())
}
