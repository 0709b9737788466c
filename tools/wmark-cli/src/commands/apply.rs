//! Apply one layout to many images.

use std::path::PathBuf;
use std::sync::Arc;

use wmark_common::config::AppConfig;
use wmark_common::FailurePolicy;
use wmark_render_engine::{
    export_batch, BatchOptions, BatchProgress, DirectorySink, ExportStage, FontLibrary,
    ImageDecoder, ProgressCallback, Renderer,
};
use wmark_scene_model::Snapshot;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: &AppConfig,
    images: Vec<PathBuf>,
    layout: Option<PathBuf>,
    preset: Option<String>,
    format: Option<String>,
    quality: Option<u8>,
    skip_failures: bool,
    output: PathBuf,
) -> anyhow::Result<()> {
    let fonts = Arc::new(FontLibrary::load(&config.fonts));
    let mut workspace = super::open_workspace(config, &fonts);
    workspace.set_settings(super::export_settings(config, format, quality)?);

    workspace.open_files(&images, &ImageDecoder)?;

    if let Some(path) = &layout {
        let document = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read layout {}: {e}", path.display()))?;
        let marks = Snapshot::from_document(&document, chrono::Utc::now())?.decode()?;
        workspace.editor_mut().insert_marks(marks)?;
        println!("Layout: {}", path.display());
    } else if let Some(name) = &preset {
        if !workspace.load_preset(name)? {
            anyhow::bail!("Unknown preset: {name}");
        }
        println!("Preset: {name}");
    }

    let mut options = BatchOptions::from_config(&config.export);
    if skip_failures {
        options.failure_policy = FailurePolicy::SkipAndReport;
    }

    let settings = workspace.settings();
    println!("  Images: {}", workspace.queue().len());
    println!("  Objects: {}", workspace.editor().scene().len());
    println!("  Format: {} (quality {})", settings.format, settings.quality());
    println!("  Output: {}", output.join(&options.archive_name).display());

    let progress_cb: ProgressCallback = Box::new(|p: BatchProgress| {
        if p.stage == ExportStage::Rendering {
            print!(
                "\r  Progress: {:.0}% ({}/{}) {}  ",
                p.progress * 100.0,
                p.completed + 1,
                p.total,
                p.current.as_deref().unwrap_or_default(),
            );
        }
    });

    let mut renderer = Renderer::new(fonts);
    match export_batch(
        &mut workspace,
        &mut renderer,
        &DirectorySink::new(&output),
        &options,
        Some(progress_cb),
    )
    .await
    {
        Ok(report) => {
            println!("\nExport complete: {}", report.archive_path.display());
            println!("  Exported: {}", report.exported.len());
            if !report.failures.is_empty() {
                println!("  Skipped: {}", report.failures.len());
                for failure in &report.failures {
                    println!("    {}: {}", failure.file, failure.error);
                }
            }
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Batch export failed: {e}"))
        }
    }
}
