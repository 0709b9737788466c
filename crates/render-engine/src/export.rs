//! Single and batch export.
//!
//! Both paths render at the background's native resolution. The batch
//! pipeline snapshots the layout once, then walks the queue strictly in
//! order with one image in flight, reusing a single render target.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use wmark_common::{ExportDefaults, FailurePolicy, WmarkError, WmarkResult};
use wmark_editor::{ActivityKind, KeyValueStore, Workspace};
use wmark_scene_model::{watermarked_name, ExportSettings, Mark, Snapshot};

use crate::archive::{ArchiveBuilder, FileSink, ZipArchiveBuilder};
use crate::compositor::Compositor;
use crate::encode::encode;
use crate::fonts::FontLibrary;
use crate::raster::decode_rgba;
use crate::target::RenderTarget;

/// Manifest added to the archive when items were skipped.
pub const FAILURE_MANIFEST: &str = "failures.json";

/// Progress callback for batch export.
pub type ProgressCallback = Box<dyn Fn(BatchProgress) + Send>;

/// Batch progress report.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Images finished so far (exported or skipped).
    pub completed: usize,

    /// Images in the queue.
    pub total: usize,

    /// Image being processed.
    pub current: Option<String>,

    pub stage: ExportStage,
}

/// Stages of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Packaging,
    Complete,
    Failed,
}

/// Batch behaviour taken from configuration.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub failure_policy: FailurePolicy,
    pub archive_name: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&ExportDefaults::default())
    }
}

impl BatchOptions {
    pub fn from_config(config: &ExportDefaults) -> Self {
        Self {
            failure_policy: config.failure_policy,
            archive_name: config.archive_name.clone(),
        }
    }
}

/// A queued image that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of a delivered batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub archive_path: PathBuf,
    /// Archive entry names in queue order.
    pub exported: Vec<String>,
    pub failures: Vec<BatchFailure>,
}

/// Font library plus the reusable offscreen target.
pub struct Renderer {
    fonts: Arc<FontLibrary>,
    target: RenderTarget,
}

impl Renderer {
    pub fn new(fonts: Arc<FontLibrary>) -> Self {
        Self {
            fonts,
            target: RenderTarget::new(),
        }
    }

    pub fn fonts(&self) -> &Arc<FontLibrary> {
        &self.fonts
    }

    /// Render `marks` over an encoded background at its native size and
    /// encode the result.
    pub fn render<'m>(
        &mut self,
        background: &[u8],
        marks: impl IntoIterator<Item = &'m Mark>,
        settings: ExportSettings,
    ) -> WmarkResult<Vec<u8>> {
        render_onto(&mut self.target, &self.fonts, background, marks, settings)
    }
}

fn render_onto<'m>(
    target: &mut RenderTarget,
    fonts: &FontLibrary,
    background: &[u8],
    marks: impl IntoIterator<Item = &'m Mark>,
    settings: ExportSettings,
) -> WmarkResult<Vec<u8>> {
    let result = (|| {
        let background = decode_rgba(background)?;
        target.configure(background.width(), background.height())?;
        target.set_background(&background)?;
        Compositor::new(fonts).draw(target, marks)?;
        encode(target.image(), settings)
    })();
    target.clear();
    result
}

fn emit(progress: &Option<ProgressCallback>, report: BatchProgress) {
    if let Some(cb) = progress {
        cb(report);
    }
}

/// Prefix per-item errors with the file they came from.
fn for_file(err: WmarkError, file: &str) -> WmarkError {
    match err {
        WmarkError::Decode { message } => WmarkError::decode(format!("{file}: {message}")),
        WmarkError::Encode { message } => WmarkError::encode(format!("{file}: {message}")),
        WmarkError::Render { message } => WmarkError::render(format!("{file}: {message}")),
        other => other,
    }
}

/// Export the loaded image with the current marks.
///
/// The interactive viewport is reset for the duration and restored after,
/// whatever the outcome. Saves `watermarked_<name>` and records a `single`
/// activity entry.
pub fn export_current<S: KeyValueStore>(
    workspace: &mut Workspace<S>,
    renderer: &mut Renderer,
    sink: &dyn FileSink,
) -> WmarkResult<PathBuf> {
    let settings = workspace.settings();
    let (name, bytes, object_count) = {
        let view = workspace.editor_mut().native_view();
        let background = view.background().ok_or(WmarkError::NoSourceImage)?;
        tracing::info!(
            name = %background.name,
            format = %settings.format,
            quality = settings.quality(),
            "Starting export"
        );
        let bytes = renderer
            .render(&background.data, view.marks(), settings)
            .map_err(|e| for_file(e, &background.name))?;
        (background.name.clone(), bytes, view.len())
    };

    let path = sink.save(&watermarked_name(&name), &bytes)?;
    workspace.record_activity(ActivityKind::Single, name, object_count);
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Export complete");
    Ok(path)
}

/// Export every queued image with the current layout and deliver one
/// archive.
///
/// The layout is snapshotted once up front; each image gets fresh marks
/// decoded from it. Images are read with `tokio::fs` and rendered on the
/// blocking pool one at a time, in queue order.
pub async fn export_batch<S: KeyValueStore>(
    workspace: &mut Workspace<S>,
    renderer: &mut Renderer,
    sink: &dyn FileSink,
    options: &BatchOptions,
    progress: Option<ProgressCallback>,
) -> WmarkResult<BatchReport> {
    let queue = workspace.queue().clone();
    if queue.is_empty() {
        return Err(WmarkError::NoSourceImage);
    }
    let snapshot = workspace.editor().snapshot()?;
    let settings = workspace.settings();
    let total = queue.len();

    tracing::info!(
        images = total,
        objects = snapshot.object_count(),
        format = %settings.format,
        quality = settings.quality(),
        policy = ?options.failure_policy,
        "Starting batch export"
    );
    emit(
        &progress,
        BatchProgress {
            progress: 0.0,
            completed: 0,
            total,
            current: None,
            stage: ExportStage::Preparing,
        },
    );

    let mut archive = ZipArchiveBuilder::new();
    let mut failures = Vec::new();
    let fonts = Arc::clone(&renderer.fonts);
    let mut target = std::mem::take(&mut renderer.target);

    let mut used_names = HashSet::new();
    let mut outcome = Ok(());
    for (index, file) in queue.files().iter().enumerate() {
        emit(
            &progress,
            BatchProgress {
                progress: index as f64 / total as f64,
                completed: index,
                total,
                current: Some(file.name.clone()),
                stage: ExportStage::Rendering,
            },
        );

        let rendered = match tokio::fs::read(&file.path).await {
            Ok(bytes) => {
                let (returned, result) =
                    render_item(target, Arc::clone(&fonts), bytes, snapshot.clone(), settings).await;
                target = returned;
                match result {
                    Ok(rendered) => rendered,
                    Err(err) => {
                        outcome = Err(err);
                        break;
                    }
                }
            }
            Err(err) => Err(WmarkError::decode(format!("read failed: {err}"))),
        };

        match rendered.map_err(|e| for_file(e, &file.name)) {
            Ok(encoded) => {
                let entry = unique_entry_name(&file.name, &mut used_names);
                if let Err(err) = archive.add(&entry, &encoded) {
                    outcome = Err(err);
                    break;
                }
                tracing::debug!(entry = %entry, bytes = encoded.len(), "Rendered batch item");
            }
            Err(err)
                if options.failure_policy == FailurePolicy::SkipAndReport && err.is_per_item() =>
            {
                tracing::warn!(file = %file.name, error = %err, "Skipping batch item");
                failures.push(BatchFailure {
                    file: file.name.clone(),
                    error: err.to_string(),
                });
            }
            Err(err) => {
                outcome = Err(err);
                break;
            }
        }
    }
    renderer.target = target;

    if let Err(err) = outcome {
        tracing::error!(error = %err, "Batch export aborted");
        emit(
            &progress,
            BatchProgress {
                progress: 1.0,
                completed: total,
                total,
                current: None,
                stage: ExportStage::Failed,
            },
        );
        return Err(err);
    }

    emit(
        &progress,
        BatchProgress {
            progress: 1.0,
            completed: total,
            total,
            current: None,
            stage: ExportStage::Packaging,
        },
    );
    if !failures.is_empty() {
        archive.add(FAILURE_MANIFEST, &serde_json::to_vec_pretty(&failures)?)?;
    }
    let exported: Vec<String> = archive
        .entries()
        .iter()
        .filter(|name| name.as_str() != FAILURE_MANIFEST)
        .cloned()
        .collect();
    let archive_bytes = archive.finish()?;
    let archive_path = sink.save(&options.archive_name, &archive_bytes)?;

    workspace.record_activity(
        ActivityKind::Batch,
        format!("{total} Images"),
        snapshot.object_count(),
    );
    emit(
        &progress,
        BatchProgress {
            progress: 1.0,
            completed: total,
            total,
            current: None,
            stage: ExportStage::Complete,
        },
    );
    tracing::info!(
        archive = %archive_path.display(),
        exported = exported.len(),
        skipped = failures.len(),
        "Batch export complete"
    );

    Ok(BatchReport {
        archive_path,
        exported,
        failures,
    })
}

/// Render one image on the blocking pool. The target is moved in and handed
/// back so it can be reused for the next image; if the task itself fails a
/// fresh target is handed back with the error.
async fn render_item(
    mut target: RenderTarget,
    fonts: Arc<FontLibrary>,
    background: Vec<u8>,
    snapshot: Snapshot,
    settings: ExportSettings,
) -> (RenderTarget, WmarkResult<WmarkResult<Vec<u8>>>) {
    let joined = tokio::task::spawn_blocking(move || {
        let result = snapshot
            .decode()
            .map_err(|e| WmarkError::snapshot(e.to_string()))
            .and_then(|marks| render_onto(&mut target, &fonts, &background, &marks, settings));
        (target, result)
    })
    .await;

    match joined {
        Ok((target, result)) => (target, Ok(result)),
        Err(err) => (
            RenderTarget::new(),
            Err(WmarkError::render(format!("Render task failed: {err}"))),
        ),
    }
}

/// Archive entry name for `file`, suffixed ` (2)`, ` (3)`, ... when files
/// from different directories share a name.
fn unique_entry_name(file: &str, used: &mut HashSet<String>) -> String {
    let base = watermarked_name(file);
    if used.insert(base.clone()) {
        return base;
    }
    let path = Path::new(&base);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| base.clone());
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 2;
    loop {
        let candidate = match &extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::tests::png_bytes;
    use image::Rgba;
    use wmark_editor::{Editor, MemoryStore};
    use wmark_scene_model::{Anchor, BackgroundImage, ImageMark, Point2D, RasterSource, ViewportTransform};

    fn workspace() -> Workspace<MemoryStore> {
        Workspace::new(Editor::default(), MemoryStore::new())
    }

    #[test]
    fn test_export_without_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        let mut renderer = Renderer::new(Arc::new(FontLibrary::empty()));
        let err = export_current(&mut ws, &mut renderer, &crate::DirectorySink::new(dir.path()))
            .unwrap_err();
        assert!(matches!(err, WmarkError::NoSourceImage));
    }

    #[test]
    fn test_export_current_native_size_and_viewport_restored() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        ws.editor_mut()
            .load_background(BackgroundImage::new(
                "photo.png",
                40,
                30,
                png_bytes(40, 30, [0, 0, 255, 255]),
            ))
            .unwrap();
        let mut logo = ImageMark::new(RasterSource::new(
            "image/png",
            10,
            10,
            png_bytes(10, 10, [255, 0, 0, 255]),
        ));
        logo.anchor = Anchor::TOP_LEFT;
        logo.position = Point2D::new(0.0, 0.0);
        ws.editor_mut().insert_marks(vec![Mark::Image(logo)]).unwrap();
        ws.editor_mut().zoom_by(1.5);
        let zoomed = *ws.editor().viewport();

        let mut renderer = Renderer::new(Arc::new(FontLibrary::empty()));
        let path = export_current(&mut ws, &mut renderer, &crate::DirectorySink::new(dir.path()))
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "watermarked_photo.png");
        assert_eq!(*ws.editor().viewport(), zoomed);
        assert_ne!(zoomed, ViewportTransform::IDENTITY);

        let output = image::open(&path).unwrap().into_rgba8();
        assert_eq!(output.dimensions(), (40, 30));
        assert_eq!(output.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(output.get_pixel(20, 20), &Rgba([0, 0, 255, 255]));

        let activity = ws.activity();
        assert_eq!(activity[0].kind, ActivityKind::Single);
        assert_eq!(activity[0].label, "photo.png");
        assert_eq!(activity[0].object_count, 1);
    }

    #[test]
    fn test_failed_export_restores_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        ws.editor_mut()
            .load_background(BackgroundImage::new("broken.png", 10, 10, vec![1, 2, 3]))
            .unwrap();
        ws.editor_mut().zoom_by(-0.5);
        let before = *ws.editor().viewport();

        let mut renderer = Renderer::new(Arc::new(FontLibrary::empty()));
        let err = export_current(&mut ws, &mut renderer, &crate::DirectorySink::new(dir.path()))
            .unwrap_err();
        assert!(matches!(err, WmarkError::Decode { .. }));
        assert_eq!(*ws.editor().viewport(), before);
        assert!(ws.activity().is_empty());
    }

    #[test]
    fn test_unique_entry_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_entry_name("photo.png", &mut used), "watermarked_photo.png");
        assert_eq!(unique_entry_name("photo.png", &mut used), "watermarked_photo (2).png");
        assert_eq!(unique_entry_name("photo.png", &mut used), "watermarked_photo (3).png");
        assert_eq!(unique_entry_name("README", &mut used), "watermarked_README");
        assert_eq!(unique_entry_name("README", &mut used), "watermarked_README (2)");
    }

    #[test]
    fn test_export_with_huge_scale_does_not_allocate_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut ws = workspace();
        ws.editor_mut()
            .load_background(BackgroundImage::new(
                "photo.png",
                40,
                30,
                png_bytes(40, 30, [0, 0, 255, 255]),
            ))
            .unwrap();
        ws.editor_mut()
            .add_logo(RasterSource::new("image/png", 4, 4, png_bytes(4, 4, [255, 0, 0, 255])))
            .unwrap();
        assert!(ws
            .editor_mut()
            .apply_edit(&wmark_editor::PropertyEdit::Scale(1e9))
            .unwrap());

        let mut renderer = Renderer::new(Arc::new(FontLibrary::empty()));
        let path = export_current(&mut ws, &mut renderer, &crate::DirectorySink::new(dir.path()))
            .unwrap();
        let output = image::open(&path).unwrap().into_rgba8();
        assert_eq!(output.dimensions(), (40, 30));
        assert!(output.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn test_for_file_prefixes_item_errors() {
        let err = for_file(WmarkError::decode("bad header"), "a.jpg");
        assert_eq!(err.to_string(), "Decode error: a.jpg: bad header");
        assert!(matches!(for_file(WmarkError::NoSelection, "a.jpg"), WmarkError::NoSelection));
    }
}
