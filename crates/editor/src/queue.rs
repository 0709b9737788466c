//! The batch queue: source images awaiting export.

use std::path::{Path, PathBuf};

use wmark_common::{WmarkError, WmarkResult};

/// One queued source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    pub path: PathBuf,
    /// File name used for the exported entry.
    pub name: String,
    pub size_bytes: u64,
}

impl QueuedFile {
    /// Stat a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> WmarkResult<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|_| WmarkError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        if !metadata.is_file() {
            return Err(WmarkError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size_bytes: metadata.len(),
        })
    }

    /// Size in megabytes, as shown next to each queued file.
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Ordered queue, replaced wholesale on every file selection. Undo/redo
/// never touches it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchQueue {
    files: Vec<QueuedFile>,
}

impl BatchQueue {
    pub fn new(files: Vec<QueuedFile>) -> Self {
        Self { files }
    }

    /// Stat every path, failing on the first missing file.
    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> WmarkResult<Self> {
        let files = paths
            .into_iter()
            .map(QueuedFile::from_path)
            .collect::<WmarkResult<Vec<_>>>()?;
        Ok(Self { files })
    }

    pub fn files(&self) -> &[QueuedFile] {
        &self.files
    }

    pub fn first(&self) -> Option<&QueuedFile> {
        self.files.first()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}
