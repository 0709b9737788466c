//! Output packaging and delivery.
//!
//! An [`ArchiveBuilder`] collects named payloads into one blob; a
//! [`FileSink`] delivers a blob under a suggested file name.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use wmark_common::{WmarkError, WmarkResult};

/// Accepts named byte payloads and produces one packaged blob.
pub trait ArchiveBuilder: Send {
    fn add(&mut self, name: &str, bytes: &[u8]) -> WmarkResult<()>;

    /// Names added so far, in insertion order.
    fn entries(&self) -> &[String];

    /// Finalize and return the archive bytes. The builder is spent after.
    fn finish(&mut self) -> WmarkResult<Vec<u8>>;
}

/// Zip archive held in memory.
pub struct ZipArchiveBuilder {
    writer: Option<ZipWriter<Cursor<Vec<u8>>>>,
    entries: Vec<String>,
}

impl Default for ZipArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipArchiveBuilder {
    pub fn new() -> Self {
        Self {
            writer: Some(ZipWriter::new(Cursor::new(Vec::new()))),
            entries: Vec::new(),
        }
    }

    fn writer(&mut self) -> WmarkResult<&mut ZipWriter<Cursor<Vec<u8>>>> {
        self.writer
            .as_mut()
            .ok_or_else(|| WmarkError::archive("Archive already finished"))
    }
}

impl ArchiveBuilder for ZipArchiveBuilder {
    fn add(&mut self, name: &str, bytes: &[u8]) -> WmarkResult<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let writer = self.writer()?;
        writer
            .start_file(name, options)
            .map_err(|e| WmarkError::archive(format!("{name}: {e}")))?;
        writer
            .write_all(bytes)
            .map_err(|e| WmarkError::archive(format!("{name}: {e}")))?;
        self.entries.push(name.to_string());
        Ok(())
    }

    fn entries(&self) -> &[String] {
        &self.entries
    }

    fn finish(&mut self) -> WmarkResult<Vec<u8>> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| WmarkError::archive("Archive already finished"))?;
        let cursor = writer
            .finish()
            .map_err(|e| WmarkError::archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// Delivers a finished file to the user.
pub trait FileSink: Send + Sync {
    /// Save `bytes` under `name`, returning where it went.
    fn save(&self, name: &str, bytes: &[u8]) -> WmarkResult<PathBuf>;
}

/// Writes files into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn save(&self, name: &str, bytes: &[u8]) -> WmarkResult<PathBuf> {
        // Only the final component of a suggested name is honoured.
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| WmarkError::storage(format!("Invalid output name `{name}`")))?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved file");
        Ok(path)
    }
}
