//! Error types shared across wmark crates.

use std::path::PathBuf;

/// Top-level error type for wmark operations.
///
/// User-facing errors are terminal for the triggering action only; none of
/// them leave the scene or the history half-mutated.
#[derive(Debug, thiserror::Error)]
pub enum WmarkError {
    #[error("Select a watermark first")]
    NoSelection,

    #[error("Load an image first")]
    NoSourceImage,

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Snapshot error: {message}")]
    Snapshot { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using WmarkError.
pub type WmarkResult<T> = Result<T, WmarkError>;

impl WmarkError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error belongs to the per-image decode/encode family
    /// that a batch export may skip instead of aborting.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Encode { .. } | Self::Render { .. } | Self::Io(_)
        )
    }
}
