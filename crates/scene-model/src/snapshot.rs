//! Scene snapshot codec.
//!
//! A snapshot is an immutable, timestamped JSON document holding every mark
//! of a scene in paint order. The background and the selection are never
//! part of it. Two snapshots with identical documents are interchangeable
//! regardless of when they were taken.
//!
//! Documents carry a `version`; any `1.x` is accepted. Unknown fields are
//! ignored and missing optional fields fall back to their defaults, so
//! layouts written by neighbouring minor versions still load.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::object::Mark;
use crate::scene::Scene;

/// Version written into every new document.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Major version this codec understands.
const SUPPORTED_MAJOR: u32 = 1;

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: &'a str,
    objects: Vec<&'a Mark>,
}

#[derive(Deserialize)]
struct DocumentOwned {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    objects: Vec<Mark>,
}

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

/// Errors from encoding or decoding snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot document: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Unsupported snapshot version {0} (expected {SUPPORTED_MAJOR}.x)")]
    UnsupportedVersion(String),
}

/// Immutable serialized copy of a scene's marks.
#[derive(Debug, Clone)]
pub struct Snapshot {
    taken_at: DateTime<Utc>,
    document: Arc<str>,
    object_count: usize,
}

impl PartialEq for Snapshot {
    /// Content equality; the timestamp is not part of a snapshot's identity.
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

impl Snapshot {
    /// Encode marks (paint order) into a snapshot.
    pub fn encode<'a>(
        marks: impl IntoIterator<Item = &'a Mark>,
        taken_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        let objects: Vec<&Mark> = marks.into_iter().collect();
        let object_count = objects.len();
        let document = serde_json::to_string(&DocumentRef {
            version: SNAPSHOT_VERSION,
            objects,
        })
        .map_err(SnapshotError::Serialize)?;

        Ok(Self {
            taken_at,
            document: document.into(),
            object_count,
        })
    }

    /// Encode every mark of a scene.
    pub fn of_scene(scene: &Scene, taken_at: DateTime<Utc>) -> Result<Self, SnapshotError> {
        Self::encode(scene.marks(), taken_at)
    }

    /// Validate an external document (layout file, stored preset) and
    /// re-encode it in canonical form.
    pub fn from_document(json: &str, taken_at: DateTime<Utc>) -> Result<Self, SnapshotError> {
        let marks = decode_document(json)?;
        Self::encode(marks.iter(), taken_at)
    }

    /// Same as [`Snapshot::from_document`] for an already parsed JSON value.
    pub fn from_value(
        value: serde_json::Value,
        taken_at: DateTime<Utc>,
    ) -> Result<Self, SnapshotError> {
        let doc: DocumentOwned = serde_json::from_value(value).map_err(SnapshotError::Malformed)?;
        check_version(&doc.version)?;
        Self::encode(doc.objects.iter(), taken_at)
    }

    /// Re-materialize the marks as fresh, independent values.
    pub fn decode(&self) -> Result<Vec<Mark>, SnapshotError> {
        decode_document(&self.document)
    }

    /// The document as a JSON value, for embedding in other documents.
    pub fn to_value(&self) -> Result<serde_json::Value, SnapshotError> {
        serde_json::from_str(&self.document).map_err(SnapshotError::Malformed)
    }

    /// The serialized document.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn is_empty(&self) -> bool {
        self.object_count == 0
    }
}

fn decode_document(json: &str) -> Result<Vec<Mark>, SnapshotError> {
    let doc: DocumentOwned = serde_json::from_str(json).map_err(SnapshotError::Malformed)?;
    check_version(&doc.version)?;
    Ok(doc.objects)
}

fn check_version(version: &str) -> Result<(), SnapshotError> {
    let major = version
        .split('.')
        .next()
        .and_then(|m| m.trim().parse::<u32>().ok());
    match major {
        Some(SUPPORTED_MAJOR) => Ok(()),
        _ => Err(SnapshotError::UnsupportedVersion(version.to_string())),
    }
}
