//! wmark Editor
//!
//! Everything that mutates a scene or remembers it:
//! - **History:** linear undo/redo of scene snapshots with suppression scopes
//! - **Operations:** add text/logo, delete, center, tile, property edits
//! - **Persistence:** presets and the export activity log over a key-value store
//! - **Workspace:** the explicit application state tying them together
//!
//! Pure state management: decoding and rendering live in the render engine,
//! reached through the [`SourceDecoder`] seam.

pub mod activity;
pub mod editor;
pub mod history;
pub mod presets;
pub mod queue;
pub mod store;
pub mod workspace;

pub use activity::{ActivityEntry, ActivityKind, ActivityLog};
pub use editor::{Editor, PropertyEdit, SuppressedEditor};
pub use history::History;
pub use presets::PresetStore;
pub use queue::{BatchQueue, QueuedFile};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use workspace::{SourceDecoder, Workspace};
