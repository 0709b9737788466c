//! wmark Scene Model
//!
//! Defines the core data contracts for the watermark editor:
//! - **Objects:** Text and image watermark marks with anchor-relative geometry
//! - **Scene:** The live editable surface (background, ordered marks, selection)
//! - **Snapshot:** Immutable, versioned serialized copies of a scene's marks
//! - **Viewport:** Presentation-only zoom/pan, never captured or exported
//!
//! All mark geometry lives in the unzoomed, unpanned pixel space of the
//! background image at scale 1, which is what lets one snapshot be replayed
//! onto images of different dimensions.

pub mod color;
pub mod export;
pub mod metrics;
pub mod object;
pub mod scene;
pub mod snapshot;
pub mod viewport;

pub use color::*;
pub use export::*;
pub use metrics::*;
pub use object::*;
pub use scene::*;
pub use snapshot::*;
pub use viewport::*;
