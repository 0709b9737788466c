//! wmark Render Engine
//!
//! Offscreen rendering pipeline that composites a background image with
//! the scene's watermark marks at native resolution and encodes the result.
//!
//! # Pipeline Architecture
//!
//! ```text
//! background bytes ──┐
//!                    ├── Decode (RGBA8, native size)
//! render target ─────┘         │
//!                              ├── Image marks (resize + over)
//! snapshot marks ──────────────┤
//!                              ├── Text marks (shadow blur + fill)
//! font library ────────────────┘         │
//!                                        ▼
//!                              Encode (PNG / JPEG / WebP)
//!                                        │
//!                      single ───────────┼─────────── batch
//!                        ▼                               ▼
//!              watermarked_<name>               watermarked_batch.zip
//! ```

pub mod archive;
pub mod compositor;
pub mod encode;
pub mod export;
pub mod fonts;
pub mod raster;
pub mod target;

pub use archive::{ArchiveBuilder, DirectorySink, FileSink, ZipArchiveBuilder};
pub use compositor::Compositor;
pub use encode::encode;
pub use export::*;
pub use fonts::FontLibrary;
pub use raster::{decode_background, decode_raster_source, decode_rgba, ImageDecoder};
pub use target::RenderTarget;
