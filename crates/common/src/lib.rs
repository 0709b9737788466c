//! wmark Common Utilities
//!
//! Shared infrastructure for all wmark crates:
//! - Error types and result aliases
//! - Clock abstraction for snapshot and audit timestamps
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
