//! Auto-EQ clustering library - shared modules for all binaries.

pub mod aggregate;
pub mod catalog;
pub mod models;
pub mod normalize;
pub mod presets;
pub mod progress;
pub mod safety;
pub mod scoring;
