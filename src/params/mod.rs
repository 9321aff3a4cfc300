//! Parameter definitions with documented units and defaults.
//!
//! All tunable numbers live here with:
//! - Units (samples, decibels, pixels)
//! - Documented ranges and meanings
//! - A `validate()` pass before use

mod audio;
mod render;

// Re-export all types
pub use audio::{audio_constants, AnalyzerConfig, ConfigError};
pub use render::{ExportConfig, RenderConfig};
