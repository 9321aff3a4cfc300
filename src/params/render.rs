//! Rendering and export configuration.

use std::path::PathBuf;

use super::audio::ConfigError;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Visualization selected at startup (None = blank canvas)
    pub initial_visualization: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            initial_visualization: Some("spectrum".to_string()),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::CanvasSize(
                self.window_width,
                self.window_height,
            ));
        }
        Ok(())
    }
}

/// Still-image export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Directory receiving exported frames
    pub output_dir: PathBuf,

    /// JPEG quality (1-100)
    /// 90 matches the 0.9 quality of the browser export
    pub jpeg_quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            jpeg_quality: 90,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::JpegQuality(self.jpeg_quality));
        }
        Ok(())
    }

    /// Output path for an export taken at `timestamp_ms`
    pub fn file_path(&self, timestamp_ms: u128, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("audio-visualization-{}.{}", timestamp_ms, extension))
    }
}
