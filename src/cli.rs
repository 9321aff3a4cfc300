//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::params::{AnalyzerConfig, ExportConfig, RenderConfig};
use crate::properties::{parse_assignment, PropertyValue};
use crate::visualization::VISUALIZATION_NAMES;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "wavecanvas")]
#[command(about = "Real-time audio visualizer", long_about = None)]
pub struct Args {
    /// Visualization shown at startup: spectrum, waveform, particles, circular, oscilloscope
    #[arg(long, short = 'v', value_name = "NAME", default_value = "spectrum")]
    pub visualization: String,

    /// Start capturing the default microphone immediately
    #[arg(long, conflicts_with = "file")]
    pub mic: bool,

    /// Play and visualize an audio file (WAV, MP3, FLAC, Ogg, ...)
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value_t = 1280)]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value_t = 720)]
    pub height: u32,

    /// FFT window size (power of 2, 32-32768)
    #[arg(long, value_name = "SAMPLES", default_value_t = 2048)]
    pub fft_size: usize,

    /// Override a property of the startup visualization (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, PropertyValue)>,

    /// Print every visualization's properties as JSON and exit
    #[arg(long)]
    pub list_properties: bool,

    /// Directory receiving PNG/JPEG exports
    #[arg(long, value_name = "DIR", default_value = "exports")]
    pub export_dir: PathBuf,

    /// JPEG export quality (1-100)
    #[arg(long, value_name = "QUALITY", default_value_t = 90)]
    pub jpeg_quality: u8,
}

fn parse_property(s: &str) -> Result<(String, PropertyValue), String> {
    parse_assignment(s).map_err(|e| e.to_string())
}

impl Args {
    /// Analyzer configuration from command-line arguments
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        let defaults = AnalyzerConfig::default();
        AnalyzerConfig {
            fft_size: self.fft_size,
            // Keep a few windows of history
            tap_capacity: defaults.tap_capacity.max(self.fft_size * 4),
            ..defaults
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        let initial = self.visualization.to_lowercase();
        let initial_visualization = match initial.as_str() {
            "none" | "" => None,
            name if VISUALIZATION_NAMES.contains(&name) => Some(initial.clone()),
            other => {
                log::warn!("Unknown visualization '{}', using spectrum", other);
                Some("spectrum".to_string())
            }
        };

        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            initial_visualization,
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            output_dir: self.export_dir.clone(),
            jpeg_quality: self.jpeg_quality,
        }
    }
}
