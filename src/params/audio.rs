//! Audio analysis configuration and constants.

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("FFT size must be a power of 2 between 32 and 32768, got {0}")]
    FftSize(usize),

    #[error("decibel range is empty: min {min} must be below max {max}")]
    DecibelRange { min: f32, max: f32 },

    #[error("sample tap must hold at least one FFT window ({fft_size}), got {capacity}")]
    TapCapacity { fft_size: usize, capacity: usize },

    #[error("JPEG quality must be within 1..=100, got {0}")]
    JpegQuality(u8),

    #[error("canvas size must be non-zero, got {0}x{1}")]
    CanvasSize(u32, u32),
}

/// Analyzer configuration (mirrors the Web Audio analyser defaults)
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Time-domain window size (must be power of 2)
    /// Frequency snapshots hold `fft_size / 2` bins
    pub fft_size: usize,

    /// Magnitude mapped to byte 0 (dBFS)
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255 (dBFS)
    pub max_decibels: f32,

    /// Mono samples retained by the sample tap
    /// Must cover at least one FFT window
    pub tap_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            min_decibels: -100.0,
            max_decibels: -30.0,
            tap_capacity: 8192,
        }
    }
}

impl AnalyzerConfig {
    /// Number of frequency bins in a snapshot
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(ConfigError::FftSize(self.fft_size));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::DecibelRange {
                min: self.min_decibels,
                max: self.max_decibels,
            });
        }
        if self.tap_capacity < self.fft_size {
            return Err(ConfigError::TapCapacity {
                fft_size: self.fft_size,
                capacity: self.tap_capacity,
            });
        }
        Ok(())
    }
}

/// Audio constants shared by analysis and strategies
pub mod audio_constants {
    /// Length of the zero-filled placeholder used when no analyzer is bound
    pub const PLACEHOLDER_LEN: usize = 256;

    /// Floor applied before the decibel conversion (-200 dB)
    pub const LEVEL_FLOOR: f32 = 1e-10;

    /// Default reference amplitude for level calculation
    pub const DEFAULT_REFERENCE: f32 = 1.0;

    /// Quietest level considered by the normalized level (dBFS)
    pub const NORMALIZED_LEVEL_FLOOR_DB: f32 = -60.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.frequency_bin_count(), 1024);
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let config = AnalyzerConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::FftSize(1000)));
    }

    #[test]
    fn test_rejects_small_tap() {
        let config = AnalyzerConfig {
            tap_capacity: 512,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TapCapacity { .. })
        ));
    }
}
