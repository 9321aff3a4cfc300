//! Frame-synchronous FFT analysis over the sample tap.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use super::tap::SampleTap;
use crate::params::{audio_constants, AnalyzerConfig};

/// Converts the most recent window of tapped samples into per-frame snapshots
///
/// Snapshots are recomputed on `update()` and borrowed by the caller; the
/// analyzer keeps no history between frames.
pub struct Analyzer {
    config: AnalyzerConfig,
    tap: SampleTap,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    fft_buffer: Vec<Complex<f32>>,
    /// Frequency bin magnitudes (0-255), empty when no audio has arrived
    frequency: Vec<u8>,
    /// Time-domain samples (-1..1), empty when no audio has arrived
    waveform: Vec<f32>,
    /// Tap write counter seen by the last update
    last_written: Option<u64>,
}

impl Analyzer {
    /// Create analyzer reading from `tap` (config must already be validated)
    pub fn new(config: AnalyzerConfig, tap: SampleTap) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.fft_size);
        let window = (0..config.fft_size)
            .map(|i| blackman_window(i, config.fft_size))
            .collect();

        Self {
            fft_buffer: vec![Complex::new(0.0, 0.0); config.fft_size],
            frequency: Vec::new(),
            waveform: Vec::new(),
            last_written: None,
            config,
            tap,
            fft,
            window,
        }
    }

    /// Refresh snapshots from the tap
    ///
    /// Does nothing when no samples arrived since the previous call, so
    /// repeated calls within one frame are harmless.
    pub fn update(&mut self) {
        let written = self.tap.written();
        if self.last_written == Some(written) {
            return;
        }

        if written == 0 {
            self.frequency.clear();
            self.waveform.clear();
            self.last_written = Some(0);
            return;
        }

        let size = self.config.fft_size;
        self.waveform.resize(size, 0.0);
        self.last_written = Some(self.tap.copy_latest(&mut self.waveform));

        // Apply Blackman window
        for (slot, (&sample, &w)) in self
            .fft_buffer
            .iter_mut()
            .zip(self.waveform.iter().zip(&self.window))
        {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        // Map magnitudes from [min_db, max_db] onto bytes
        let bins = self.config.frequency_bin_count();
        let min_db = self.config.min_decibels;
        let range_db = self.config.max_decibels - min_db;
        self.frequency.resize(bins, 0);
        for (byte, bin) in self.frequency.iter_mut().zip(&self.fft_buffer[..bins]) {
            let magnitude = bin.norm() / size as f32;
            let db = 20.0 * magnitude.max(audio_constants::LEVEL_FLOOR).log10();
            *byte = (255.0 * (db - min_db) / range_db).clamp(0.0, 255.0) as u8;
        }
    }

    /// Current frequency snapshot (`fft_size / 2` bins, or empty)
    pub fn frequency_snapshot(&self) -> &[u8] {
        &self.frequency
    }

    /// Current waveform snapshot (`fft_size` samples, or empty)
    pub fn waveform_snapshot(&self) -> &[f32] {
        &self.waveform
    }

    /// Largest absolute sample in the current waveform
    pub fn peak_amplitude(&self) -> f32 {
        self.waveform.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }

    /// Mean frequency magnitude as a percentage (level meter)
    pub fn level_percent(&self) -> u8 {
        if self.frequency.is_empty() {
            return 0;
        }
        let sum: u32 = self.frequency.iter().map(|&v| v as u32).sum();
        let average = sum as f32 / self.frequency.len() as f32;
        (average / 255.0 * 100.0).round() as u8
    }

    /// Peak level mapped from [-60 dBFS, 0 dBFS] onto [0, 1]
    pub fn normalized_level(&self) -> f32 {
        let db = Self::calculate_audio_level(
            self.peak_amplitude(),
            audio_constants::DEFAULT_REFERENCE,
        );
        let floor = audio_constants::NORMALIZED_LEVEL_FLOOR_DB;
        ((db - floor) / -floor).clamp(0.0, 1.0)
    }

    /// Level in decibels relative to `reference_max`, floored at -200 dB
    pub fn calculate_audio_level(peak_amplitude: f32, reference_max: f32) -> f32 {
        let ratio = if reference_max > 0.0 {
            peak_amplitude / reference_max
        } else {
            0.0
        };
        20.0 * ratio.max(audio_constants::LEVEL_FLOOR).log10()
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

/// Blackman window function for FFT analysis
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = 2.0 * PI * index as f32 / size as f32;
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}
