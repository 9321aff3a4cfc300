//! Application context: the single owner of every subsystem.
//!
//! The window layer (or a test) drives it through a small control surface
//! and calls `frame()` once per display refresh.

use std::path::PathBuf;
use std::sync::Arc;

use crate::audio::{Analyzer, AudioBackend, SampleTap, SourceAdapter, SourceError, SourceEvent, SourceState};
use crate::canvas::Canvas;
use crate::engine::{EngineError, RenderLoop, VisualizationEngine};
use crate::export::{self, ExportError, ExportFormat};
use crate::params::{AnalyzerConfig, ConfigError, ExportConfig, RenderConfig};
use crate::properties::{PropertyDescriptor, PropertyError, PropertyMap, PropertyValue};
use crate::visualization::AudioFrame;

/// Which source to start
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRequest {
    Microphone,
    /// Encoded audio file contents
    File(Vec<u8>),
}

pub struct AppContext {
    analyzer: Analyzer,
    /// Set once a source has activated; until then strategies see placeholder data
    analyzer_bound: bool,
    source: SourceAdapter,
    engine: VisualizationEngine,
    render_loop: RenderLoop,
    canvas: Canvas,
    export_config: ExportConfig,
    last_error: Option<String>,
}

impl AppContext {
    /// Validate configuration and build every subsystem
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        analyzer_config: AnalyzerConfig,
        render_config: &RenderConfig,
        export_config: ExportConfig,
    ) -> Result<Self, ConfigError> {
        analyzer_config.validate()?;
        render_config.validate()?;
        export_config.validate()?;

        let (width, height) = (render_config.window_width, render_config.window_height);
        let tap = SampleTap::new(analyzer_config.tap_capacity);

        Ok(Self {
            analyzer: Analyzer::new(analyzer_config, tap.clone()),
            analyzer_bound: false,
            source: SourceAdapter::new(backend, tap),
            engine: VisualizationEngine::new(width, height),
            render_loop: RenderLoop::new(),
            canvas: Canvas::new(width, height),
            export_config,
            last_error: None,
        })
    }

    /// Begin acquiring a source; activation is reported through `frame()`
    pub fn start(&mut self, request: SourceRequest) -> Result<(), SourceError> {
        let result = match request {
            SourceRequest::Microphone => self.source.start_microphone(),
            SourceRequest::File(bytes) => self.source.load_audio_file(bytes),
        };

        match &result {
            Ok(()) => self.last_error = None,
            Err(e) => self.report_error(e.to_string()),
        }
        result
    }

    /// Stop rendering and release the source
    pub fn stop(&mut self) {
        self.render_loop.stop();
        self.source.stop();
    }

    pub fn set_visualization(&mut self, name: &str) -> Result<(), EngineError> {
        self.engine.set_visualization(name)
    }

    pub fn clear_visualization(&mut self) {
        self.engine.clear_visualization();
    }

    /// Startup selection plus property overrides
    pub fn configure(
        &mut self,
        name: Option<&str>,
        overrides: &[(String, PropertyValue)],
    ) -> Result<(), EngineError> {
        self.engine.configure(name, overrides)
    }

    /// Update a property of the selected visualization
    pub fn update_property(&mut self, key: &str, value: PropertyValue) -> Result<(), PropertyError> {
        self.engine.update_property(key, &value)
    }

    pub fn get_properties(&self) -> PropertyMap {
        self.engine.properties()
    }

    pub fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        self.engine.describe_properties()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        log::debug!("Resize to {}x{}", width, height);
        self.canvas.resize(width, height);
        self.engine.resize(width, height);
    }

    /// Run one display refresh. Returns true when the canvas was redrawn.
    pub fn frame(&mut self) -> bool {
        while let Some(event) = self.source.poll() {
            match event {
                SourceEvent::Activated { kind, info } => {
                    log::info!("Source active: {} ({} @ {}Hz)", kind, info.device_name, info.sample_rate);
                    self.analyzer_bound = true;
                    self.last_error = None;
                    self.render_loop.start();
                }
                SourceEvent::Failed(e) => self.report_error(e.to_string()),
                SourceEvent::Finished => log::info!("Source finished"),
            }
        }

        if !self.render_loop.is_running() {
            return false;
        }

        self.analyzer.update();
        let audio = if self.analyzer_bound {
            AudioFrame::from_analyzer(&self.analyzer)
        } else {
            AudioFrame::placeholder()
        };
        self.render_loop
            .tick(&mut self.engine, &audio, &mut self.canvas)
    }

    /// Write the current canvas to the export directory
    pub fn export(&self, format: ExportFormat) -> Result<PathBuf, ExportError> {
        export::export_canvas(&self.canvas, format, &self.export_config)
    }

    /// Most recent user-facing error, cleared by the next successful start
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn source_state(&self) -> SourceState {
        self.source.state()
    }

    /// Mean spectrum level in percent (0 when silent)
    pub fn level_percent(&self) -> u8 {
        self.analyzer.level_percent()
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop.is_running()
    }

    pub fn engine(&self) -> &VisualizationEngine {
        &self.engine
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Surface a recoverable failure from outside the audio path
    pub fn report_error(&mut self, message: String) {
        log::warn!("{}", message);
        self.last_error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{DecodedClip, OpenedStream};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    /// Opens instantly; the microphone writes a burst of noise, playback
    /// writes the whole clip and reports completion straight away
    struct InstantBackend {
        fail: bool,
    }

    impl AudioBackend for InstantBackend {
        fn open_microphone(&self, tap: SampleTap) -> Result<OpenedStream, SourceError> {
            if self.fail {
                return Err(SourceError::DeviceAcquisition("permission denied".into()));
            }
            // Broadband noise from a small LCG
            let mut state = 0x2545_f491u32;
            let noise: Vec<f32> = (0..2048)
                .map(|_| {
                    state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
                })
                .collect();
            tap.push(&noise);
            Ok(OpenedStream {
                device_name: "test mic".into(),
                sample_rate: 48000,
                guard: Box::new(()),
            })
        }

        fn open_playback(
            &self,
            clip: Arc<DecodedClip>,
            tap: SampleTap,
            finished: Arc<AtomicBool>,
        ) -> Result<OpenedStream, SourceError> {
            tap.push(&clip.samples);
            finished.store(true, Ordering::Release);
            Ok(OpenedStream {
                device_name: "test speakers".into(),
                sample_rate: clip.sample_rate,
                guard: Box::new(()),
            })
        }
    }

    fn context(fail: bool) -> AppContext {
        let render = RenderConfig {
            window_width: 64,
            window_height: 48,
            initial_visualization: None,
        };
        AppContext::new(
            Arc::new(InstantBackend { fail }),
            AnalyzerConfig::default(),
            &render,
            ExportConfig::default(),
        )
        .unwrap()
    }

    /// Pump frames until `done` holds or a few seconds pass
    fn pump_until(app: &mut AppContext, done: impl Fn(&AppContext) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(app) {
            assert!(Instant::now() < deadline, "timed out");
            app.frame();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn wav_bytes() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(std::io::Cursor::new(&mut bytes), spec).unwrap();
            for i in 0..4000 {
                writer
                    .write_sample(((i as f32 * 0.2).sin() * 8000.0) as i16)
                    .unwrap();
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = AppContext::new(
            Arc::new(InstantBackend { fail: false }),
            AnalyzerConfig {
                fft_size: 1000,
                ..Default::default()
            },
            &RenderConfig::default(),
            ExportConfig::default(),
        );
        assert!(matches!(result, Err(ConfigError::FftSize(1000))));
    }

    #[test]
    fn test_no_frames_before_a_source_activates() {
        let mut app = context(false);
        app.set_visualization("spectrum").unwrap();
        assert!(!app.frame());
        assert!(!app.is_rendering());
    }

    #[test]
    fn test_microphone_start_begins_rendering() {
        let mut app = context(false);
        app.set_visualization("spectrum").unwrap();
        app.start(SourceRequest::Microphone).unwrap();

        pump_until(&mut app, |a| a.is_rendering());
        assert_eq!(app.source_state(), SourceState::MicrophoneActive);
        assert!(app.frame());
        assert!(app.level_percent() > 0);
        assert!(app.last_error().is_none());
    }

    #[test]
    fn test_second_start_reports_conflict() {
        let mut app = context(false);
        app.start(SourceRequest::Microphone).unwrap();

        let err = app.start(SourceRequest::Microphone).unwrap_err();
        assert_eq!(err, SourceError::Conflict);
        assert_eq!(app.last_error(), Some(SourceError::Conflict.to_string().as_str()));
    }

    #[test]
    fn test_device_failure_surfaces_as_last_error() {
        let mut app = context(true);
        app.start(SourceRequest::Microphone).unwrap();

        pump_until(&mut app, |a| a.last_error().is_some());
        assert!(app.last_error().unwrap_or_default().contains("permission denied"));
        assert_eq!(app.source_state(), SourceState::Idle);
        assert!(!app.is_rendering());
    }

    #[test]
    fn test_file_completion_keeps_loop_running() {
        let mut app = context(false);
        app.set_visualization("oscilloscope").unwrap();
        app.start(SourceRequest::File(wav_bytes())).unwrap();

        pump_until(&mut app, |a| a.is_rendering() && a.source_state() == SourceState::Idle);
        // Natural completion leaves rendering on; a new source may start
        assert!(app.frame());
        app.start(SourceRequest::Microphone).unwrap();
    }

    #[test]
    fn test_malformed_file_reports_decode_error() {
        let mut app = context(false);
        app.start(SourceRequest::File(b"not audio".to_vec())).unwrap();

        pump_until(&mut app, |a| a.last_error().is_some());
        assert!(app.last_error().unwrap_or_default().starts_with("could not decode audio"));
        assert_eq!(app.source_state(), SourceState::Idle);
    }

    #[test]
    fn test_stop_halts_rendering() {
        let mut app = context(false);
        app.start(SourceRequest::Microphone).unwrap();
        pump_until(&mut app, |a| a.is_rendering());

        app.stop();
        assert!(!app.is_rendering());
        assert_eq!(app.source_state(), SourceState::Idle);
        assert!(!app.frame());
    }

    #[test]
    fn test_property_surface() {
        let mut app = context(false);
        assert!(app.get_properties().is_empty());

        app.set_visualization("particles").unwrap();
        app.update_property("particleCount", PropertyValue::Number(20.0))
            .unwrap();
        assert_eq!(app.get_properties()["particleCount"], PropertyValue::Number(20.0));
        assert_eq!(app.describe_properties().len(), 10);
    }

    #[test]
    fn test_resize_ignores_zero() {
        let mut app = context(false);
        app.resize(0, 100);
        assert_eq!((app.canvas().width(), app.canvas().height()), (64, 48));
        app.resize(128, 96);
        assert_eq!((app.canvas().width(), app.canvas().height()), (128, 96));
    }
}
