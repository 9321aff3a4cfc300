//! Pluggable visualization strategies.
//!
//! Each strategy reads one `AudioFrame` per tick in `update()`, advances its
//! own simulation state, and renders a full frame in `draw()`. `draw()` takes
//! `&self`, so rendering can never mutate state or snapshot data.

mod circular;
mod oscilloscope;
mod particles;
mod spectrum;
mod waveform;

pub use circular::CircularVisualization;
pub use oscilloscope::OscilloscopeVisualization;
pub use particles::ParticleVisualization;
pub use spectrum::{ColorMode, SpectrumVisualization};
pub use waveform::WaveformVisualization;

use crate::audio::Analyzer;
use crate::canvas::{self, Canvas};
use crate::params::audio_constants::PLACEHOLDER_LEN;
use crate::properties::{HexColor, PropertyDescriptor, PropertyError, PropertyMap, PropertyValue};

/// Registry names, in keyboard-shortcut order (1-5)
pub const VISUALIZATION_NAMES: [&str; 5] =
    ["spectrum", "waveform", "particles", "circular", "oscilloscope"];

/// Default colors shared by all strategies
pub const DEFAULT_PRIMARY: HexColor = HexColor::rgb(0x4c, 0xf0, 0x54);
pub const DEFAULT_SECONDARY: HexColor = HexColor::rgb(0x4c, 0xc0, 0xf0);
pub const DEFAULT_BACKGROUND: HexColor = HexColor::rgb(0, 0, 0);

/// Level assumed when no analyzer is bound
pub const PLACEHOLDER_LEVEL: f32 = 0.5;

static SILENT_FREQUENCY: [u8; PLACEHOLDER_LEN] = [0; PLACEHOLDER_LEN];
static SILENT_WAVEFORM: [f32; PLACEHOLDER_LEN] = [0.0; PLACEHOLDER_LEN];

/// One frame's worth of analysis data, borrowed from the analyzer
#[derive(Debug, Clone, Copy)]
pub struct AudioFrame<'a> {
    /// Bin magnitudes (0-255)
    pub frequency: &'a [u8],
    /// Time-domain samples (-1..1)
    pub waveform: &'a [f32],
    /// Peak level normalized to 0-1
    pub level: f32,
}

impl AudioFrame<'static> {
    /// Zero-filled data used when no analyzer is bound
    pub fn placeholder() -> Self {
        Self {
            frequency: &SILENT_FREQUENCY,
            waveform: &SILENT_WAVEFORM,
            level: PLACEHOLDER_LEVEL,
        }
    }
}

impl<'a> AudioFrame<'a> {
    /// Borrow the analyzer's current snapshots
    pub fn from_analyzer(analyzer: &'a Analyzer) -> Self {
        Self {
            frequency: analyzer.frequency_snapshot(),
            waveform: analyzer.waveform_snapshot(),
            level: analyzer.normalized_level(),
        }
    }
}

/// A single visual rendering algorithm
pub trait Visualization {
    /// Registry key (e.g. "spectrum")
    fn name(&self) -> &'static str;

    /// Human-readable title
    fn title(&self) -> &'static str;

    /// Number of `update()` calls so far
    fn frame_count(&self) -> u64;

    /// Advance one frame using this tick's audio data
    fn update(&mut self, audio: &AudioFrame<'_>);

    /// Render the full frame
    fn draw(&self, canvas: &mut Canvas);

    /// Adapt internal geometry to a new canvas size
    fn resize(&mut self, width: u32, height: u32);

    /// Snapshot of all declared properties
    fn properties(&self) -> PropertyMap;

    /// Set one property; undeclared keys are ignored
    fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError>;

    /// Declared properties with UI hints
    fn describe_properties(&self) -> &'static [PropertyDescriptor];
}

/// Build one instance of every strategy, sized for `width` x `height`
pub fn create_all(width: u32, height: u32) -> Vec<Box<dyn Visualization>> {
    vec![
        Box::new(SpectrumVisualization::new()),
        Box::new(WaveformVisualization::new()),
        Box::new(ParticleVisualization::new(width, height)),
        Box::new(CircularVisualization::new()),
        Box::new(OscilloscopeVisualization::new(width, height)),
    ]
}

/// Fill the background and optionally overlay the standard grid
pub(crate) fn paint_background(canvas: &mut Canvas, background: HexColor, show_grid: bool) {
    canvas.clear();
    canvas.fill(background.to_color());
    if show_grid {
        canvas::draw_grid(canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PropertyKind;

    /// A value of the descriptor's kind that differs from the default
    fn sample_value(descriptor: &PropertyDescriptor, current: &PropertyValue) -> PropertyValue {
        match descriptor.kind {
            PropertyKind::Number => PropertyValue::Number(current.as_number("").unwrap_or(0.0) + 0.1),
            PropertyKind::Bool => PropertyValue::Bool(!current.as_bool("").unwrap_or(false)),
            PropertyKind::Color => PropertyValue::Color(HexColor::rgb(0x12, 0x34, 0x56)),
            PropertyKind::Choice => PropertyValue::Choice(descriptor.choices[descriptor.choices.len() - 1].into()),
        }
    }

    #[test]
    fn test_registry_names_match() {
        let all = create_all(320, 240);
        let names: Vec<_> = all.iter().map(|v| v.name()).collect();
        assert_eq!(names, VISUALIZATION_NAMES);
    }

    #[test]
    fn test_properties_round_trip_for_every_strategy() {
        for mut vis in create_all(320, 240) {
            for descriptor in vis.describe_properties() {
                let current = vis.properties()[descriptor.key].clone();
                let value = sample_value(descriptor, &current);

                vis.update_property(descriptor.key, &value).unwrap();
                assert_eq!(
                    vis.properties()[descriptor.key],
                    value,
                    "{}.{}",
                    vis.name(),
                    descriptor.key
                );
            }
        }
    }

    #[test]
    fn test_descriptors_cover_properties() {
        for vis in create_all(320, 240) {
            let mut keys: Vec<_> = vis.describe_properties().iter().map(|d| d.key).collect();
            keys.sort_unstable();
            let props = vis.properties();
            let mut prop_keys: Vec<_> = props.keys().map(String::as_str).collect();
            prop_keys.sort_unstable();
            assert_eq!(keys, prop_keys, "{}", vis.name());
        }
    }

    #[test]
    fn test_undeclared_key_is_ignored() {
        for mut vis in create_all(320, 240) {
            let before = vis.properties();
            vis.update_property("notAProperty", &PropertyValue::Number(1.0))
                .unwrap();
            assert_eq!(vis.properties(), before);
            assert!(!vis.properties().contains_key("notAProperty"));
        }
    }

    #[test]
    fn test_wrong_kind_is_rejected_and_keeps_value() {
        for mut vis in create_all(320, 240) {
            let before = vis.properties();
            let result = vis.update_property("audioSensitivity", &PropertyValue::Bool(true));
            assert!(matches!(result, Err(PropertyError::TypeMismatch { .. })));
            assert_eq!(vis.properties(), before);
        }
    }

    #[test]
    fn test_every_strategy_survives_placeholder_frames() {
        let mut canvas = Canvas::new(160, 120);
        for mut vis in create_all(160, 120) {
            for _ in 0..3 {
                vis.update(&AudioFrame::placeholder());
                vis.draw(&mut canvas);
            }
            assert_eq!(vis.frame_count(), 3);
        }
    }

    #[test]
    fn test_every_strategy_survives_empty_frames() {
        let mut canvas = Canvas::new(160, 120);
        let empty = AudioFrame {
            frequency: &[],
            waveform: &[],
            level: 0.0,
        };
        for mut vis in create_all(160, 120) {
            vis.update(&empty);
            vis.draw(&mut canvas);
        }
    }
}
