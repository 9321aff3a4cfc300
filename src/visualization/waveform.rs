//! Time-domain waveform as a single line.

use tiny_skia::PathBuilder;

use super::{paint_background, AudioFrame, Visualization, DEFAULT_BACKGROUND, DEFAULT_PRIMARY};
use crate::canvas::{self, Canvas};
use crate::properties::{
    property_map, HexColor, PropertyDescriptor, PropertyError, PropertyMap, PropertySet,
    PropertyValue,
};

#[derive(Debug, Clone, PartialEq)]
pub struct WaveformProperties {
    pub line_width: f64,
    pub show_grid: bool,
    /// Join samples with quadratic curves instead of straight segments
    pub smoothing: bool,
    pub primary_color: HexColor,
    pub background_color: HexColor,
    pub audio_sensitivity: f64,
}

impl Default for WaveformProperties {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            show_grid: false,
            smoothing: true,
            primary_color: DEFAULT_PRIMARY,
            background_color: DEFAULT_BACKGROUND,
            audio_sensitivity: 1.0,
        }
    }
}

const DESCRIPTORS: &[PropertyDescriptor] = &[
    PropertyDescriptor::number("lineWidth", 1.0, 10.0, 1.0),
    PropertyDescriptor::flag("showGrid"),
    PropertyDescriptor::flag("smoothing"),
    PropertyDescriptor::color("primaryColor"),
    PropertyDescriptor::color("backgroundColor"),
    PropertyDescriptor::number("audioSensitivity", 0.1, 3.0, 0.1),
];

impl PropertySet for WaveformProperties {
    fn descriptors() -> &'static [PropertyDescriptor] {
        DESCRIPTORS
    }

    fn to_map(&self) -> PropertyMap {
        property_map([
            ("lineWidth", PropertyValue::Number(self.line_width)),
            ("showGrid", self.show_grid.into()),
            ("smoothing", self.smoothing.into()),
            ("primaryColor", self.primary_color.into()),
            ("backgroundColor", self.background_color.into()),
            ("audioSensitivity", self.audio_sensitivity.into()),
        ])
    }

    fn apply(&mut self, key: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match key {
            "lineWidth" => self.line_width = value.as_number(key)?,
            "showGrid" => self.show_grid = value.as_bool(key)?,
            "smoothing" => self.smoothing = value.as_bool(key)?,
            "primaryColor" => self.primary_color = value.as_color(key)?,
            "backgroundColor" => self.background_color = value.as_color(key)?,
            "audioSensitivity" => self.audio_sensitivity = value.as_number(key)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Vertical positions of each sample, centred on `height / 2`
pub(crate) fn plot_points(samples: &[f32], height: f32, sensitivity: f64) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| s * height * sensitivity as f32 / 2.0 + height / 2.0)
        .collect()
}

pub struct WaveformVisualization {
    props: WaveformProperties,
    waveform: Vec<f32>,
    frame_count: u64,
}

impl WaveformVisualization {
    pub fn new() -> Self {
        Self {
            props: WaveformProperties::default(),
            waveform: Vec::new(),
            frame_count: 0,
        }
    }
}

impl Default for WaveformVisualization {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualization for WaveformVisualization {
    fn name(&self) -> &'static str {
        "waveform"
    }

    fn title(&self) -> &'static str {
        "Waveform"
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update(&mut self, audio: &AudioFrame<'_>) {
        self.frame_count += 1;
        self.waveform.clear();
        self.waveform.extend_from_slice(audio.waveform);
    }

    fn draw(&self, canvas: &mut Canvas) {
        let props = &self.props;
        paint_background(canvas, props.background_color, props.show_grid);

        // A line needs two points
        if self.waveform.len() < 2 {
            return;
        }

        let (width, height) = canvas.size();
        let step = width / (self.waveform.len() - 1) as f32;
        let ys = plot_points(&self.waveform, height, props.audio_sensitivity);

        let mut pb = PathBuilder::new();
        pb.move_to(0.0, ys[0]);
        for (i, pair) in ys.windows(2).enumerate() {
            let (prev_y, y) = (pair[0], pair[1]);
            let prev_x = i as f32 * step;
            let x = (i + 1) as f32 * step;

            if props.smoothing {
                pb.quad_to((prev_x + x) / 2.0, prev_y, x, y);
            } else {
                pb.line_to(x, y);
            }
        }

        if let Some(path) = pb.finish() {
            let paint = canvas::solid(props.primary_color.to_color());
            canvas.stroke_path(&path, &paint, props.line_width as f32);
        }
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn properties(&self) -> PropertyMap {
        self.props.to_map()
    }

    fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        if self.props.apply(key, value)? {
            log::debug!("waveform: {} = {:?}", key, value);
        }
        Ok(())
    }

    fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        WaveformProperties::descriptors()
    }
}
