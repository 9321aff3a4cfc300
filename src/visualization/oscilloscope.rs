//! Oscilloscope trace with a fading history of previous traces.

use std::collections::VecDeque;

use super::{paint_background, AudioFrame, Visualization, DEFAULT_BACKGROUND, DEFAULT_PRIMARY};
use crate::canvas::{self, Canvas};
use crate::properties::{
    property_map, HexColor, PropertyDescriptor, PropertyError, PropertyMap, PropertySet,
    PropertyValue,
};

/// Traces kept for the trail
pub const MAX_TRAIL_LENGTH: usize = 50;

/// Phosphor color used by the graticule and trail
const SCOPE_BLUE: HexColor = HexColor::rgb(76, 201, 240);
const HORIZONTAL_DIVISIONS: u32 = 8;
const VERTICAL_DIVISIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct OscilloscopeProperties {
    pub show_grid: bool,
    pub primary_color: HexColor,
    pub background_color: HexColor,
    pub audio_sensitivity: f64,
    pub line_width: f64,
    pub show_trail: bool,
    /// Graticule opacity (centre line is drawn at twice this)
    pub grid_intensity: f64,
}

impl Default for OscilloscopeProperties {
    fn default() -> Self {
        Self {
            show_grid: true,
            primary_color: DEFAULT_PRIMARY,
            background_color: DEFAULT_BACKGROUND,
            audio_sensitivity: 1.0,
            line_width: 2.0,
            show_trail: true,
            grid_intensity: 0.3,
        }
    }
}

const DESCRIPTORS: &[PropertyDescriptor] = &[
    PropertyDescriptor::flag("showGrid"),
    PropertyDescriptor::color("primaryColor"),
    PropertyDescriptor::color("backgroundColor"),
    PropertyDescriptor::number("audioSensitivity", 0.1, 3.0, 0.1),
    PropertyDescriptor::number("lineWidth", 1.0, 10.0, 1.0),
    PropertyDescriptor::flag("showTrail"),
    PropertyDescriptor::number("gridIntensity", 0.1, 1.0, 0.1),
];

impl PropertySet for OscilloscopeProperties {
    fn descriptors() -> &'static [PropertyDescriptor] {
        DESCRIPTORS
    }

    fn to_map(&self) -> PropertyMap {
        property_map([
            ("showGrid", PropertyValue::Bool(self.show_grid)),
            ("primaryColor", self.primary_color.into()),
            ("backgroundColor", self.background_color.into()),
            ("audioSensitivity", self.audio_sensitivity.into()),
            ("lineWidth", self.line_width.into()),
            ("showTrail", self.show_trail.into()),
            ("gridIntensity", self.grid_intensity.into()),
        ])
    }

    fn apply(&mut self, key: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match key {
            "showGrid" => self.show_grid = value.as_bool(key)?,
            "primaryColor" => self.primary_color = value.as_color(key)?,
            "backgroundColor" => self.background_color = value.as_color(key)?,
            "audioSensitivity" => self.audio_sensitivity = value.as_number(key)?,
            "lineWidth" => self.line_width = value.as_number(key)?,
            "showTrail" => self.show_trail = value.as_bool(key)?,
            "gridIntensity" => self.grid_intensity = value.as_number(key)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Screen-space points of one trace
pub type Trace = Vec<(f32, f32)>;

pub struct OscilloscopeVisualization {
    props: OscilloscopeProperties,
    /// Current trace in screen space
    trace: Trace,
    /// Oldest first
    trail: VecDeque<Trace>,
    width: f32,
    height: f32,
    frame_count: u64,
}

impl OscilloscopeVisualization {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            props: OscilloscopeProperties::default(),
            trace: Vec::new(),
            trail: VecDeque::with_capacity(MAX_TRAIL_LENGTH),
            width: width as f32,
            height: height as f32,
            frame_count: 0,
        }
    }

    pub fn trail(&self) -> &VecDeque<Trace> {
        &self.trail
    }

    fn build_trace(&self, samples: &[f32]) -> Trace {
        if samples.len() < 2 {
            return Vec::new();
        }
        let step = self.width / (samples.len() - 1) as f32;
        let centre = self.height / 2.0;
        let gain = centre * self.props.audio_sensitivity as f32;

        samples
            .iter()
            .enumerate()
            .map(|(i, &s)| (i as f32 * step, centre + s * gain))
            .collect()
    }

    fn draw_graticule(&self, canvas: &mut Canvas) {
        let (width, height) = canvas.size();
        let intensity = self.props.grid_intensity as f32;
        let faint = canvas::solid(SCOPE_BLUE.with_opacity(intensity));

        for i in 0..=HORIZONTAL_DIVISIONS {
            let y = height / HORIZONTAL_DIVISIONS as f32 * i as f32;
            canvas.line(0.0, y, width, y, &faint, 1.0);
        }

        let centre = canvas::solid(SCOPE_BLUE.with_opacity(intensity * 2.0));
        canvas.line(0.0, height / 2.0, width, height / 2.0, &centre, 1.0);

        for i in 0..=VERTICAL_DIVISIONS {
            let x = width / VERTICAL_DIVISIONS as f32 * i as f32;
            canvas.line(x, 0.0, x, height, &faint, 1.0);
        }
    }

    fn draw_trail(&self, canvas: &mut Canvas) {
        let len = self.trail.len() as f32;
        for (t, trace) in self.trail.iter().enumerate() {
            let opacity = t as f32 / len * 0.3;
            let paint = canvas::solid(SCOPE_BLUE.with_opacity(opacity));
            canvas.polyline(trace.iter().copied(), &paint, 1.0);
        }
    }
}

impl Visualization for OscilloscopeVisualization {
    fn name(&self) -> &'static str {
        "oscilloscope"
    }

    fn title(&self) -> &'static str {
        "Oscilloscope"
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update(&mut self, audio: &AudioFrame<'_>) {
        self.frame_count += 1;
        self.trace = self.build_trace(audio.waveform);

        if self.props.show_trail && !self.trace.is_empty() {
            if self.trail.len() == MAX_TRAIL_LENGTH {
                self.trail.pop_front();
            }
            self.trail.push_back(self.trace.clone());
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        paint_background(canvas, self.props.background_color, false);
        if self.props.show_grid {
            self.draw_graticule(canvas);
        }

        if self.trace.is_empty() {
            return;
        }

        if self.props.show_trail {
            self.draw_trail(canvas);
        }

        let paint = canvas::solid(self.props.primary_color.to_color());
        canvas.polyline(self.trace.iter().copied(), &paint, self.props.line_width as f32);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        // Old traces no longer line up with the new geometry
        self.trail.clear();
    }

    fn properties(&self) -> PropertyMap {
        self.props.to_map()
    }

    fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        if self.props.apply(key, value)? {
            log::debug!("oscilloscope: {} = {:?}", key, value);
        }
        Ok(())
    }

    fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        OscilloscopeProperties::descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: &[f32]) -> AudioFrame<'_> {
        AudioFrame {
            frequency: &[],
            waveform: samples,
            level: 0.0,
        }
    }

    #[test]
    fn test_trail_is_bounded_and_keeps_latest() {
        let mut vis = OscilloscopeVisualization::new(100, 100);

        for n in 0..60 {
            // Encode the frame number in the first sample
            let first = n as f32 / 100.0;
            vis.update(&frame(&[first, 0.0, 0.0]));
            assert!(vis.trail().len() <= MAX_TRAIL_LENGTH);
        }

        assert_eq!(vis.trail().len(), 50);
        let firsts: Vec<f32> = vis.trail().iter().map(|t| t[0].1).collect();
        let expected: Vec<f32> = (10..60).map(|n| 50.0 + n as f32 / 100.0 * 50.0).collect();
        for (got, want) in firsts.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-4);
        }
    }

    #[test]
    fn test_trail_disabled_keeps_history_empty() {
        let mut vis = OscilloscopeVisualization::new(100, 100);
        vis.update_property("showTrail", &false.into()).unwrap();
        for _ in 0..5 {
            vis.update(&AudioFrame::placeholder());
        }
        assert!(vis.trail().is_empty());
    }

    #[test]
    fn test_trace_geometry() {
        let mut vis = OscilloscopeVisualization::new(200, 100);
        vis.update(&frame(&[0.0, 1.0, -1.0]));
        assert_eq!(vis.trace, vec![(0.0, 50.0), (100.0, 100.0), (200.0, 0.0)]);
    }

    #[test]
    fn test_resize_drops_stale_trail() {
        let mut vis = OscilloscopeVisualization::new(100, 100);
        vis.update(&AudioFrame::placeholder());
        vis.resize(300, 200);
        assert!(vis.trail().is_empty());

        vis.update(&frame(&[0.0, 0.0]));
        assert_eq!(vis.trail()[0][1], (300.0, 100.0));
    }

    #[test]
    fn test_draws_graticule_by_default() {
        let mut vis = OscilloscopeVisualization::new(100, 80);
        vis.update(&AudioFrame::placeholder());
        let mut canvas = Canvas::new(100, 80);
        vis.draw(&mut canvas);

        // Top-left corner sits on both the first horizontal and vertical line
        let pixels = canvas.to_rgba8();
        assert!(pixels[2] > 0, "blue channel {}", pixels[2]);
    }
}
