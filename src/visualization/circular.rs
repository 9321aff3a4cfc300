//! Rotating radial spectrum.

use glam::Vec2;
use std::f32::consts::TAU;

use super::{paint_background, AudioFrame, Visualization, DEFAULT_BACKGROUND, DEFAULT_PRIMARY, DEFAULT_SECONDARY};
use crate::canvas::{self, Canvas};
use crate::properties::{
    property_map, HexColor, PropertyDescriptor, PropertyError, PropertyMap, PropertySet,
    PropertyValue,
};

/// Inner ring radius as a fraction of the outer radius
const INNER_RING: f32 = 0.3;
/// Centre disc radius as a fraction of the outer radius
const CENTRE_DISC: f32 = 0.25;
const BAR_STROKE: f32 = 3.0;
const END_DOT_RADIUS: f32 = 2.0;
/// Hard ceiling on drawn spokes
pub const MAX_BARS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct CircularProperties {
    pub show_grid: bool,
    pub primary_color: HexColor,
    pub secondary_color: HexColor,
    pub background_color: HexColor,
    pub audio_sensitivity: f64,
    /// Hundredths of a radian per frame
    pub rotation_speed: f64,
    pub bar_count: f64,
}

impl Default for CircularProperties {
    fn default() -> Self {
        Self {
            show_grid: false,
            primary_color: DEFAULT_PRIMARY,
            secondary_color: DEFAULT_SECONDARY,
            background_color: DEFAULT_BACKGROUND,
            audio_sensitivity: 1.0,
            rotation_speed: 0.5,
            bar_count: 64.0,
        }
    }
}

const DESCRIPTORS: &[PropertyDescriptor] = &[
    PropertyDescriptor::flag("showGrid"),
    PropertyDescriptor::color("primaryColor"),
    PropertyDescriptor::color("secondaryColor"),
    PropertyDescriptor::color("backgroundColor"),
    PropertyDescriptor::number("audioSensitivity", 0.1, 3.0, 0.1),
    PropertyDescriptor::number("rotationSpeed", 0.0, 5.0, 0.1),
    PropertyDescriptor::number("barCount", 16.0, 128.0, 8.0),
];

impl PropertySet for CircularProperties {
    fn descriptors() -> &'static [PropertyDescriptor] {
        DESCRIPTORS
    }

    fn to_map(&self) -> PropertyMap {
        property_map([
            ("showGrid", PropertyValue::Bool(self.show_grid)),
            ("primaryColor", self.primary_color.into()),
            ("secondaryColor", self.secondary_color.into()),
            ("backgroundColor", self.background_color.into()),
            ("audioSensitivity", self.audio_sensitivity.into()),
            ("rotationSpeed", self.rotation_speed.into()),
            ("barCount", self.bar_count.into()),
        ])
    }

    fn apply(&mut self, key: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match key {
            "showGrid" => self.show_grid = value.as_bool(key)?,
            "primaryColor" => self.primary_color = value.as_color(key)?,
            "secondaryColor" => self.secondary_color = value.as_color(key)?,
            "backgroundColor" => self.background_color = value.as_color(key)?,
            "audioSensitivity" => self.audio_sensitivity = value.as_number(key)?,
            "rotationSpeed" => self.rotation_speed = value.as_number(key)?,
            "barCount" => self.bar_count = value.as_number(key)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// A single radial bar: start on the inner ring, end further out
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Spoke {
    pub start: Vec2,
    pub end: Vec2,
}

pub struct CircularVisualization {
    props: CircularProperties,
    frequency: Vec<u8>,
    /// Accumulated rotation in radians
    rotation: f32,
    frame_count: u64,
}

impl CircularVisualization {
    pub fn new() -> Self {
        Self {
            props: CircularProperties::default(),
            frequency: Vec::new(),
            rotation: 0.0,
            frame_count: 0,
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Spoke geometry for the current data around `centre`
    pub(crate) fn spokes(&self, centre: Vec2) -> Vec<Spoke> {
        let len = self.frequency.len();
        let bar_count = (self.props.bar_count.max(0.0) as usize).min(MAX_BARS);
        if len == 0 || bar_count == 0 {
            return Vec::new();
        }

        let radius = centre.x.min(centre.y) * 0.8;
        let inner = radius * INNER_RING;
        let angle_step = TAU / bar_count as f32;
        let sensitivity = self.props.audio_sensitivity as f32;

        (0..bar_count)
            .map(|i| {
                let angle = i as f32 * angle_step + self.rotation;
                let index = (i as f32 / bar_count as f32 * len as f32).floor() as usize;
                let intensity = self.frequency[index.min(len - 1)] as f32 / 255.0 * sensitivity;
                let direction = Vec2::from_angle(angle);

                Spoke {
                    start: centre + direction * inner,
                    end: centre + direction * (inner + radius * intensity),
                }
            })
            .collect()
    }
}

impl Default for CircularVisualization {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualization for CircularVisualization {
    fn name(&self) -> &'static str {
        "circular"
    }

    fn title(&self) -> &'static str {
        "Circular Spectrum"
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update(&mut self, audio: &AudioFrame<'_>) {
        self.frame_count += 1;
        self.frequency.clear();
        self.frequency.extend_from_slice(audio.frequency);
        self.rotation += self.props.rotation_speed as f32 * 0.01;
    }

    fn draw(&self, canvas: &mut Canvas) {
        let props = &self.props;
        paint_background(canvas, props.background_color, props.show_grid);

        if self.frequency.is_empty() {
            return;
        }

        let (width, height) = canvas.size();
        let centre = Vec2::new(width / 2.0, height / 2.0);
        let radius = centre.x.min(centre.y) * 0.8;
        let primary = props.primary_color.to_color();
        let dot = canvas::solid(primary);

        for spoke in self.spokes(centre) {
            let paint = canvas::linear_gradient(
                spoke.start.x,
                spoke.start.y,
                spoke.end.x,
                spoke.end.y,
                primary,
                props.secondary_color.to_color(),
            );
            canvas.line(spoke.start.x, spoke.start.y, spoke.end.x, spoke.end.y, &paint, BAR_STROKE);
            canvas.fill_circle(spoke.end.x, spoke.end.y, END_DOT_RADIUS, &dot);
        }

        let disc = radius * CENTRE_DISC;
        canvas.fill_circle(centre.x, centre.y, disc, &canvas::solid(props.background_color.to_color()));
        canvas.stroke_circle(centre.x, centre.y, disc, &dot, 2.0);
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn properties(&self) -> PropertyMap {
        self.props.to_map()
    }

    fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        if self.props.apply(key, value)? {
            log::debug!("circular: {} = {:?}", key, value);
        }
        Ok(())
    }

    fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        CircularProperties::descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(data: &[u8]) -> AudioFrame<'_> {
        AudioFrame {
            frequency: data,
            waveform: &[],
            level: 0.0,
        }
    }

    #[test]
    fn test_rotation_advances_per_update() {
        let mut vis = CircularVisualization::new();
        vis.update(&AudioFrame::placeholder());
        vis.update(&AudioFrame::placeholder());
        assert!((vis.rotation() - 0.01).abs() < 1e-6);

        vis.update_property("rotationSpeed", &PropertyValue::Number(0.0))
            .unwrap();
        vis.update(&AudioFrame::placeholder());
        assert!((vis.rotation() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_spoke_geometry() {
        let mut vis = CircularVisualization::new();
        vis.update_property("rotationSpeed", &PropertyValue::Number(0.0))
            .unwrap();
        vis.update_property("barCount", &PropertyValue::Number(4.0))
            .unwrap();
        vis.update(&frame(&[255, 0, 0, 0]));

        // radius = 100 * 0.8 = 80, inner ring at 24
        let spokes = vis.spokes(Vec2::new(100.0, 100.0));
        assert_eq!(spokes.len(), 4);
        assert!((spokes[0].start - Vec2::new(124.0, 100.0)).length() < 1e-3);
        assert!((spokes[0].end - Vec2::new(204.0, 100.0)).length() < 1e-3);
        // Silent bins collapse onto the inner ring
        assert!((spokes[1].start - spokes[1].end).length() < 1e-3);
        assert!((spokes[1].start - Vec2::new(100.0, 124.0)).length() < 1e-3);
    }

    #[test]
    fn test_bar_count_samples_across_spectrum() {
        let mut vis = CircularVisualization::new();
        vis.update_property("barCount", &PropertyValue::Number(16.0))
            .unwrap();
        vis.update(&frame(&[128; 1024]));
        assert_eq!(vis.spokes(Vec2::new(50.0, 50.0)).len(), 16);
    }

    #[test]
    fn test_huge_bar_count_is_capped() {
        let mut vis = CircularVisualization::new();
        vis.update_property("barCount", &PropertyValue::Number(1e18))
            .unwrap();
        vis.update(&frame(&[128; 256]));
        assert_eq!(vis.spokes(Vec2::new(50.0, 50.0)).len(), MAX_BARS);

        let mut canvas = Canvas::new(100, 100);
        vis.draw(&mut canvas);
    }

    #[test]
    fn test_infinite_bar_count_rejected() {
        let mut vis = CircularVisualization::new();
        let inf: PropertyValue = "inf".parse().unwrap();
        assert!(matches!(
            vis.update_property("barCount", &inf),
            Err(PropertyError::NotFinite { .. })
        ));
        assert_eq!(vis.properties()["barCount"], PropertyValue::Number(64.0));

        vis.update(&frame(&[128; 256]));
        let mut canvas = Canvas::new(100, 100);
        vis.draw(&mut canvas);
        assert_eq!(vis.spokes(Vec2::new(50.0, 50.0)).len(), 64);
    }

    #[test]
    fn test_draws_centre_disc_in_background() {
        let mut vis = CircularVisualization::new();
        vis.update(&frame(&[255; 256]));
        let mut canvas = Canvas::new(200, 200);
        vis.draw(&mut canvas);

        let pixels = canvas.to_rgba8();
        let centre = (100 * 200 + 100) * 4;
        assert_eq!(&pixels[centre..centre + 4], &[0, 0, 0, 255]);
    }
}
