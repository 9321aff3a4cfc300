//! Frequency spectrum as vertical bars.

use std::fmt;
use std::str::FromStr;

use super::{paint_background, AudioFrame, Visualization, DEFAULT_BACKGROUND, DEFAULT_PRIMARY, DEFAULT_SECONDARY};
use crate::canvas::{self, Canvas};
use crate::properties::{
    property_map, HexColor, PropertyDescriptor, PropertyError, PropertyMap, PropertySet,
    PropertyValue,
};

/// How bars are colored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Hue sweeps across the spectrum
    #[default]
    Hue,
    /// Vertical primary → secondary gradient per bar
    Gradient,
    /// Primary color only
    Solid,
}

impl ColorMode {
    pub const CHOICES: &'static [&'static str] = &["hue", "gradient", "solid"];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorMode::Hue => "hue",
            ColorMode::Gradient => "gradient",
            ColorMode::Solid => "solid",
        }
    }
}

impl FromStr for ColorMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hue" => Ok(ColorMode::Hue),
            "gradient" => Ok(ColorMode::Gradient),
            "solid" => Ok(ColorMode::Solid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumProperties {
    /// Bar width as a multiple of the per-bin slot width
    pub bar_width: f64,
    pub show_grid: bool,
    pub color_mode: ColorMode,
    pub primary_color: HexColor,
    pub secondary_color: HexColor,
    pub background_color: HexColor,
    pub audio_sensitivity: f64,
}

impl Default for SpectrumProperties {
    fn default() -> Self {
        Self {
            bar_width: 2.0,
            show_grid: false,
            color_mode: ColorMode::Hue,
            primary_color: DEFAULT_PRIMARY,
            secondary_color: DEFAULT_SECONDARY,
            background_color: DEFAULT_BACKGROUND,
            audio_sensitivity: 1.0,
        }
    }
}

const DESCRIPTORS: &[PropertyDescriptor] = &[
    PropertyDescriptor::number("barWidth", 1.0, 10.0, 1.0),
    PropertyDescriptor::flag("showGrid"),
    PropertyDescriptor::choice("colorMode", ColorMode::CHOICES),
    PropertyDescriptor::color("primaryColor"),
    PropertyDescriptor::color("secondaryColor"),
    PropertyDescriptor::color("backgroundColor"),
    PropertyDescriptor::number("audioSensitivity", 0.1, 3.0, 0.1),
];

impl PropertySet for SpectrumProperties {
    fn descriptors() -> &'static [PropertyDescriptor] {
        DESCRIPTORS
    }

    fn to_map(&self) -> PropertyMap {
        property_map([
            ("barWidth", PropertyValue::Number(self.bar_width)),
            ("showGrid", self.show_grid.into()),
            ("colorMode", self.color_mode.as_str().into()),
            ("primaryColor", self.primary_color.into()),
            ("secondaryColor", self.secondary_color.into()),
            ("backgroundColor", self.background_color.into()),
            ("audioSensitivity", self.audio_sensitivity.into()),
        ])
    }

    fn apply(&mut self, key: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match key {
            "barWidth" => self.bar_width = value.as_number(key)?,
            "showGrid" => self.show_grid = value.as_bool(key)?,
            "colorMode" => {
                let choice = value.as_choice(key)?;
                self.color_mode = choice.parse().map_err(|_| PropertyError::InvalidChoice {
                    key: key.to_string(),
                    value: choice.to_string(),
                    choices: ColorMode::CHOICES,
                })?;
            }
            "primaryColor" => self.primary_color = value.as_color(key)?,
            "secondaryColor" => self.secondary_color = value.as_color(key)?,
            "backgroundColor" => self.background_color = value.as_color(key)?,
            "audioSensitivity" => self.audio_sensitivity = value.as_number(key)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Bar height for one magnitude on a canvas `height` pixels tall
pub(crate) fn bar_height(magnitude: u8, sensitivity: f64, height: f32) -> f32 {
    (magnitude as f32 / 255.0) * sensitivity as f32 * height
}

/// Left edge and drawn width of bar `index` of `len` across `width` pixels.
/// The width comes out negative once a slot is narrower than one pixel.
pub(crate) fn bar_span(index: usize, len: usize, width: f32, bar_width: f64) -> (f32, f32) {
    let slot = width / len as f32;
    (index as f32 * slot, bar_width as f32 * slot - 1.0)
}

/// One bar per frequency bin, growing from the bottom edge
pub struct SpectrumVisualization {
    props: SpectrumProperties,
    frequency: Vec<u8>,
    frame_count: u64,
}

impl SpectrumVisualization {
    pub fn new() -> Self {
        Self {
            props: SpectrumProperties::default(),
            frequency: Vec::new(),
            frame_count: 0,
        }
    }
}

impl Default for SpectrumVisualization {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualization for SpectrumVisualization {
    fn name(&self) -> &'static str {
        "spectrum"
    }

    fn title(&self) -> &'static str {
        "Frequency Spectrum"
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update(&mut self, audio: &AudioFrame<'_>) {
        self.frame_count += 1;
        self.frequency.clear();
        self.frequency.extend_from_slice(audio.frequency);
    }

    fn draw(&self, canvas: &mut Canvas) {
        let props = &self.props;
        paint_background(canvas, props.background_color, props.show_grid);

        let len = self.frequency.len();
        if len == 0 {
            return;
        }

        let (width, height) = canvas.size();

        for (i, &magnitude) in self.frequency.iter().enumerate() {
            let bar = bar_height(magnitude, props.audio_sensitivity, height);
            let (x, drawn_width) = bar_span(i, len, width, props.bar_width);
            let y = height - bar;

            let paint = match props.color_mode {
                ColorMode::Solid => canvas::solid(props.primary_color.to_color()),
                ColorMode::Gradient => canvas::linear_gradient(
                    0.0,
                    y,
                    0.0,
                    height,
                    props.primary_color.to_color(),
                    props.secondary_color.to_color(),
                ),
                ColorMode::Hue => canvas::solid(canvas::hsl(i as f32 / len as f32 * 360.0, 1.0, 0.5)),
            };

            canvas.fill_rect(x, y, drawn_width, bar, &paint);
        }
    }

    fn resize(&mut self, _width: u32, _height: u32) {}

    fn properties(&self) -> PropertyMap {
        self.props.to_map()
    }

    fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        if self.props.apply(key, value)? {
            log::debug!("spectrum: {} = {:?}", key, value);
        }
        Ok(())
    }

    fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        SpectrumProperties::descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_height_for_mid_magnitude() {
        let height = bar_height(128, 1.0, 200.0);
        assert!((height - 100.39).abs() < 0.01, "got {}", height);
    }

    #[test]
    fn test_full_spectrum_snapshot_bars() {
        let data = vec![128u8; 1024];
        let frame = AudioFrame {
            frequency: &data,
            waveform: &[],
            level: 0.0,
        };
        let mut vis = SpectrumVisualization::new();
        vis.update(&frame);
        assert_eq!(vis.frequency.len(), 1024);

        vis.update_property("colorMode", &"solid".into()).unwrap();
        let mut canvas = Canvas::new(2048, 200);
        vis.draw(&mut canvas);

        // Bars reach roughly half way up; the top stays background
        let pixels = canvas.to_rgba8();
        let at = |x: usize, y: usize| &pixels[(y * 2048 + x) * 4..(y * 2048 + x) * 4 + 3];
        assert_eq!(at(0, 150), &[0x4c, 0xf0, 0x54]);
        assert_eq!(at(0, 50), &[0, 0, 0]);
    }

    fn solid_spectrum(data: &[u8], bar_width: f64, width: u32, height: u32) -> Vec<u8> {
        let mut vis = SpectrumVisualization::new();
        vis.update(&AudioFrame {
            frequency: data,
            waveform: &[],
            level: 0.0,
        });
        vis.update_property("colorMode", &"solid".into()).unwrap();
        vis.update_property("barWidth", &PropertyValue::Number(bar_width))
            .unwrap();
        let mut canvas = Canvas::new(width, height);
        vis.draw(&mut canvas);
        canvas.to_rgba8()
    }

    #[test]
    fn test_bar_span_geometry() {
        // 256 bins over 1024 px: 4 px slots
        assert_eq!(bar_span(0, 256, 1024.0, 1.0), (0.0, 3.0));
        assert_eq!(bar_span(10, 256, 1024.0, 1.0), (40.0, 3.0));
        assert_eq!(bar_span(10, 256, 1024.0, 2.0), (40.0, 7.0));
        assert_eq!(bar_span(255, 256, 1024.0, 10.0), (1020.0, 39.0));

        // Sub-pixel slots give a negative drawn width
        let (x, w) = bar_span(512, 1024, 800.0, 1.0);
        assert!((x - 400.0).abs() < 1e-4);
        assert!((w + 0.21875).abs() < 1e-4);
    }

    #[test]
    fn test_bars_leave_one_pixel_gap() {
        let pixels = solid_spectrum(&[255; 256], 1.0, 1024, 100);
        let at = |x: usize| &pixels[(50 * 1024 + x) * 4..(50 * 1024 + x) * 4 + 3];
        assert_eq!(at(0), &[0x4c, 0xf0, 0x54]);
        assert_eq!(at(2), &[0x4c, 0xf0, 0x54]);
        assert_eq!(at(3), &[0, 0, 0]);
        assert_eq!(at(4), &[0x4c, 0xf0, 0x54]);
    }

    #[test]
    fn test_wide_bars_overlap_neighbours() {
        // barWidth 2 spans 7 px, covering the gap of the next slot
        let pixels = solid_spectrum(&[255; 256], 2.0, 1024, 100);
        let at = |x: usize| &pixels[(50 * 1024 + x) * 4..(50 * 1024 + x) * 4 + 3];
        assert_eq!(at(3), &[0x4c, 0xf0, 0x54]);
        assert_eq!(at(6), &[0x4c, 0xf0, 0x54]);
    }

    #[test]
    fn test_more_bins_than_pixels_still_draws() {
        let pixels = solid_spectrum(&[255; 1024], 1.0, 800, 200);
        let lit = |range: std::ops::Range<usize>| {
            range
                .filter(|x| pixels[(100 * 800 + x) * 4 + 1] > 0)
                .count()
        };
        assert!(lit(0..400) > 0);
        assert!(lit(400..800) > 0);
    }

    #[test]
    fn test_invalid_color_mode_is_rejected() {
        let mut vis = SpectrumVisualization::new();
        let result = vis.update_property("colorMode", &"rainbow".into());
        assert!(matches!(result, Err(PropertyError::InvalidChoice { .. })));
        assert_eq!(vis.properties()["colorMode"], PropertyValue::from("hue"));
    }

    #[test]
    fn test_sensitivity_scales_bars() {
        assert!((bar_height(255, 2.0, 100.0) - 200.0).abs() < 1e-4);
        assert_eq!(bar_height(0, 3.0, 100.0), 0.0);
    }
}
