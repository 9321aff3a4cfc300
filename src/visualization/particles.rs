//! Audio-driven particle field with proximity connections.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{paint_background, AudioFrame, Visualization, DEFAULT_BACKGROUND, DEFAULT_PRIMARY, DEFAULT_SECONDARY};
use crate::canvas::{self, Canvas};
use crate::properties::{
    property_map, HexColor, PropertyDescriptor, PropertyError, PropertyMap, PropertySet,
    PropertyValue,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ParticleProperties {
    pub particle_count: f64,
    /// Speed limit in pixels per frame before the audio boost
    pub max_speed: f64,
    pub show_grid: bool,
    /// Pixels within which two particles are joined
    pub connection_distance: f64,
    pub show_connections: bool,
    /// Upper bound of the random extra radius
    pub particle_size: f64,
    pub primary_color: HexColor,
    pub background_color: HexColor,
    pub connection_color: HexColor,
    pub audio_sensitivity: f64,
}

impl Default for ParticleProperties {
    fn default() -> Self {
        Self {
            particle_count: 50.0,
            max_speed: 2.0,
            show_grid: false,
            connection_distance: 100.0,
            show_connections: true,
            particle_size: 3.0,
            primary_color: DEFAULT_PRIMARY,
            background_color: DEFAULT_BACKGROUND,
            connection_color: DEFAULT_SECONDARY,
            audio_sensitivity: 1.0,
        }
    }
}

/// Hard ceiling on live particles; connections cost O(n²) per frame
pub const MAX_PARTICLES: usize = 1000;

impl ParticleProperties {
    fn count(&self) -> usize {
        (self.particle_count.max(0.0) as usize).min(MAX_PARTICLES)
    }
}

const DESCRIPTORS: &[PropertyDescriptor] = &[
    PropertyDescriptor::number("particleCount", 10.0, 200.0, 10.0),
    PropertyDescriptor::number("maxSpeed", 1.0, 10.0, 0.5),
    PropertyDescriptor::flag("showGrid"),
    PropertyDescriptor::number("connectionDistance", 50.0, 200.0, 10.0),
    PropertyDescriptor::flag("showConnections"),
    PropertyDescriptor::number("particleSize", 1.0, 10.0, 1.0),
    PropertyDescriptor::color("primaryColor"),
    PropertyDescriptor::color("backgroundColor"),
    PropertyDescriptor::color("connectionColor"),
    PropertyDescriptor::number("audioSensitivity", 0.1, 3.0, 0.1),
];

impl PropertySet for ParticleProperties {
    fn descriptors() -> &'static [PropertyDescriptor] {
        DESCRIPTORS
    }

    fn to_map(&self) -> PropertyMap {
        property_map([
            ("particleCount", PropertyValue::Number(self.particle_count)),
            ("maxSpeed", self.max_speed.into()),
            ("showGrid", self.show_grid.into()),
            ("connectionDistance", self.connection_distance.into()),
            ("showConnections", self.show_connections.into()),
            ("particleSize", self.particle_size.into()),
            ("primaryColor", self.primary_color.into()),
            ("backgroundColor", self.background_color.into()),
            ("connectionColor", self.connection_color.into()),
            ("audioSensitivity", self.audio_sensitivity.into()),
        ])
    }

    fn apply(&mut self, key: &str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match key {
            "particleCount" => self.particle_count = value.as_number(key)?,
            "maxSpeed" => self.max_speed = value.as_number(key)?,
            "showGrid" => self.show_grid = value.as_bool(key)?,
            "connectionDistance" => self.connection_distance = value.as_number(key)?,
            "showConnections" => self.show_connections = value.as_bool(key)?,
            "particleSize" => self.particle_size = value.as_number(key)?,
            "primaryColor" => self.primary_color = value.as_color(key)?,
            "backgroundColor" => self.background_color = value.as_color(key)?,
            "connectionColor" => self.connection_color = value.as_color(key)?,
            "audioSensitivity" => self.audio_sensitivity = value.as_number(key)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    /// Pixels per frame
    pub velocity: Vec2,
    pub radius: f32,
    pub color: HexColor,
}

pub struct ParticleVisualization {
    props: ParticleProperties,
    particles: Vec<Particle>,
    bounds: Vec2,
    rng: StdRng,
    frame_count: u64,
}

impl ParticleVisualization {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_rng(width, height, StdRng::from_entropy())
    }

    /// Deterministic construction for reproducible motion
    pub fn with_rng(width: u32, height: u32, rng: StdRng) -> Self {
        let mut vis = Self {
            props: ParticleProperties::default(),
            particles: Vec::new(),
            bounds: Vec2::new(width as f32, height as f32),
            rng,
            frame_count: 0,
        };
        vis.seed_particles();
        vis
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Replace every particle with a freshly randomized one
    fn seed_particles(&mut self) {
        let count = self.props.count();
        let size = self.props.particle_size as f32;
        let color = self.props.primary_color;
        let bounds = self.bounds;
        let rng = &mut self.rng;

        let particles = (0..count)
            .map(|_| Particle {
                position: Vec2::new(rng.gen::<f32>() * bounds.x, rng.gen::<f32>() * bounds.y),
                velocity: Vec2::new((rng.gen::<f32>() - 0.5) * 2.0, (rng.gen::<f32>() - 0.5) * 2.0),
                radius: rng.gen::<f32>() * size + 1.0,
                color,
            })
            .collect();
        self.particles = particles;
    }

    fn draw_connections(&self, canvas: &mut Canvas) {
        let max_distance = self.props.connection_distance as f32;
        if max_distance <= 0.0 {
            return;
        }

        for (i, a) in self.particles.iter().enumerate() {
            for b in &self.particles[i + 1..] {
                let distance = a.position.distance(b.position);
                if distance < max_distance {
                    let opacity = (1.0 - distance / max_distance) * 0.5;
                    let paint = canvas::solid(self.props.connection_color.with_opacity(opacity));
                    canvas.line(
                        a.position.x,
                        a.position.y,
                        b.position.x,
                        b.position.y,
                        &paint,
                        1.0,
                    );
                }
            }
        }
    }
}

impl Visualization for ParticleVisualization {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn title(&self) -> &'static str {
        "Particles"
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn update(&mut self, audio: &AudioFrame<'_>) {
        self.frame_count += 1;

        let data = audio.frequency;
        let count = self.particles.len();
        let speed_limit = self.props.max_speed as f32 + audio.level * 3.0;
        let sensitivity = self.props.audio_sensitivity as f32;

        for (i, p) in self.particles.iter_mut().enumerate() {
            p.position += p.velocity;

            // Bounce off the edges
            if p.position.x < 0.0 || p.position.x > self.bounds.x {
                p.velocity.x = -p.velocity.x;
            }
            if p.position.y < 0.0 || p.position.y > self.bounds.y {
                p.velocity.y = -p.velocity.y;
            }

            if data.is_empty() {
                continue;
            }

            let bin = ((i as f32 / count as f32) * data.len() as f32).floor() as usize;
            let intensity = data[bin.min(data.len() - 1)] as f32 / 255.0 * sensitivity;
            p.velocity.x += (self.rng.gen::<f32>() - 0.5) * intensity * 0.5;
            p.velocity.y += (self.rng.gen::<f32>() - 0.5) * intensity * 0.5;

            let speed = p.velocity.length();
            if speed > speed_limit {
                p.velocity = p.velocity / speed * speed_limit;
            }
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        paint_background(canvas, self.props.background_color, self.props.show_grid);

        for p in &self.particles {
            let paint = canvas::solid(p.color.to_color());
            canvas.fill_circle(p.position.x, p.position.y, p.radius, &paint);
        }

        if self.props.show_connections {
            self.draw_connections(canvas);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.bounds = Vec2::new(width as f32, height as f32);
    }

    fn properties(&self) -> PropertyMap {
        self.props.to_map()
    }

    fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        if !self.props.apply(key, value)? {
            return Ok(());
        }
        log::debug!("particles: {} = {:?}", key, value);

        match key {
            "particleCount" => self.seed_particles(),
            "primaryColor" => {
                let color = self.props.primary_color;
                for p in &mut self.particles {
                    p.color = color;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        ParticleProperties::descriptors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(width: u32, height: u32) -> ParticleVisualization {
        ParticleVisualization::with_rng(width, height, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_initial_particles_within_bounds() {
        let vis = seeded(400, 300);
        assert_eq!(vis.particles().len(), 50);
        for p in vis.particles() {
            assert!((0.0..=400.0).contains(&p.position.x));
            assert!((0.0..=300.0).contains(&p.position.y));
            assert!(p.velocity.x.abs() <= 1.0 && p.velocity.y.abs() <= 1.0);
            assert!((1.0..=4.0).contains(&p.radius));
        }
    }

    #[test]
    fn test_count_change_reseeds() {
        let mut vis = seeded(400, 300);
        vis.update_property("particleCount", &PropertyValue::Number(80.0))
            .unwrap();
        assert_eq!(vis.particles().len(), 80);

        vis.update_property("particleCount", &PropertyValue::Number(10.0))
            .unwrap();
        assert_eq!(vis.particles().len(), 10);
    }

    #[test]
    fn test_huge_count_is_capped() {
        let mut vis = seeded(400, 300);
        vis.update_property("particleCount", &PropertyValue::Number(1e18))
            .unwrap();
        assert_eq!(vis.particles().len(), MAX_PARTICLES);
        // Stored value still reads back unchanged
        assert_eq!(vis.properties()["particleCount"], PropertyValue::Number(1e18));
    }

    #[test]
    fn test_infinite_count_rejected() {
        let mut vis = seeded(400, 300);
        let inf: PropertyValue = "inf".parse().unwrap();
        assert!(matches!(
            vis.update_property("particleCount", &inf),
            Err(PropertyError::NotFinite { .. })
        ));
        assert_eq!(vis.particles().len(), 50);
        assert_eq!(vis.properties()["particleCount"], PropertyValue::Number(50.0));
    }

    #[test]
    fn test_primary_color_recolors_particles() {
        let mut vis = seeded(400, 300);
        let red = HexColor::rgb(255, 0, 0);
        vis.update_property("primaryColor", &red.into()).unwrap();
        assert!(vis.particles().iter().all(|p| p.color == red));
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut vis = seeded(400, 300);
        let loud = vec![255u8; 64];
        let frame = AudioFrame {
            frequency: &loud,
            waveform: &[],
            level: 0.0,
        };
        for _ in 0..100 {
            vis.update(&frame);
        }
        for p in vis.particles() {
            assert!(p.velocity.length() <= 2.0 + 1e-4, "{}", p.velocity.length());
        }
    }

    #[test]
    fn test_audio_level_raises_speed_limit() {
        let mut vis = seeded(400, 300);
        vis.particles[0].velocity = Vec2::new(10.0, 0.0);
        let loud = vec![0u8; 64];
        let frame = AudioFrame {
            frequency: &loud,
            waveform: &[],
            level: 1.0,
        };
        vis.update(&frame);
        assert!((vis.particles()[0].velocity.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_particles_bounce_off_edges() {
        let mut vis = seeded(100, 100);
        vis.particles[0].position = Vec2::new(0.5, 50.0);
        vis.particles[0].velocity = Vec2::new(-1.0, 0.0);

        vis.update(&AudioFrame {
            frequency: &[],
            waveform: &[],
            level: 0.0,
        });
        assert_eq!(vis.particles()[0].velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_resize_keeps_particles() {
        let mut vis = seeded(400, 300);
        let before = vis.particles().to_vec();
        vis.resize(800, 600);
        assert_eq!(vis.particles(), before.as_slice());
    }
}
