//! Visualization registry and the per-frame render loop driver.

use thiserror::Error;

use crate::canvas::Canvas;
use crate::properties::{PropertyDescriptor, PropertyError, PropertyMap, PropertyValue};
use crate::visualization::{self, AudioFrame, Visualization};

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown visualization '{name}' (available: {available})")]
    UnknownVisualization { name: String, available: String },

    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Holds every strategy for the application's lifetime and tracks which one
/// is on screen
pub struct VisualizationEngine {
    visualizations: Vec<Box<dyn Visualization>>,
    current: Option<usize>,
}

impl VisualizationEngine {
    /// Engine with all built-in strategies and nothing selected
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_visualizations(visualization::create_all(width, height))
    }

    pub fn with_visualizations(visualizations: Vec<Box<dyn Visualization>>) -> Self {
        Self {
            visualizations,
            current: None,
        }
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.visualizations.iter().map(|v| v.name()).collect()
    }

    /// Select the strategy drawn on each tick
    pub fn set_visualization(&mut self, name: &str) -> Result<(), EngineError> {
        let index = self
            .visualizations
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| EngineError::UnknownVisualization {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;

        if self.current != Some(index) {
            log::info!("Visualization: {}", self.visualizations[index].title());
        }
        self.current = Some(index);
        Ok(())
    }

    /// Deselect; ticks then only clear the canvas
    pub fn clear_visualization(&mut self) {
        if self.current.take().is_some() {
            log::info!("Visualization cleared");
        }
    }

    pub fn current(&self) -> Option<&dyn Visualization> {
        self.current.map(|i| self.visualizations[i].as_ref())
    }

    fn current_mut(&mut self) -> Option<&mut (dyn Visualization + 'static)> {
        let index = self.current?;
        Some(self.visualizations[index].as_mut())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Visualization> {
        self.visualizations
            .iter()
            .find(|v| v.name() == name)
            .map(|v| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Visualization> {
        self.visualizations.iter().map(|v| v.as_ref())
    }

    /// Propagate a canvas resize to every strategy, selected or not
    pub fn resize(&mut self, width: u32, height: u32) {
        for vis in &mut self.visualizations {
            vis.resize(width, height);
        }
    }

    /// Properties of the selected strategy (empty when none)
    pub fn properties(&self) -> PropertyMap {
        self.current()
            .map(|v| v.properties())
            .unwrap_or_default()
    }

    /// Descriptors of the selected strategy (empty when none)
    pub fn describe_properties(&self) -> &'static [PropertyDescriptor] {
        self.current()
            .map(|v| v.describe_properties())
            .unwrap_or(&[])
    }

    /// Select the startup strategy and apply `overrides` to it
    ///
    /// With no strategy named the overrides have no target; they are
    /// dropped with a warning.
    pub fn configure(
        &mut self,
        name: Option<&str>,
        overrides: &[(String, PropertyValue)],
    ) -> Result<(), EngineError> {
        let Some(name) = name else {
            if !overrides.is_empty() {
                log::warn!(
                    "Ignoring {} property override(s): no visualization selected",
                    overrides.len()
                );
            }
            return Ok(());
        };

        self.set_visualization(name)?;
        for (key, value) in overrides {
            self.update_property(key, value)?;
        }
        Ok(())
    }

    /// Update a property of the selected strategy; no-op when none is selected
    pub fn update_property(&mut self, key: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        match self.current_mut() {
            Some(vis) => vis.update_property(key, value),
            None => Ok(()),
        }
    }
}

/// Drives one update/draw cycle per display refresh while running
#[derive(Debug, Default)]
pub struct RenderLoop {
    running: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin ticking; returns false when already running
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        log::info!("Render loop started");
        self.running = true;
        true
    }

    /// Cancel further frames
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Render loop stopped after {} frames", self.frames);
            self.running = false;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames produced since construction
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one frame: update and draw the selected strategy, or clear the
    /// canvas when nothing is selected. Returns false when stopped.
    pub fn tick(
        &mut self,
        engine: &mut VisualizationEngine,
        audio: &AudioFrame<'_>,
        canvas: &mut Canvas,
    ) -> bool {
        if !self.running {
            return false;
        }

        match engine.current_mut() {
            Some(vis) => {
                vis.update(audio);
                vis.draw(canvas);
            }
            None => canvas.clear(),
        }
        self.frames += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_selected_by_default() {
        let engine = VisualizationEngine::new(100, 100);
        assert!(engine.current().is_none());
        assert!(engine.properties().is_empty());
        assert!(engine.describe_properties().is_empty());
        assert_eq!(engine.names().len(), 5);
    }

    #[test]
    fn test_configure_applies_overrides_to_named_strategy() {
        let mut engine = VisualizationEngine::new(100, 100);
        let overrides = vec![
            ("barCount".to_string(), PropertyValue::Number(32.0)),
            ("showGrid".to_string(), PropertyValue::Bool(true)),
        ];
        engine.configure(Some("circular"), &overrides).unwrap();

        assert_eq!(engine.current().map(|v| v.name()), Some("circular"));
        let props = engine.properties();
        assert_eq!(props["barCount"], PropertyValue::Number(32.0));
        assert_eq!(props["showGrid"], PropertyValue::Bool(true));
        // Other strategies keep their defaults
        let spectrum = engine.get("spectrum").unwrap().properties();
        assert_eq!(spectrum["showGrid"], PropertyValue::Bool(false));
    }

    #[test]
    fn test_configure_without_selection_drops_overrides() {
        let mut engine = VisualizationEngine::new(100, 100);
        let overrides = vec![("barCount".to_string(), PropertyValue::Number(32.0))];
        engine.configure(None, &overrides).unwrap();

        assert!(engine.current().is_none());
        let circular = engine.get("circular").unwrap().properties();
        assert_eq!(circular["barCount"], PropertyValue::Number(64.0));
    }

    #[test]
    fn test_configure_rejects_bad_override() {
        let mut engine = VisualizationEngine::new(100, 100);
        let overrides = vec![("barCount".to_string(), PropertyValue::Bool(true))];
        let err = engine.configure(Some("circular"), &overrides).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Property(PropertyError::TypeMismatch { .. })
        ));

        let err = engine.configure(Some("lava-lamp"), &[]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownVisualization { .. }));
    }

    #[test]
    fn test_set_visualization() {
        let mut engine = VisualizationEngine::new(100, 100);
        engine.set_visualization("circular").unwrap();
        assert_eq!(engine.current().map(|v| v.name()), Some("circular"));
        assert!(engine.properties().contains_key("barCount"));

        let err = engine.set_visualization("lava-lamp").unwrap_err();
        assert!(matches!(err, EngineError::UnknownVisualization { .. }));
        // Selection survives a bad name
        assert_eq!(engine.current().map(|v| v.name()), Some("circular"));

        engine.clear_visualization();
        assert!(engine.current().is_none());
    }

    #[test]
    fn test_update_property_targets_current() {
        let mut engine = VisualizationEngine::new(100, 100);
        engine
            .update_property("barWidth", &PropertyValue::Number(5.0))
            .unwrap();

        engine.set_visualization("spectrum").unwrap();
        engine
            .update_property("barWidth", &PropertyValue::Number(5.0))
            .unwrap();
        assert_eq!(engine.properties()["barWidth"], PropertyValue::Number(5.0));

        // Other strategies keep their own values
        assert_eq!(
            engine.get("waveform").map(|v| v.properties()["lineWidth"].clone()),
            Some(PropertyValue::Number(2.0))
        );
    }

    #[test]
    fn test_render_loop_start_is_guarded() {
        let mut render_loop = RenderLoop::new();
        assert!(render_loop.start());
        assert!(!render_loop.start());
        render_loop.stop();
        assert!(!render_loop.is_running());
        assert!(render_loop.start());
    }

    #[test]
    fn test_tick_without_selection_clears_canvas() {
        let mut engine = VisualizationEngine::new(8, 8);
        let mut canvas = Canvas::new(8, 8);
        canvas.fill(tiny_skia::Color::WHITE);

        let mut render_loop = RenderLoop::new();
        assert!(!render_loop.tick(&mut engine, &AudioFrame::placeholder(), &mut canvas));
        assert!(canvas.to_rgba8().iter().all(|&b| b == 255));

        render_loop.start();
        assert!(render_loop.tick(&mut engine, &AudioFrame::placeholder(), &mut canvas));
        assert!(canvas.to_rgba8().iter().all(|&b| b == 0));
        assert_eq!(render_loop.frames(), 1);
    }

    #[test]
    fn test_tick_updates_only_selected() {
        let mut engine = VisualizationEngine::new(32, 32);
        let mut canvas = Canvas::new(32, 32);
        let mut render_loop = RenderLoop::new();
        render_loop.start();
        engine.set_visualization("waveform").unwrap();

        for _ in 0..3 {
            render_loop.tick(&mut engine, &AudioFrame::placeholder(), &mut canvas);
        }

        let counts: Vec<_> = engine.iter().map(|v| (v.name(), v.frame_count())).collect();
        assert!(counts.contains(&("waveform", 3)));
        assert!(counts.contains(&("spectrum", 0)));
    }
}
