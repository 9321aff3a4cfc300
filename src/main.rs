//! WaveCanvas - a real-time audio visualizer
//!
//! Microphone or file audio is analyzed every frame and drawn by one of
//! five interchangeable visualizations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use wavecanvas::app::{AppContext, SourceRequest};
use wavecanvas::audio::{CpalBackend, SourceState};
use wavecanvas::cli::Args;
use wavecanvas::engine::VisualizationEngine;
use wavecanvas::export::ExportFormat;
use wavecanvas::properties::{PropertyDescriptor, PropertyMap};
use wavecanvas::rendering::RenderSystem;
use wavecanvas::visualization::VISUALIZATION_NAMES;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio, strategies and canvas
    context: AppContext,

    /// Source requested on the command line, started once the window exists
    initial_source: Option<SourceRequest>,

    window_size: (u32, u32),
    title: String,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let render_config = args.render_config();
        let mut context = AppContext::new(
            Arc::new(CpalBackend),
            args.analyzer_config(),
            &render_config,
            args.export_config(),
        )?;

        context
            .configure(render_config.initial_visualization.as_deref(), &args.properties)
            .context("invalid startup visualization settings")?;

        let initial_source = if args.mic {
            Some(SourceRequest::Microphone)
        } else if let Some(path) = &args.file {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(SourceRequest::File(bytes))
        } else {
            None
        };

        Ok(Self {
            window: None,
            render_system: None,
            context,
            initial_source,
            window_size: (render_config.window_width, render_config.window_height),
            title: String::new(),
        })
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("WaveCanvas")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.window_size.0,
                self.window_size.1,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = match pollster::block_on(RenderSystem::new(Arc::clone(&window))) {
            Ok(render_system) => render_system,
            Err(e) => {
                log::error!("Failed to initialize rendering: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.context.resize(size.width, size.height);

        log::info!("Keys: 1-5 visualization, 0 none, M microphone, S stop, P/J export, Esc quit");
        log::info!("Drop an audio file on the window to play it");

        self.window = Some(window);
        self.render_system = Some(render_system);

        if let Some(request) = self.initial_source.take() {
            // Failures are recorded as the last error and shown in the title
            let _ = self.context.start(request);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
                self.context.resize(size.width, size.height);
            }
            WindowEvent::DroppedFile(path) => self.load_file(&path),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(code, event_loop),
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.context.stop();
    }
}

impl App {
    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        let slot = match code {
            KeyCode::Digit1 => Some(0),
            KeyCode::Digit2 => Some(1),
            KeyCode::Digit3 => Some(2),
            KeyCode::Digit4 => Some(3),
            KeyCode::Digit5 => Some(4),
            _ => None,
        };
        if let Some(slot) = slot {
            if let Err(e) = self.context.set_visualization(VISUALIZATION_NAMES[slot]) {
                log::error!("{}", e);
            }
            return;
        }

        match code {
            KeyCode::Digit0 => self.context.clear_visualization(),
            KeyCode::KeyM => {
                let _ = self.context.start(SourceRequest::Microphone);
            }
            KeyCode::KeyS => self.context.stop(),
            KeyCode::KeyP => self.export(ExportFormat::Png),
            KeyCode::KeyJ => self.export(ExportFormat::Jpeg),
            KeyCode::Escape => event_loop.exit(),
            _ => {}
        }
    }

    fn load_file(&mut self, path: &Path) {
        log::info!("Loading {}", path.display());
        match std::fs::read(path) {
            Ok(bytes) => {
                let _ = self.context.start(SourceRequest::File(bytes));
            }
            Err(e) => self
                .context
                .report_error(format!("failed to read {}: {}", path.display(), e)),
        }
    }

    fn export(&mut self, format: ExportFormat) {
        if let Err(e) = self.context.export(format) {
            self.context.report_error(e.to_string());
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        self.context.frame();

        if let Some(render_system) = &mut self.render_system {
            if let Err(e) = render_system.present(self.context.canvas()) {
                log::error!("Render error: {}", e);
            }
        }

        self.update_title();
    }

    /// Window title doubles as the status line
    fn update_title(&mut self) {
        let Some(window) = &self.window else {
            return;
        };

        let visualization = self
            .context
            .engine()
            .current()
            .map(|v| v.title())
            .unwrap_or("no visualization");
        let source = match self.context.source_state() {
            SourceState::Idle => "idle".to_string(),
            SourceState::Pending(kind) => format!("starting {}", kind),
            SourceState::MicrophoneActive => {
                format!("microphone {}%", self.context.level_percent())
            }
            SourceState::FileActive => format!("file {}%", self.context.level_percent()),
        };

        let mut title = format!("WaveCanvas - {} - {}", visualization, source);
        if let Some(error) = self.context.last_error() {
            title.push_str(" - ");
            title.push_str(error);
        }

        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }
}

/// One visualization's entry in `--list-properties`
#[derive(Serialize)]
struct PropertyListing {
    name: &'static str,
    title: &'static str,
    values: PropertyMap,
    descriptors: &'static [PropertyDescriptor],
}

fn print_properties(args: &Args) -> Result<()> {
    let mut engine = VisualizationEngine::new(args.width, args.height);
    engine
        .configure(args.render_config().initial_visualization.as_deref(), &args.properties)
        .context("invalid startup visualization settings")?;

    let listing: Vec<PropertyListing> = engine
        .iter()
        .map(|v| PropertyListing {
            name: v.name(),
            title: v.title(),
            values: v.properties(),
            descriptors: v.describe_properties(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list_properties {
        return print_properties(&args);
    }

    log::info!("WaveCanvas - real-time audio visualizer");

    let mut app = App::new(&args)?;
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
