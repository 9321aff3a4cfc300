//! WaveCanvas library - real-time audio analysis and visualization

pub mod app;
pub mod audio;
pub mod canvas;
pub mod cli;
pub mod engine;
pub mod export;
pub mod params;
pub mod properties;
pub mod rendering;
pub mod visualization;
