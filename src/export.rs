//! Still-image export of the current canvas.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError};
use thiserror::Error;

use crate::canvas::Canvas;
use crate::params::ExportConfig;

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to encode {format}: {source}")]
    Encode {
        format: ExportFormat,
        #[source]
        source: ImageError,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supported still-image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Png => write!(f, "PNG"),
            ExportFormat::Jpeg => write!(f, "JPEG"),
        }
    }
}

/// Encode the canvas as PNG (with alpha)
pub fn encode_png(canvas: &Canvas) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            &canvas.to_rgba8(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|source| ExportError::Encode {
            format: ExportFormat::Png,
            source,
        })?;
    Ok(bytes)
}

/// Encode the canvas as JPEG, flattening transparency onto black
pub fn encode_jpeg(canvas: &Canvas, quality: u8) -> Result<Vec<u8>, ExportError> {
    // Premultiplied RGB is exactly the canvas composited over black
    let rgb: Vec<u8> = canvas
        .pixmap()
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .write_image(&rgb, canvas.width(), canvas.height(), ExtendedColorType::Rgb8)
        .map_err(|source| ExportError::Encode {
            format: ExportFormat::Jpeg,
            source,
        })?;
    Ok(bytes)
}

/// Encode in `format`
pub fn encode(canvas: &Canvas, format: ExportFormat, config: &ExportConfig) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => encode_png(canvas),
        ExportFormat::Jpeg => encode_jpeg(canvas, config.jpeg_quality),
    }
}

/// Encode the canvas and write it to a timestamped file in the export
/// directory, returning the written path
pub fn export_canvas(
    canvas: &Canvas,
    format: ExportFormat,
    config: &ExportConfig,
) -> Result<PathBuf, ExportError> {
    let bytes = encode(canvas, format, config)?;

    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = config.file_path(timestamp_ms, format.extension());

    fs::create_dir_all(&config.output_dir).map_err(|source| ExportError::Io {
        path: config.output_dir.clone(),
        source,
    })?;
    fs::write(&path, &bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    log::info!("Exported {} ({} bytes) to {}", format, bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    fn painted_canvas() -> Canvas {
        let mut canvas = Canvas::new(32, 16);
        canvas.fill(Color::from_rgba8(0x4c, 0xf0, 0x54, 255));
        canvas
    }

    #[test]
    fn test_png_signature_and_pixels() {
        let bytes = encode_png(&painted_canvas()).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded.get_pixel(5, 5).0, [0x4c, 0xf0, 0x54, 255]);
    }

    #[test]
    fn test_jpeg_signature() {
        let bytes = encode_jpeg(&painted_canvas(), 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_export_writes_timestamped_file() {
        let dir = std::env::temp_dir().join(format!("wavecanvas-export-{}", std::process::id()));
        let config = ExportConfig {
            output_dir: dir.clone(),
            ..Default::default()
        };

        let path = export_canvas(&painted_canvas(), ExportFormat::Jpeg, &config).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("audio-visualization-"));
        assert!(name.ends_with(".jpg"));
        assert!(fs::metadata(&path).unwrap().len() > 0);

        fs::remove_dir_all(dir).unwrap();
    }
}
