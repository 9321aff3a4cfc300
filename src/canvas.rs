//! CPU raster surface shared by all visualizations, plus drawing helpers.

use tiny_skia::{
    Color, FillRule, GradientStop, LinearGradient, Paint, Path, PathBuilder, Pixmap, Point, Rect,
    SpreadMode, Stroke, Transform,
};

/// Background grid cell size in pixels
const GRID_SIZE: f32 = 50.0;

/// 2D drawing surface backed by a `tiny_skia::Pixmap`
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    /// Create a transparent canvas; zero dimensions are bumped to 1
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixmap: blank_pixmap(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Width and height as floats, for geometry
    pub fn size(&self) -> (f32, f32) {
        (self.pixmap.width() as f32, self.pixmap.height() as f32)
    }

    /// Reallocate the surface; contents are discarded
    pub fn resize(&mut self, width: u32, height: u32) {
        if width.max(1) == self.width() && height.max(1) == self.height() {
            return;
        }
        self.pixmap = blank_pixmap(width, height);
    }

    /// Reset every pixel to transparent
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Flood the whole surface with `color`
    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(color);
    }

    /// Fill an axis-aligned rectangle; empty or inverted rectangles draw nothing
    /// Negative extents flip the rect back across its origin edge
    pub fn fill_rect(&mut self, mut x: f32, mut y: f32, mut width: f32, mut height: f32, paint: &Paint) {
        if width < 0.0 {
            x += width;
            width = -width;
        }
        if height < 0.0 {
            y += height;
            height = -height;
        }
        if width == 0.0 || height == 0.0 {
            return;
        }
        if let Some(rect) = Rect::from_xywh(x, y, width, height) {
            self.pixmap
                .fill_rect(rect, paint, Transform::identity(), None);
        }
    }

    pub fn fill_path(&mut self, path: &Path, paint: &Paint) {
        self.pixmap
            .fill_path(path, paint, FillRule::Winding, Transform::identity(), None);
    }

    pub fn stroke_path(&mut self, path: &Path, paint: &Paint, width: f32) {
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, paint, &stroke, Transform::identity(), None);
    }

    /// Stroke a straight segment
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, paint: &Paint, width: f32) {
        let mut pb = PathBuilder::new();
        pb.move_to(x1, y1);
        pb.line_to(x2, y2);
        if let Some(path) = pb.finish() {
            self.stroke_path(&path, paint, width);
        }
    }

    /// Stroke a polyline through `points`
    pub fn polyline<I>(&mut self, points: I, paint: &Paint, width: f32)
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut pb = PathBuilder::new();
        for (i, (x, y)) in points.into_iter().enumerate() {
            if i == 0 {
                pb.move_to(x, y);
            } else {
                pb.line_to(x, y);
            }
        }
        if let Some(path) = pb.finish() {
            self.stroke_path(&path, paint, width);
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.fill_path(&path, paint);
        }
    }

    pub fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, paint: &Paint, width: f32) {
        if let Some(path) = PathBuilder::from_circle(cx, cy, radius) {
            self.stroke_path(&path, paint, width);
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight (non-premultiplied) RGBA8 copy of the surface, row-major
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }
}

fn blank_pixmap(width: u32, height: u32) -> Pixmap {
    // Only fails for zero or overflowing sizes
    Pixmap::new(width.max(1), height.max(1))
        .or_else(|| Pixmap::new(1, 1))
        .unwrap_or_else(|| unreachable!("1x1 pixmap allocation"))
}

/// Anti-aliased paint with a solid color
pub fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Paint with a two-stop linear gradient from `(x1, y1)` to `(x2, y2)`
///
/// Degenerate geometry falls back to the start color.
pub fn linear_gradient(x1: f32, y1: f32, x2: f32, y2: f32, from: Color, to: Color) -> Paint<'static> {
    let shader = LinearGradient::new(
        Point::from_xy(x1, y1),
        Point::from_xy(x2, y2),
        vec![GradientStop::new(0.0, from), GradientStop::new(1.0, to)],
        SpreadMode::Pad,
        Transform::identity(),
    );

    match shader {
        Some(shader) => Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        },
        None => solid(from),
    }
}

/// HSL color (hue in degrees, saturation/lightness in 0-1) to RGB
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Color {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;

    Color::from_rgba(r + m, g + m, b + m, 1.0).unwrap_or(Color::BLACK)
}

/// White background grid: 50px cells at 0.1 alpha, centre line at 0.3
pub fn draw_grid(canvas: &mut Canvas) {
    let (width, height) = canvas.size();
    let faint = solid(Color::from_rgba8(255, 255, 255, 26));

    let mut x = 0.0;
    while x <= width {
        canvas.line(x, 0.0, x, height, &faint, 1.0);
        x += GRID_SIZE;
    }

    let mut y = 0.0;
    while y <= height {
        canvas.line(0.0, y, width, y, &faint, 1.0);
        y += GRID_SIZE;
    }

    let centre = solid(Color::from_rgba8(255, 255, 255, 77));
    canvas.line(0.0, height / 2.0, width, height / 2.0, &centre, 1.0);
}

/// Rescale `data` onto [0, 1] by its own min and max (flat input maps to 0)
pub fn normalize_data(data: &[f32]) -> Vec<f32> {
    let Some(&first) = data.first() else {
        return Vec::new();
    };

    let (min, max) = data
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = if max - min == 0.0 { 1.0 } else { max - min };

    data.iter().map(|&v| (v - min) / range).collect()
}
