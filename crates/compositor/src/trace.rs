//! Trace panel rendering.
//!
//! [`TraceCompositor`] selects and normalises the signal samples of one
//! window; a [`TraceRenderer`] rasterises the resulting [`TracePlot`]. The
//! renderer holds no mutable state, so one instance serves every worker.

use contracts::ContractError;
use image::{Rgba, RgbaImage};
use sync_engine::{AlignmentWindow, SampleTrack};
use tiny_skia::{Color, LineCap, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Signal trace stroke width (points)
pub const TRACE_WIDTH_PT: f32 = 1.5;

/// Axes frame stroke width (points)
pub const FRAME_WIDTH_PT: f32 = 0.8;

/// Normalised data for one trace panel
///
/// x is in seconds over `[x_min, x_max)`, y in display units over `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TracePlot {
    pub x_min: f64,
    pub x_max: f64,
    pub sensor: Vec<(f64, f64)>,
    pub audio: Vec<(f64, f64)>,
    /// Ticks in the upper half (`y ∈ [0.5, 1]`)
    pub primary_marks: [f64; 3],
    /// Ticks in the lower half (`y ∈ [-1, -0.5]`)
    pub secondary_marks: [f64; 3],
    pub width: u32,
    pub height: u32,
    pub dpi: f64,
}

/// Rasterises a [`TracePlot`] at exactly `width × height` pixels
pub trait TraceRenderer: Send + Sync {
    fn render(&self, plot: &TracePlot) -> Result<RgbaImage, ContractError>;
}

/// Colours used by [`SkiaTraceRenderer`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStyle {
    pub background: [u8; 3],
    pub sensor: [u8; 3],
    pub audio: [u8; 3],
    pub marks: [u8; 3],
}

impl Default for TraceStyle {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
            sensor: [0, 0, 255],
            audio: [0, 128, 0],
            marks: [0, 0, 0],
        }
    }
}

/// tiny-skia backed renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct SkiaTraceRenderer {
    style: TraceStyle,
}

impl SkiaTraceRenderer {
    pub fn new(style: TraceStyle) -> Self {
        Self { style }
    }
}

fn paint(rgb: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;
    paint
}

fn points_to_px(points: f32, dpi: f64) -> f32 {
    points * dpi as f32 / 72.0
}

impl TraceRenderer for SkiaTraceRenderer {
    fn render(&self, plot: &TracePlot) -> Result<RgbaImage, ContractError> {
        let mut pixmap = Pixmap::new(plot.width, plot.height).ok_or_else(|| {
            ContractError::render(format!(
                "cannot allocate {}x{} trace panel",
                plot.width, plot.height
            ))
        })?;
        let [r, g, b] = self.style.background;
        pixmap.fill(Color::from_rgba8(r, g, b, 255));

        let (w, h) = (plot.width as f64, plot.height as f64);
        let span = plot.x_max - plot.x_min;
        let px = |t: f64| (((t - plot.x_min) / span) * w) as f32;
        let py = |v: f64| (((1.0 - v) / 2.0) * h) as f32;

        let trace_stroke = Stroke {
            width: points_to_px(TRACE_WIDTH_PT, plot.dpi),
            line_cap: LineCap::Butt,
            ..Stroke::default()
        };

        for (points, color) in [
            (&plot.sensor, self.style.sensor),
            (&plot.audio, self.style.audio),
        ] {
            let mut pb = PathBuilder::new();
            let mut pen_down = false;
            for &(t, v) in points.iter() {
                let (x, y) = (px(t), py(v));
                // Non-finite samples break the line instead of invalidating the path.
                if !(x.is_finite() && y.is_finite()) {
                    pen_down = false;
                    continue;
                }
                if pen_down {
                    pb.line_to(x, y);
                } else {
                    pb.move_to(x, y);
                    pen_down = true;
                }
            }
            // A single sample has no extent and yields no path.
            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint(color), &trace_stroke, Transform::identity(), None);
            }
        }

        let mut marks = PathBuilder::new();
        for &t in &plot.primary_marks {
            marks.move_to(px(t), py(1.0));
            marks.line_to(px(t), py(0.5));
        }
        for &t in &plot.secondary_marks {
            marks.move_to(px(t), py(-0.5));
            marks.line_to(px(t), py(-1.0));
        }
        if let Some(path) = marks.finish() {
            pixmap.stroke_path(&path, &paint(self.style.marks), &trace_stroke, Transform::identity(), None);
        }

        let frame_width = points_to_px(FRAME_WIDTH_PT, plot.dpi);
        let inset = frame_width / 2.0;
        if let Some(rect) = Rect::from_xywh(
            inset,
            inset,
            plot.width as f32 - frame_width,
            plot.height as f32 - frame_width,
        ) {
            let frame = PathBuilder::from_rect(rect);
            let stroke = Stroke {
                width: frame_width,
                ..Stroke::default()
            };
            pixmap.stroke_path(&frame, &paint(self.style.marks), &stroke, Transform::identity(), None);
        }

        let mut out = RgbaImage::new(plot.width, plot.height);
        for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(out)
    }
}

/// Builds the trace panel of one anchor window
#[derive(Debug, Clone)]
pub struct TraceCompositor<R = SkiaTraceRenderer> {
    renderer: R,
    dpi: f64,
}

impl TraceCompositor<SkiaTraceRenderer> {
    pub fn new(dpi: f64) -> Self {
        Self::with_renderer(SkiaTraceRenderer::default(), dpi)
    }
}

impl<R: TraceRenderer> TraceCompositor<R> {
    pub fn with_renderer(renderer: R, dpi: f64) -> Self {
        Self { renderer, dpi }
    }

    /// Normalised plot data for `window`
    ///
    /// Fails with `EmptyWindow` when neither stream has a sample inside.
    pub fn plot(
        &self,
        window: &AlignmentWindow,
        sensor: &SampleTrack,
        audio: &SampleTrack,
        primary_marks: [f64; 3],
        secondary_marks: [f64; 3],
        panel_size: (u32, u32),
    ) -> Result<TracePlot, ContractError> {
        let normalized = |track: &SampleTrack| -> Vec<(f64, f64)> {
            let scale = track.scale();
            track
                .select(window)
                .into_iter()
                .map(|(t, v)| (t, scale.normalize(v)))
                .collect()
        };
        let sensor = normalized(sensor);
        let audio = normalized(audio);

        if sensor.is_empty() && audio.is_empty() {
            return Err(ContractError::EmptyWindow {
                lo: window.lo(),
                hi: window.hi(),
            });
        }

        Ok(TracePlot {
            x_min: window.lo(),
            x_max: window.hi(),
            sensor,
            audio,
            primary_marks,
            secondary_marks,
            width: panel_size.0,
            height: panel_size.1,
            dpi: self.dpi,
        })
    }

    /// Render the trace panel for `window`
    pub fn render(
        &self,
        window: &AlignmentWindow,
        sensor: &SampleTrack,
        audio: &SampleTrack,
        primary_marks: [f64; 3],
        secondary_marks: [f64; 3],
        panel_size: (u32, u32),
    ) -> Result<RgbaImage, ContractError> {
        let plot = self.plot(
            window,
            sensor,
            audio,
            primary_marks,
            secondary_marks,
            panel_size,
        )?;
        let panel = self.renderer.render(&plot)?;
        if panel.dimensions() != panel_size {
            return Err(ContractError::TileSizeMismatch {
                tile: "trace panel".to_string(),
                expected_width: panel_size.0,
                expected_height: panel_size.1,
                actual_width: panel.width(),
                actual_height: panel.height(),
            });
        }
        Ok(panel)
    }
}
