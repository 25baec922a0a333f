//! Curve Sampler & Path Builder
//!
//! Turns an [`Evaluator`] plus viewport bounds into canvas draw commands.
//! Samples that are undefined, or far outside the visible y-range, lift the
//! pen so asymptotes and domain gaps render as breaks instead of spikes.

use std::fmt::Write as _;

use crate::sandbox::Evaluator;
use crate::sanitize::{is_drawable, sanitize_viewport};
use crate::types::{PathCommand, Point, Viewport, DEFAULT_SAMPLE_COUNT};

/// Affine map from data space to a `width × height` canvas, y pointing down
/// on the canvas so that data-up renders as canvas-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    pub viewport: Viewport,
    pub width: f64,
    pub height: f64,
}

impl CanvasTransform {
    pub fn new(viewport: &Viewport, width: f64, height: f64) -> Self {
        Self {
            viewport: sanitize_viewport(viewport),
            width: if width.is_finite() && width > 0.0 { width } else { 1.0 },
            height: if height.is_finite() && height > 0.0 { height } else { 1.0 },
        }
    }

    pub fn to_canvas(&self, p: Point) -> Point {
        let vp = &self.viewport;
        let cx = (p.x - vp.x_min) / vp.width() * self.width;
        let cy = self.height - (p.y - vp.y_min) / vp.height() * self.height;
        Point::new(cx, cy)
    }

    pub fn to_data(&self, p: Point) -> Point {
        let vp = &self.viewport;
        let x = vp.x_min + p.x / self.width * vp.width();
        let y = vp.y_min + (self.height - p.y) / self.height * vp.height();
        Point::new(x, y)
    }
}

/// Evenly spaced x-values `x_min + (x_max - x_min) * i / steps`, `i = 0..=steps`.
///
/// Computing each x from `i` instead of accumulating a step keeps exact
/// sample points exact, e.g. `x = 2` on `[0, 4]` with 4 steps.
pub fn sample_xs(x_min: f64, x_max: f64, steps: usize) -> impl Iterator<Item = f64> {
    let steps = steps.max(1);
    let span = x_max - x_min;
    (0..=steps).map(move |i| x_min + span * i as f64 / steps as f64)
}

/// Samples `f` over the viewport and returns canvas draw commands.
pub fn sample_path(
    f: &Evaluator,
    viewport: &Viewport,
    width: f64,
    height: f64,
    sample_count: usize,
) -> Vec<PathCommand> {
    let transform = CanvasTransform::new(viewport, width, height);
    let vp = transform.viewport;
    let mut commands = Vec::with_capacity(sample_count + 1);
    let mut pen_down = false;

    for x in sample_xs(vp.x_min, vp.x_max, sample_count) {
        let y = f.eval(x);
        if !is_drawable(y, &vp) {
            pen_down = false;
            continue;
        }
        let c = transform.to_canvas(Point::new(x, y));
        if pen_down {
            commands.push(PathCommand::LineTo { x: c.x, y: c.y });
        } else {
            commands.push(PathCommand::MoveTo { x: c.x, y: c.y });
            pen_down = true;
        }
    }

    commands
}

/// [`sample_path`] with the default resolution
pub fn sample_path_default(f: &Evaluator, viewport: &Viewport, width: f64, height: f64) -> Vec<PathCommand> {
    sample_path(f, viewport, width, height, DEFAULT_SAMPLE_COUNT)
}

/// Maps data-space points straight to commands, one sub-path
pub fn polyline(points: &[Point], transform: &CanvasTransform) -> Vec<PathCommand> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let c = transform.to_canvas(*p);
            if i == 0 {
                PathCommand::MoveTo { x: c.x, y: c.y }
            } else {
                PathCommand::LineTo { x: c.x, y: c.y }
            }
        })
        .collect()
}

/// Number of sub-paths (pen-down runs)
pub fn segment_count(commands: &[PathCommand]) -> usize {
    commands.iter().filter(|c| c.is_move()).count()
}

/// Renders commands as an SVG path `d` attribute
pub fn to_svg_path(commands: &[PathCommand]) -> String {
    let mut out = String::with_capacity(commands.len() * 16);
    for (i, cmd) in commands.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let (letter, p) = match cmd {
            PathCommand::MoveTo { .. } => ('M', cmd.point()),
            PathCommand::LineTo { .. } => ('L', cmd.point()),
        };
        // writing into a String cannot fail
        let _ = write!(out, "{letter}{:.2} {:.2}", p.x, p.y);
    }
    out
}
