//! Integral animator: midpoint Riemann sums refining into the exact area.

use serde::Serialize;

use crate::sampler::sample_xs;
use crate::sandbox::Evaluator;
use crate::types::{Point, Viewport};

/// Rectangle counts shown in order before the continuous area
pub const RECTANGLE_SCHEDULE: [usize; 5] = [4, 8, 16, 32, 64];

/// Seconds each schedule entry stays on screen
pub const SCHEDULE_INTERVAL_SECS: f64 = 1.5;

/// Samples used for the continuous shaded area
pub const AREA_RESOLUTION: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "count", rename_all = "camelCase")]
pub enum IntegralStage {
    Rectangles(usize),
    Continuous,
}

/// One Riemann rectangle. `value` is `f` at the midpoint; `y_from`/`y_to`
/// are the drawn edges clipped to the viewport, starting at the axis so that
/// negative values extend downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    pub x: f64,
    pub width: f64,
    pub value: f64,
    pub y_from: f64,
    pub y_to: f64,
}

impl Rectangle {
    pub fn is_below_axis(&self) -> bool {
        self.value < 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegralFrame {
    pub stage: IntegralStage,
    pub rectangles: Vec<Rectangle>,
    /// Closed outline of the shaded area in the continuous stage
    pub area_outline: Vec<Point>,
    /// Riemann sum, or trapezoid area once continuous
    pub estimate: f64,
}

#[derive(Debug, Clone)]
pub struct IntegralAnimator {
    f: Evaluator,
    a: f64,
    b: f64,
    /// -1 when the bounds were given in reverse order
    orientation: f64,
    viewport: Viewport,
}

impl IntegralAnimator {
    pub fn new(f: Evaluator, a: f64, b: f64, viewport: Viewport) -> Self {
        let (lo, hi, orientation) = if a <= b { (a, b, 1.0) } else { (b, a, -1.0) };
        Self {
            f,
            a: lo,
            b: hi,
            orientation,
            viewport,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.a, self.b)
    }

    pub fn stage_at(&self, t: f64) -> IntegralStage {
        let index = (t.max(0.0) / SCHEDULE_INTERVAL_SECS).floor() as usize;
        RECTANGLE_SCHEDULE
            .get(index)
            .map_or(IntegralStage::Continuous, |&n| IntegralStage::Rectangles(n))
    }

    pub fn settle_time(&self) -> f64 {
        RECTANGLE_SCHEDULE.len() as f64 * SCHEDULE_INTERVAL_SECS
    }

    pub fn is_settled(&self, t: f64) -> bool {
        self.stage_at(t) == IntegralStage::Continuous
    }

    pub fn frame_at(&self, t: f64) -> IntegralFrame {
        match self.stage_at(t) {
            IntegralStage::Rectangles(n) => {
                let rectangles = self.rectangles(n);
                let estimate = rectangles.iter().map(|r| r.value * r.width).sum::<f64>();
                IntegralFrame {
                    stage: IntegralStage::Rectangles(n),
                    rectangles,
                    area_outline: Vec::new(),
                    estimate: estimate * self.orientation,
                }
            }
            IntegralStage::Continuous => {
                let (area_outline, estimate) = self.continuous_area();
                IntegralFrame {
                    stage: IntegralStage::Continuous,
                    rectangles: Vec::new(),
                    area_outline,
                    estimate: estimate * self.orientation,
                }
            }
        }
    }

    /// Midpoint rectangles; undefined midpoints contribute a zero-height
    /// rectangle.
    pub fn rectangles(&self, n: usize) -> Vec<Rectangle> {
        let n = n.max(1);
        let width = (self.b - self.a) / n as f64;
        let axis = self.viewport.clamp_y(0.0);
        (0..n)
            .map(|i| {
                let x = self.a + (self.b - self.a) * i as f64 / n as f64;
                let value = self.f.classify(x + width / 2.0).value().unwrap_or(0.0);
                Rectangle {
                    x,
                    width,
                    value,
                    y_from: axis,
                    y_to: self.viewport.clamp_y(value),
                }
            })
            .collect()
    }

    fn continuous_area(&self) -> (Vec<Point>, f64) {
        let axis = self.viewport.clamp_y(0.0);
        let samples: Vec<(f64, f64)> = sample_xs(self.a, self.b, AREA_RESOLUTION)
            .map(|x| (x, self.f.classify(x).value().unwrap_or(0.0)))
            .collect();

        let mut outline = Vec::with_capacity(samples.len() + 2);
        outline.push(Point::new(self.a, axis));
        outline.extend(
            samples
                .iter()
                .map(|&(x, y)| Point::new(x, self.viewport.clamp_y(y))),
        );
        outline.push(Point::new(self.b, axis));

        let area = samples
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();

        (outline, area)
    }
}
