//! Derivative animator: a secant collapsing into the tangent at `x0`.

use serde::Serialize;

use crate::sandbox::Evaluator;
use crate::types::{Point, Viewport};

/// Decay rate of the secant half-width (1/s)
pub const SECANT_DECAY_RATE: f64 = 0.8;

/// `h` never goes below this
pub const SECANT_FLOOR: f64 = 1e-4;

/// At or below this `h`, the line is styled and computed as a tangent
pub const TANGENT_THRESHOLD: f64 = 1e-2;

/// Step of the one-sided difference used for the tangent slope
pub const ONE_SIDED_STEP: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Secant,
    Tangent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeFrame {
    pub h: f64,
    pub style: LineStyle,
    pub slope: Option<f64>,
    /// `(x0, f(x0))`
    pub anchor: Option<Point>,
    /// `(x0 - h, f(x0 - h))` and `(x0 + h, f(x0 + h))` while in secant style
    pub secant_points: Option<(Point, Point)>,
    /// The line through the anchor, spanning the viewport's x-range
    pub line: Option<(Point, Point)>,
}

#[derive(Debug, Clone)]
pub struct DerivativeAnimator {
    f: Evaluator,
    x0: f64,
    initial_h: f64,
    viewport: Viewport,
}

impl DerivativeAnimator {
    pub fn new(f: Evaluator, x0: f64, initial_h: f64, viewport: Viewport) -> Self {
        Self {
            f,
            x0,
            initial_h: initial_h.abs().max(TANGENT_THRESHOLD * 2.0),
            viewport,
        }
    }

    pub fn h_at(&self, t: f64) -> f64 {
        (self.initial_h * (-SECANT_DECAY_RATE * t.max(0.0)).exp()).max(SECANT_FLOOR)
    }

    pub fn style_at(&self, t: f64) -> LineStyle {
        if self.h_at(t) > TANGENT_THRESHOLD {
            LineStyle::Secant
        } else {
            LineStyle::Tangent
        }
    }

    /// Seconds until the secant has become a tangent
    pub fn settle_time(&self) -> f64 {
        (self.initial_h / TANGENT_THRESHOLD).ln() / SECANT_DECAY_RATE
    }

    pub fn is_settled(&self, t: f64) -> bool {
        self.style_at(t) == LineStyle::Tangent
    }

    fn value(&self, x: f64) -> Option<f64> {
        self.f.classify(x).value()
    }

    /// Centered difference while `h` is above the threshold, one-sided
    /// difference afterwards.
    pub fn slope_at(&self, t: f64) -> Option<f64> {
        let h = self.h_at(t);
        let slope = if h > TANGENT_THRESHOLD {
            (self.value(self.x0 + h)? - self.value(self.x0 - h)?) / (2.0 * h)
        } else {
            (self.value(self.x0 + ONE_SIDED_STEP)? - self.value(self.x0)?) / ONE_SIDED_STEP
        };
        slope.is_finite().then_some(slope)
    }

    pub fn frame_at(&self, t: f64) -> DerivativeFrame {
        let h = self.h_at(t);
        let style = self.style_at(t);
        let slope = self.slope_at(t);
        let anchor = self.value(self.x0).map(|y| Point::new(self.x0, y));

        let secant_points = match style {
            LineStyle::Secant => match (self.value(self.x0 - h), self.value(self.x0 + h)) {
                (Some(l), Some(r)) => Some((
                    Point::new(self.x0 - h, l),
                    Point::new(self.x0 + h, r),
                )),
                _ => None,
            },
            LineStyle::Tangent => None,
        };

        let line = match (anchor, slope) {
            (Some(p), Some(m)) => {
                let x_left = self.viewport.x_min;
                let x_right = self.viewport.x_max;
                Some((
                    Point::new(x_left, p.y + m * (x_left - p.x)),
                    Point::new(x_right, p.y + m * (x_right - p.x)),
                ))
            }
            _ => None,
        };

        DerivativeFrame {
            h,
            style,
            slope,
            anchor,
            secant_points,
            line,
        }
    }
}
