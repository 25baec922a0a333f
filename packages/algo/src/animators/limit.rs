//! Limit animator: two points slide toward `x = a` from both sides.
//!
//! `offset(t) = initial_offset · e^(−k·t)`, snapped to zero once
//! `|offset| < ε`. The limit point is drawn as an open circle at the value
//! estimated from both sides, which exists even when `f(a)` does not.

use serde::Serialize;

use crate::sandbox::Evaluator;
use crate::types::Point;

/// Decay rate k (1/s)
pub const LIMIT_DECAY_RATE: f64 = 0.9;

/// Snap threshold ε
pub const LIMIT_SNAP_EPSILON: f64 = 1e-3;

/// Distance from `a` used to estimate the one-sided values
const SIDE_PROBE: f64 = 1e-6;

/// Side values closer than this are treated as agreeing
const SIDE_AGREEMENT: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitFrame {
    pub offset: f64,
    pub snapped: bool,
    /// Moving point approaching from the left (filled)
    pub left: Option<Point>,
    /// Moving point approaching from the right (filled)
    pub right: Option<Point>,
    /// Open circle at `(a, L)`; `None` when the two sides disagree
    pub limit_point: Option<Point>,
}

#[derive(Debug, Clone)]
pub struct LimitAnimator {
    f: Evaluator,
    target: f64,
    initial_offset: f64,
    limit_value: Option<f64>,
}

impl LimitAnimator {
    pub fn new(f: Evaluator, target: f64, initial_offset: f64) -> Self {
        let initial_offset = initial_offset.abs().max(LIMIT_SNAP_EPSILON * 2.0);
        let limit_value = estimate_limit(&f, target);
        Self {
            f,
            target,
            initial_offset,
            limit_value,
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn limit_value(&self) -> Option<f64> {
        self.limit_value
    }

    pub fn offset_at(&self, t: f64) -> f64 {
        let offset = self.initial_offset * (-LIMIT_DECAY_RATE * t.max(0.0)).exp();
        if offset.abs() < LIMIT_SNAP_EPSILON {
            0.0
        } else {
            offset
        }
    }

    /// Seconds until the moving points snap onto the limit point
    pub fn settle_time(&self) -> f64 {
        (self.initial_offset / LIMIT_SNAP_EPSILON).ln() / LIMIT_DECAY_RATE
    }

    pub fn is_settled(&self, t: f64) -> bool {
        self.offset_at(t) == 0.0
    }

    pub fn frame_at(&self, t: f64) -> LimitFrame {
        let offset = self.offset_at(t);
        let limit_point = self.limit_value.map(|l| Point::new(self.target, l));

        if offset == 0.0 {
            return LimitFrame {
                offset,
                snapped: true,
                left: limit_point,
                right: limit_point,
                limit_point,
            };
        }

        let point_at = |x: f64| self.f.classify(x).value().map(|y| Point::new(x, y));
        LimitFrame {
            offset,
            snapped: false,
            left: point_at(self.target - offset),
            right: point_at(self.target + offset),
            limit_point,
        }
    }
}

/// Two-sided estimate of `lim_{x→a} f(x)`. Falls back to a single finite
/// side, then to `f(a)` itself.
fn estimate_limit(f: &Evaluator, a: f64) -> Option<f64> {
    let left = f.classify(a - SIDE_PROBE).value();
    let right = f.classify(a + SIDE_PROBE).value();
    match (left, right) {
        (Some(l), Some(r)) => {
            let scale = l.abs().max(r.abs()).max(1.0);
            if (l - r).abs() <= SIDE_AGREEMENT * scale {
                Some((l + r) / 2.0)
            } else {
                None
            }
        }
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => f.classify(a).value(),
    }
}
