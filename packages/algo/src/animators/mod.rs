//! Visualization Animators
//!
//! A [`Scene`] is built once per [`VisualizationRequest`] and is a pure
//! function of elapsed seconds: replaying the same request with the same
//! clock readings yields the same frames.
//!
//! - [`limit`] - points approaching `x = a` from both sides
//! - [`derivative`] - secant collapsing into the tangent
//! - [`integral`] - refining Riemann sums, then the shaded area

pub mod derivative;
pub mod integral;
pub mod limit;

use serde::Serialize;

use crate::sampler::{polyline, sample_path, CanvasTransform};
use crate::sandbox::{compile, Evaluator};
use crate::sanitize::{finite_or, sanitize_viewport};
use crate::types::{PathCommand, Point, Viewport, VisualizationKind, VisualizationRequest, DEFAULT_SAMPLE_COUNT};

pub use derivative::{DerivativeAnimator, DerivativeFrame, LineStyle};
pub use integral::{IntegralAnimator, IntegralFrame, IntegralStage, Rectangle};
pub use limit::{LimitAnimator, LimitFrame};

/// Fraction of the viewport width used for default start offsets
const DEFAULT_OFFSET_FRACTION: f64 = 0.25;

/// Monotonic animation clock local to one scene
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationClock {
    elapsed: f64,
}

impl AnimationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `dt` seconds; negative or non-finite ticks are ignored so
    /// the clock never runs backwards.
    pub fn tick(&mut self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        self.elapsed
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

#[derive(Debug, Clone)]
enum Animator {
    Limit(LimitAnimator),
    Derivative(DerivativeAnimator),
    Integral(IntegralAnimator),
}

/// Per-frame geometry, in data space
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Frame {
    Limit(LimitFrame),
    Derivative(DerivativeFrame),
    Integral(IntegralFrame),
}

impl Frame {
    /// Overlay outlines (tangent line, rectangles, shaded area) as canvas
    /// commands. Points are drawn by the renderer, not here.
    pub fn overlay_path(&self, transform: &CanvasTransform) -> Vec<PathCommand> {
        match self {
            Frame::Limit(_) => Vec::new(),
            Frame::Derivative(frame) => frame
                .line
                .map(|(a, b)| polyline(&[a, b], transform))
                .unwrap_or_default(),
            Frame::Integral(frame) => {
                if !frame.area_outline.is_empty() {
                    let mut cmds = polyline(&frame.area_outline, transform);
                    if let Some(first) = frame.area_outline.first() {
                        let c = transform.to_canvas(*first);
                        cmds.push(PathCommand::LineTo { x: c.x, y: c.y });
                    }
                    return cmds;
                }
                frame
                    .rectangles
                    .iter()
                    .flat_map(|r| {
                        let corners = [
                            Point::new(r.x, r.y_from),
                            Point::new(r.x, r.y_to),
                            Point::new(r.x + r.width, r.y_to),
                            Point::new(r.x + r.width, r.y_from),
                            Point::new(r.x, r.y_from),
                        ];
                        polyline(&corners, transform)
                    })
                    .collect()
            }
        }
    }
}

/// A renderable visualization: compiled function, repaired viewport and the
/// kind-specific animator.
#[derive(Debug, Clone)]
pub struct Scene {
    kind: VisualizationKind,
    evaluator: Evaluator,
    viewport: Viewport,
    animator: Animator,
}

impl Scene {
    /// Builds a scene, or `None` when there is nothing renderable: a `None`
    /// kind, or an expression the sandbox rejected.
    pub fn build(request: &VisualizationRequest) -> Option<Self> {
        if request.kind == VisualizationKind::None {
            return None;
        }

        let evaluator = match compile(&request.function_expression) {
            Ok(f) => f,
            Err(err) => {
                tracing::debug!(
                    expression = %request.function_expression,
                    error = %err,
                    "visualization suppressed"
                );
                return None;
            }
        };

        let viewport = sanitize_viewport(&request.viewport);
        let params = &request.params;
        let default_offset = viewport.width() * DEFAULT_OFFSET_FRACTION;

        let animator = match request.kind {
            VisualizationKind::Limit => Animator::Limit(LimitAnimator::new(
                evaluator.clone(),
                finite_or(params.limit_point, 0.0),
                finite_or(params.initial_offset, default_offset),
            )),
            VisualizationKind::Derivative => Animator::Derivative(DerivativeAnimator::new(
                evaluator.clone(),
                finite_or(params.point, 0.0),
                finite_or(params.initial_h, default_offset),
                viewport,
            )),
            VisualizationKind::Integral => Animator::Integral(IntegralAnimator::new(
                evaluator.clone(),
                finite_or(params.lower_bound, viewport.x_min),
                finite_or(params.upper_bound, viewport.x_max),
                viewport,
            )),
            VisualizationKind::None => return None,
        };

        Some(Self {
            kind: request.kind,
            evaluator,
            viewport,
            animator,
        })
    }

    pub fn kind(&self) -> VisualizationKind {
        self.kind
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn transform(&self, width: f64, height: f64) -> CanvasTransform {
        CanvasTransform::new(&self.viewport, width, height)
    }

    /// The function's curve, independent of time
    pub fn curve_path(&self, width: f64, height: f64) -> Vec<PathCommand> {
        sample_path(&self.evaluator, &self.viewport, width, height, DEFAULT_SAMPLE_COUNT)
    }

    pub fn frame_at(&self, t: f64) -> Frame {
        match &self.animator {
            Animator::Limit(a) => Frame::Limit(a.frame_at(t)),
            Animator::Derivative(a) => Frame::Derivative(a.frame_at(t)),
            Animator::Integral(a) => Frame::Integral(a.frame_at(t)),
        }
    }

    pub fn settle_time(&self) -> f64 {
        match &self.animator {
            Animator::Limit(a) => a.settle_time(),
            Animator::Derivative(a) => a.settle_time(),
            Animator::Integral(a) => a.settle_time(),
        }
    }

    /// Whether the animation reached its terminal state at `t`
    pub fn is_settled(&self, t: f64) -> bool {
        match &self.animator {
            Animator::Limit(a) => a.is_settled(t),
            Animator::Derivative(a) => a.is_settled(t),
            Animator::Integral(a) => a.is_settled(t),
        }
    }
}
