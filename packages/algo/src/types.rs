//! Common Types and Constants
//!
//! Visualization requests as delivered by the tutoring oracle, plus the
//! numeric constants shared by the sampler and animators.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Default number of sampling steps across the viewport
pub const DEFAULT_SAMPLE_COUNT: usize = 300;

/// Smallest viewport span accepted before the viewport is widened
pub const MIN_VIEWPORT_SPAN: f64 = 1e-6;

/// Largest absolute viewport bound
pub const MAX_VIEWPORT_ABS: f64 = 1e6;

/// Placeholder text shown when the oracle sent no usable visualization
pub const PLACEHOLDER_TITLE: &str = "Nothing to draw yet";

// ==================== Request Types ====================

/// What the whiteboard should animate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisualizationKind {
    Limit,
    Derivative,
    Integral,
    #[default]
    None,
}

impl VisualizationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            VisualizationKind::Limit => "limit",
            VisualizationKind::Derivative => "derivative",
            VisualizationKind::Integral => "integral",
            VisualizationKind::None => "none",
        }
    }
}

/// Data-space bounds of the plot
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x_min: -5.0,
            x_max: 5.0,
            y_min: -5.0,
            y_max: 5.0,
        }
    }
}

impl Viewport {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn clamp_y(&self, y: f64) -> f64 {
        y.clamp(self.y_min, self.y_max)
    }
}

/// Kind-specific numeric parameters. Every field is optional on the wire;
/// animators fall back to viewport-derived defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualizationParams {
    /// Limit: the x-value being approached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_point: Option<f64>,
    /// Limit: starting distance of the moving points from `limit_point`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_offset: Option<f64>,
    /// Derivative: the point x0 where the tangent is taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
    /// Derivative: starting secant half-width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_h: Option<f64>,
    /// Integral: lower bound a
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    /// Integral: upper bound b
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
}

/// How a worked step should be styled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Neutral,
    Student,
    Correct,
    Error,
}

/// One line of worked math shown beside the plot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationStep {
    pub expression: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

/// A whiteboard instruction. Immutable once received; a new request replaces
/// the previous one wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationRequest {
    #[serde(default)]
    pub kind: VisualizationKind,
    #[serde(default)]
    pub title: String,
    pub function_expression: String,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub params: VisualizationParams,
    #[serde(default)]
    pub steps: Vec<VisualizationStep>,
}

impl Default for VisualizationRequest {
    fn default() -> Self {
        Self::neutral()
    }
}

impl VisualizationRequest {
    /// The "nothing to show" request used whenever the oracle omitted one.
    pub fn neutral() -> Self {
        Self {
            kind: VisualizationKind::None,
            title: PLACEHOLDER_TITLE.to_string(),
            function_expression: String::new(),
            viewport: Viewport::default(),
            params: VisualizationParams::default(),
            steps: Vec::new(),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.kind == VisualizationKind::None
    }

    /// Plain text suitable for a speech synthesizer: the title followed by
    /// each step and its annotation.
    pub fn narration(&self) -> String {
        let mut parts = Vec::with_capacity(self.steps.len() + 1);
        if !self.title.trim().is_empty() {
            parts.push(self.title.trim().to_string());
        }
        for step in &self.steps {
            match step.annotation.as_deref().map(str::trim) {
                Some(note) if !note.is_empty() => {
                    parts.push(format!("{}. {}", step.expression.trim(), note))
                }
                _ => parts.push(step.expression.trim().to_string()),
            }
        }
        parts.join(". ")
    }
}

// ==================== Geometry Types ====================

/// A point in data space
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Drawing command on the canvas
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
}

impl PathCommand {
    pub fn point(&self) -> Point {
        match *self {
            PathCommand::MoveTo { x, y } | PathCommand::LineTo { x, y } => Point::new(x, y),
        }
    }

    pub fn is_move(&self) -> bool {
        matches!(self, PathCommand::MoveTo { .. })
    }
}
