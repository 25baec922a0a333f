//! # calc-viz-algo - calculus whiteboard numeric core
//!
//! Pure Rust building blocks behind the tutor's whiteboard:
//!
//! - **Expression Sandbox** - untrusted formula text → closed-namespace evaluator
//! - **Curve Sampler** - evaluator + viewport → canvas path with pen-up breaks
//! - **Animators** - limit / derivative / integral frames as pure functions of time
//!
//! ## Module layout
//!
//! - [`sandbox`] - tokenizer, Pratt parser, numeric function library
//! - [`sampler`] - affine canvas mapping and path building
//! - [`animators`] - [`Scene`], [`Frame`], [`AnimationClock`]
//! - [`sanitize`] - viewport repair and drawability checks
//! - [`types`] - visualization request types and constants
//!
//! ## Example
//!
//! ```rust
//! use calc_viz_algo::{compile, sample_path, segment_count, Viewport};
//!
//! let f = compile("(x^2-4)/(x-2)").unwrap();
//! let viewport = Viewport { x_min: 0.0, x_max: 4.0, y_min: 0.0, y_max: 8.0 };
//! let path = sample_path(&f, &viewport, 800.0, 500.0, 4);
//! assert_eq!(segment_count(&path), 2);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod animators;
pub mod sampler;
pub mod sandbox;
pub mod sanitize;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use sandbox::{compile, Evaluator, Sample, SandboxError};

pub use sampler::{sample_path, sample_path_default, segment_count, to_svg_path, CanvasTransform};

pub use animators::{
    AnimationClock, DerivativeFrame, Frame, IntegralFrame, IntegralStage, LimitFrame, LineStyle,
    Rectangle, Scene,
};
