//! Data Sanitization
//!
//! Numerical stability utilities for oracle-supplied geometry.
//!
//! Functions:
//! - Viewport repair (non-finite, inverted or degenerate bounds)
//! - Parameter fallback for animator inputs

use crate::types::{Viewport, MAX_VIEWPORT_ABS, MIN_VIEWPORT_SPAN};

/// Returns `value` when finite, otherwise `fallback`
pub fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => fallback,
    }
}

/// Non-finite bounds fall back to the defaults, inverted bounds swap, tiny spans widen.
fn sanitize_axis(min: f64, max: f64, default_min: f64, default_max: f64) -> (f64, f64) {
    let (mut lo, mut hi) = if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (default_min, default_max)
    };

    lo = lo.clamp(-MAX_VIEWPORT_ABS, MAX_VIEWPORT_ABS);
    hi = hi.clamp(-MAX_VIEWPORT_ABS, MAX_VIEWPORT_ABS);

    if lo > hi {
        std::mem::swap(&mut lo, &mut hi);
    }

    if hi - lo < MIN_VIEWPORT_SPAN {
        let center = (lo + hi) / 2.0;
        lo = center - 1.0;
        hi = center + 1.0;
    }

    (lo, hi)
}

/// Repairs a viewport so its bounds support the canvas mapping.
pub fn sanitize_viewport(viewport: &Viewport) -> Viewport {
    let defaults = Viewport::default();
    let (x_min, x_max) = sanitize_axis(
        viewport.x_min,
        viewport.x_max,
        defaults.x_min,
        defaults.x_max,
    );
    let (y_min, y_max) = sanitize_axis(
        viewport.y_min,
        viewport.y_max,
        defaults.y_min,
        defaults.y_max,
    );
    Viewport {
        x_min,
        x_max,
        y_min,
        y_max,
    }
}

/// A sample is drawable when finite and no more than one viewport height
/// outside `[y_min, y_max]`.
pub fn is_drawable(y: f64, viewport: &Viewport) -> bool {
    if !y.is_finite() {
        return false;
    }
    let margin = viewport.height();
    y >= viewport.y_min - margin && y <= viewport.y_max + margin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_or() {
        assert_eq!(finite_or(Some(2.0), 0.0), 2.0);
        assert_eq!(finite_or(Some(f64::NAN), 1.0), 1.0);
        assert_eq!(finite_or(None, -3.0), -3.0);
    }

    #[test]
    fn test_sanitize_viewport_keeps_valid() {
        let vp = Viewport {
            x_min: -2.0,
            x_max: 3.0,
            y_min: -1.0,
            y_max: 9.0,
        };
        assert_eq!(sanitize_viewport(&vp), vp);
    }

    #[test]
    fn test_sanitize_viewport_swaps_inverted() {
        let vp = Viewport {
            x_min: 4.0,
            x_max: -4.0,
            y_min: 1.0,
            y_max: 0.0,
        };
        let fixed = sanitize_viewport(&vp);
        assert_eq!(fixed.x_min, -4.0);
        assert_eq!(fixed.x_max, 4.0);
        assert_eq!(fixed.y_min, 0.0);
        assert_eq!(fixed.y_max, 1.0);
    }

    #[test]
    fn test_sanitize_viewport_replaces_non_finite() {
        let vp = Viewport {
            x_min: f64::NAN,
            x_max: 1.0,
            y_min: -1.0,
            y_max: f64::INFINITY,
        };
        let fixed = sanitize_viewport(&vp);
        assert_eq!(fixed, Viewport::default());
    }

    #[test]
    fn test_sanitize_viewport_widens_degenerate() {
        let vp = Viewport {
            x_min: 2.0,
            x_max: 2.0,
            y_min: 0.0,
            y_max: 1.0,
        };
        let fixed = sanitize_viewport(&vp);
        assert_eq!(fixed.x_min, 1.0);
        assert_eq!(fixed.x_max, 3.0);
    }

    #[test]
    fn test_is_drawable_margin() {
        let vp = Viewport {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 2.0,
        };
        assert!(is_drawable(1.0, &vp));
        assert!(is_drawable(3.9, &vp));
        assert!(is_drawable(-2.0, &vp));
        assert!(!is_drawable(4.1, &vp));
        assert!(!is_drawable(-2.5, &vp));
        assert!(!is_drawable(f64::NAN, &vp));
        assert!(!is_drawable(f64::INFINITY, &vp));
    }
}
