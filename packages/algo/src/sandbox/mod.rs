//! Expression Sandbox
//!
//! Compiles an untrusted function description such as `"(x^2-4)/(x-2)"` or
//! `"Math.sin(x) * x"` into an [`Evaluator`].
//!
//! The boundary has three gates:
//! - a character allow-list on the raw text
//! - identifier resolution against a fixed numeric namespace (`x`, `pi`,
//!   `e`, and the functions in [`library`])
//! - a probe: the compiled evaluator must be finite for at least one probe
//!   input
//!
//! Evaluation walks the resolved tree only; nothing outside the namespace is
//! reachable. Runtime failures (domain errors, division by zero, overflow)
//! produce `NaN`, read downstream as "undefined at this x".

pub mod library;
pub mod parser;
pub mod token;

use std::f64::consts::PI;

use thiserror::Error;

use parser::{Expr, Op, Parser};
use token::{is_allowed_char, Tokenizer};

/// Longest accepted expression, in characters
pub const MAX_EXPRESSION_LEN: usize = 512;

/// Inputs tried after compilation
pub const PROBE_INPUTS: [f64; 6] = [1.0, 0.5, -0.5, 2.0, 0.0, PI];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SandboxError {
    #[error("expression is empty")]
    Empty,
    #[error("expression exceeds {max} characters")]
    TooLong { max: usize },
    #[error("disallowed character {ch:?} at position {position}")]
    DisallowedCharacter { ch: char, position: usize },
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("function `{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("expression is undefined at every probe input")]
    ProbeFailed,
}

/// Classified evaluation result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Finite(f64),
    Undefined,
}

impl Sample {
    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Finite(v) => Some(v),
            Sample::Undefined => None,
        }
    }
}

/// A compiled, callable `f(x)`
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluator {
    source: String,
    expr: Expr,
}

impl Evaluator {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates at `x`. Never panics; any non-finite result is `NaN`.
    pub fn eval(&self, x: f64) -> f64 {
        eval_node(&self.expr, x)
    }

    pub fn classify(&self, x: f64) -> Sample {
        let y = self.eval(x);
        if y.is_finite() {
            Sample::Finite(y)
        } else {
            Sample::Undefined
        }
    }
}

/// Compiles `expression` or explains why it was rejected.
pub fn compile(expression: &str) -> Result<Evaluator, SandboxError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(SandboxError::Empty);
    }
    if trimmed.chars().count() > MAX_EXPRESSION_LEN {
        return Err(SandboxError::TooLong {
            max: MAX_EXPRESSION_LEN,
        });
    }
    if let Some((position, ch)) = trimmed.chars().enumerate().find(|(_, c)| !is_allowed_char(*c)) {
        return Err(SandboxError::DisallowedCharacter { ch, position });
    }

    let tokens = Tokenizer::new(trimmed).tokenize()?;
    let expr = Parser::new(tokens).parse()?;
    let evaluator = Evaluator {
        source: trimmed.to_string(),
        expr,
    };

    if !PROBE_INPUTS.iter().any(|&x| evaluator.eval(x).is_finite()) {
        return Err(SandboxError::ProbeFailed);
    }

    Ok(evaluator)
}

fn finite_or_nan(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        f64::NAN
    }
}

fn eval_node(expr: &Expr, x: f64) -> f64 {
    let value = match expr {
        Expr::Const(c) => *c,
        Expr::Var => x,
        Expr::Neg(inner) => -eval_node(inner, x),
        Expr::Binary { op, lhs, rhs } => {
            let a = eval_node(lhs, x);
            let b = eval_node(rhs, x);
            match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div => a / b,
                Op::Pow => a.powf(b),
            }
        }
        Expr::Call { func, args } => {
            let mut values = [f64::NAN; 2];
            for (slot, arg) in values.iter_mut().zip(args.iter()) {
                *slot = eval_node(arg, x);
            }
            func.apply(&values[..args.len().min(2)])
        }
    };
    finite_or_nan(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_math_pow_evaluates() {
        let f = compile("Math.pow(x,2)").unwrap();
        assert_eq!(f.eval(2.0), 4.0);
        assert_eq!(f.classify(3.0), Sample::Finite(9.0));
    }

    #[test]
    fn test_caret_and_bare_names() {
        let f = compile("x^2 + 2*x + 1").unwrap();
        assert_eq!(f.eval(1.0), 4.0);
        let g = compile("sin(pi/2) * x").unwrap();
        assert!(approx(g.eval(3.0), 3.0));
    }

    #[test]
    fn test_right_associative_power() {
        let f = compile("2^3^2").unwrap();
        assert_eq!(f.eval(0.0), 512.0);
    }

    #[test]
    fn test_negative_square() {
        let f = compile("-x^2").unwrap();
        assert_eq!(f.eval(3.0), -9.0);
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        let f = compile("1/x").unwrap();
        assert!(f.eval(0.0).is_nan());
        assert_eq!(f.classify(0.0), Sample::Undefined);
        assert_eq!(f.eval(4.0), 0.25);
    }

    #[test]
    fn test_removable_discontinuity() {
        let f = compile("(x^2-4)/(x-2)").unwrap();
        assert!(f.eval(2.0).is_nan());
        assert!(approx(f.eval(3.0), 5.0));
    }

    #[test]
    fn test_domain_error_is_nan() {
        let f = compile("sqrt(x)").unwrap();
        assert!(f.eval(-4.0).is_nan());
        assert_eq!(f.eval(9.0), 3.0);
    }

    #[test]
    fn test_overflow_is_nan() {
        let f = compile("exp(x)").unwrap();
        assert!(f.eval(1000.0).is_nan());
    }

    #[test]
    fn test_rejects_outside_namespace_at_compile_time() {
        for input in [
            "constructor",
            "process.exit(1)",
            "this",
            "x; while(1){}",
            "Function(x)",
            "globalThis",
            "Math.random()",
            "x.toString()",
        ] {
            assert!(compile(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn test_rejects_disallowed_characters() {
        assert_eq!(
            compile("x # 2"),
            Err(SandboxError::DisallowedCharacter {
                ch: '#',
                position: 2
            })
        );
        assert!(matches!(
            compile("x => x"),
            Err(SandboxError::DisallowedCharacter { ch: '=', .. })
        ));
    }

    #[test]
    fn test_rejects_empty_and_long() {
        assert_eq!(compile(""), Err(SandboxError::Empty));
        assert_eq!(compile("   "), Err(SandboxError::Empty));
        let long = "x+".repeat(300) + "x";
        assert_eq!(
            compile(&long),
            Err(SandboxError::TooLong {
                max: MAX_EXPRESSION_LEN
            })
        );
    }

    #[test]
    fn test_probe_rejects_everywhere_undefined() {
        assert_eq!(compile("sqrt(-1 - x^2)"), Err(SandboxError::ProbeFailed));
        assert_eq!(compile("1/0"), Err(SandboxError::ProbeFailed));
    }

    #[test]
    fn test_implicit_multiplication_evaluates() {
        let f = compile("3x^2 - 2(x - 1)").unwrap();
        assert_eq!(f.eval(2.0), 10.0);
        let g = compile("2e").unwrap();
        assert!(approx(g.eval(0.0), 2.0 * std::f64::consts::E));
    }

    #[test]
    fn test_variable_and_constants_multiply_parentheses() {
        assert_eq!(compile("x(x+1)").unwrap().eval(2.0), 6.0);
        assert_eq!(compile("x(x-2)").unwrap().eval(3.0), 3.0);
        assert!(approx(
            compile("pi(x+1)").unwrap().eval(2.0),
            3.0 * std::f64::consts::PI
        ));
        assert!(approx(compile("e(x)").unwrap().eval(2.0), 2.0 * std::f64::consts::E));
        assert_eq!(compile("(x+1)(x-1)").unwrap().eval(2.0), 3.0);
    }

    #[test]
    fn test_two_argument_functions() {
        let f = compile("max(x, 1) + min(x, 1)").unwrap();
        assert_eq!(f.eval(5.0), 6.0);
        let g = compile("atan2(1, x)").unwrap();
        assert!(approx(g.eval(1.0), std::f64::consts::FRAC_PI_4));
    }

    #[test]
    fn test_source_is_trimmed() {
        let f = compile("  x + 1 ").unwrap();
        assert_eq!(f.source(), "x + 1");
    }
}
