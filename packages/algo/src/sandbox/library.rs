//! The closed numeric namespace available to sandboxed expressions.

use std::f64::consts::{E, PI};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Ln,
    Log10,
    Log2,
    Exp,
    Abs,
    Pow,
    Sqrt,
    Cbrt,
    Floor,
    Ceil,
    Round,
    Sign,
    Min,
    Max,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" | "arcsin" => Function::Asin,
            "acos" | "arccos" => Function::Acos,
            "atan" | "arctan" => Function::Atan,
            "atan2" => Function::Atan2,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "asinh" => Function::Asinh,
            "acosh" => Function::Acosh,
            "atanh" => Function::Atanh,
            // `log` is the natural logarithm, as in the usual Math namespace
            "log" | "ln" => Function::Ln,
            "log10" => Function::Log10,
            "log2" => Function::Log2,
            "exp" => Function::Exp,
            "abs" => Function::Abs,
            "pow" => Function::Pow,
            "sqrt" => Function::Sqrt,
            "cbrt" => Function::Cbrt,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "round" => Function::Round,
            "sign" => Function::Sign,
            "min" => Function::Min,
            "max" => Function::Max,
            _ => return None,
        };
        Some(func)
    }

    pub const fn arity(self) -> usize {
        match self {
            Function::Atan2 | Function::Pow | Function::Min | Function::Max => 2,
            _ => 1,
        }
    }

    /// Applies the function. `args.len()` is guaranteed by the parser to
    /// equal `arity()`.
    pub fn apply(self, args: &[f64]) -> f64 {
        let a = args.first().copied().unwrap_or(f64::NAN);
        let b = args.get(1).copied().unwrap_or(f64::NAN);
        match self {
            Function::Sin => a.sin(),
            Function::Cos => a.cos(),
            Function::Tan => a.tan(),
            Function::Asin => a.asin(),
            Function::Acos => a.acos(),
            Function::Atan => a.atan(),
            Function::Atan2 => a.atan2(b),
            Function::Sinh => a.sinh(),
            Function::Cosh => a.cosh(),
            Function::Tanh => a.tanh(),
            Function::Asinh => a.asinh(),
            Function::Acosh => a.acosh(),
            Function::Atanh => a.atanh(),
            Function::Ln => a.ln(),
            Function::Log10 => a.log10(),
            Function::Log2 => a.log2(),
            Function::Exp => a.exp(),
            Function::Abs => a.abs(),
            Function::Pow => a.powf(b),
            Function::Sqrt => a.sqrt(),
            Function::Cbrt => a.cbrt(),
            Function::Floor => a.floor(),
            Function::Ceil => a.ceil(),
            Function::Round => a.round(),
            Function::Sign => {
                if a.is_nan() || a == 0.0 {
                    a
                } else {
                    a.signum()
                }
            }
            Function::Min => a.min(b),
            Function::Max => a.max(b),
        }
    }
}

pub fn lookup_constant(name: &str) -> Option<f64> {
    match name {
        "pi" | "PI" => Some(PI),
        "e" | "E" => Some(E),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_names() {
        assert_eq!(Function::lookup("sin"), Some(Function::Sin));
        assert_eq!(Function::lookup("log"), Some(Function::Ln));
        assert_eq!(Function::lookup("pow").map(Function::arity), Some(2));
        assert_eq!(Function::lookup("constructor"), None);
        assert_eq!(Function::lookup("eval"), None);
    }

    #[test]
    fn test_sign_matches_math_sign() {
        assert_eq!(Function::Sign.apply(&[0.0]), 0.0);
        assert_eq!(Function::Sign.apply(&[-3.0]), -1.0);
        assert_eq!(Function::Sign.apply(&[2.5]), 1.0);
        assert!(Function::Sign.apply(&[f64::NAN]).is_nan());
    }

    #[test]
    fn test_domain_errors_yield_nan() {
        assert!(Function::Sqrt.apply(&[-1.0]).is_nan());
        assert!(Function::Ln.apply(&[-1.0]).is_nan());
        assert!(Function::Asin.apply(&[2.0]).is_nan());
    }

    #[test]
    fn test_constants() {
        assert_eq!(lookup_constant("pi"), Some(PI));
        assert_eq!(lookup_constant("E"), Some(E));
        assert_eq!(lookup_constant("window"), None);
    }
}
