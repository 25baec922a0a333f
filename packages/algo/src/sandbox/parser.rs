//! Pratt parser: token stream → closed expression tree.
//!
//! Grammar (informal):
//!   infix   = prefix (OP prefix | implicit-mul prefix)*
//!   prefix  = ('-' | '+') prefix | atom
//!   atom    = NUMBER | 'x' | CONST | FUNC '(' args ')' | '(' infix ')'
//!
//! Identifiers resolve at parse time. The resulting tree references only the
//! variable `x`, literal numbers and library functions.

use super::library::{lookup_constant, Function};
use super::token::Token;
use super::SandboxError;

/// Maximum nesting of parentheses, calls and unary operators
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(f64),
    Var,
    Neg(Box<Expr>),
    Binary {
        op: Op,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Op {
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
            Op::Pow => 3,
        }
    }

    fn is_right_assoc(self) -> bool {
        matches!(self, Op::Pow)
    }
}

/// Unary minus binds looser than `^`, so `-x^2` is `-(x^2)`
const UNARY_BP: u8 = 3;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Expr, SandboxError> {
        if self.peek() == &Token::Eof {
            return Err(SandboxError::Empty);
        }
        let expr = self.parse_expr(0)?;
        if self.peek() != &Token::Eof {
            return Err(SandboxError::Syntax(format!(
                "unexpected token: {:?}",
                self.peek()
            )));
        }
        Ok(expr)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), SandboxError> {
        let tok = self.advance();
        if tok == expected {
            Ok(())
        } else {
            Err(SandboxError::Syntax(format!(
                "expected {expected:?}, found {tok:?}"
            )))
        }
    }

    fn enter(&mut self) -> Result<(), SandboxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SandboxError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, SandboxError> {
        self.enter()?;
        let mut lhs = self.parse_prefix()?;

        loop {
            let (op, implicit) = match self.peek() {
                Token::Plus => (Op::Add, false),
                Token::Minus => (Op::Sub, false),
                Token::Star => (Op::Mul, false),
                Token::Slash => (Op::Div, false),
                Token::Caret => (Op::Pow, false),
                // `2x`, `3(x+1)`, `sin(x)cos(x)`
                Token::Ident(_) | Token::LParen => (Op::Mul, true),
                _ => break,
            };

            let prec = op.precedence();
            if prec < min_bp {
                break;
            }
            if !implicit {
                self.advance();
            }

            let next_bp = if op.is_right_assoc() { prec } else { prec + 1 };
            let rhs = self.parse_expr(next_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        self.leave();
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, SandboxError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                let operand = self.parse_expr(UNARY_BP)?;
                Ok(Expr::Neg(Box::new(operand)))
            }
            Token::Plus => {
                self.advance();
                self.parse_expr(UNARY_BP)
            }
            _ => self.parse_atom(),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, SandboxError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Const(n)),
            Token::Ident(name) => {
                // `x(x+1)` and `pi(x+1)` are products, left to the implicit-mul branch
                if name == "x" {
                    return Ok(Expr::Var);
                }
                if let Some(value) = lookup_constant(&name) {
                    return Ok(Expr::Const(value));
                }
                if self.peek() == &Token::LParen {
                    return self.parse_call(name);
                }
                Err(SandboxError::UnknownIdentifier(name))
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(SandboxError::Syntax(format!("unexpected token: {other:?}"))),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, SandboxError> {
        let func = Function::lookup(&name).ok_or_else(|| SandboxError::UnknownIdentifier(name.clone()))?;
        self.expect(Token::LParen)?;

        let mut args = Vec::with_capacity(func.arity());
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.parse_expr(0)?);
                if self.peek() == &Token::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        self.expect(Token::RParen)?;

        if args.len() != func.arity() {
            return Err(SandboxError::Arity {
                name,
                expected: func.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call { func, args })
    }
}
