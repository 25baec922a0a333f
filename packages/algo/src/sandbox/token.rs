//! Tokenizer for sandboxed expressions.
//!
//! Supports numbers (including `1.5e-3`), identifiers with an optional
//! `Math.` prefix (library functions, `PI` and `E` only), operators `+ - * / ^ **`, parentheses and commas.
//! Any other character is rejected here, before parsing starts.

use super::library::Function;
use super::SandboxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
    Eof,
}

/// Characters that may appear anywhere in an expression. Letters are further
/// restricted by the identifier allow-list in the parser.
pub fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_digit()
        || ch.is_ascii_alphabetic()
        || ch == ' '
        || ch == '\t'
        || matches!(ch, '+' | '-' | '*' | '/' | '^' | '(' | ')' | ',' | '.')
}

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, SandboxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(ch) = self.current() else {
                tokens.push(Token::Eof);
                return Ok(tokens);
            };
            let tok = match ch {
                '+' => {
                    self.pos += 1;
                    Token::Plus
                }
                '-' => {
                    self.pos += 1;
                    Token::Minus
                }
                '*' => {
                    self.pos += 1;
                    if self.current() == Some('*') {
                        self.pos += 1;
                        Token::Caret
                    } else {
                        Token::Star
                    }
                }
                '/' => {
                    self.pos += 1;
                    Token::Slash
                }
                '^' => {
                    self.pos += 1;
                    Token::Caret
                }
                '(' => {
                    self.pos += 1;
                    Token::LParen
                }
                ')' => {
                    self.pos += 1;
                    Token::RParen
                }
                ',' => {
                    self.pos += 1;
                    Token::Comma
                }
                c if c.is_ascii_digit() || c == '.' => self.read_number()?,
                c if c.is_ascii_alphabetic() => self.read_ident()?,
                other => {
                    return Err(SandboxError::DisallowedCharacter {
                        ch: other,
                        position: self.pos,
                    })
                }
            };
            tokens.push(tok);
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|c| c == ' ' || c == '\t') {
            self.pos += 1;
        }
    }

    fn consume_digits(&mut self) {
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    /// Reads `42`, `3.14`, `.5`, `1.5e-3`. An `e` only starts an exponent
    /// when a digit (optionally signed) follows, so `2e` and `2exp(x)` keep
    /// their identifiers.
    fn read_number(&mut self) -> Result<Token, SandboxError> {
        let start = self.pos;
        self.consume_digits();
        if self.current() == Some('.') {
            self.pos += 1;
            self.consume_digits();
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let exponent_follows = match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent_follows {
                self.pos += 2;
                self.consume_digits();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| SandboxError::Syntax(format!("invalid number: {text}")))
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.current().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn read_ident(&mut self) -> Result<Token, SandboxError> {
        let word = self.read_word();
        if word == "Math" {
            if self.current() != Some('.') {
                return Err(SandboxError::UnknownIdentifier(word));
            }
            self.pos += 1;
            if !self.current().is_some_and(|c| c.is_ascii_alphabetic()) {
                return Err(SandboxError::Syntax("expected a name after `Math.`".into()));
            }
            let member = self.read_word();
            if Function::lookup(&member).is_none() && !matches!(member.as_str(), "PI" | "E") {
                return Err(SandboxError::UnknownIdentifier(format!("Math.{member}")));
            }
            return Ok(Token::Ident(member));
        }
        Ok(Token::Ident(word))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(input).tokenize().unwrap()
    }

    #[test]
    fn test_basic_operators() {
        assert_eq!(
            tokens("x^2 + 1"),
            vec![
                Token::Ident("x".into()),
                Token::Caret,
                Token::Number(2.0),
                Token::Plus,
                Token::Number(1.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_double_star_is_power() {
        assert_eq!(tokens("x**3")[1], Token::Caret);
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(tokens("1.5e-3")[0], Token::Number(1.5e-3));
        assert_eq!(tokens(".25")[0], Token::Number(0.25));
    }

    #[test]
    fn test_e_without_digits_stays_identifier() {
        assert_eq!(
            tokens("2e"),
            vec![Token::Number(2.0), Token::Ident("e".into()), Token::Eof]
        );
        assert_eq!(tokens("2exp(x)")[1], Token::Ident("exp".into()));
    }

    #[test]
    fn test_math_prefix_is_stripped() {
        assert_eq!(tokens("Math.pow(x,2)")[0], Token::Ident("pow".into()));
        assert_eq!(tokens("Math.PI")[0], Token::Ident("PI".into()));
    }

    #[test]
    fn test_disallowed_characters() {
        for input in ["x; 1", "x[0]", "\"x\"", "x = 1", "a_b", "x{}", "`x`", "x\n+1"] {
            let err = Tokenizer::new(input).tokenize().unwrap_err();
            assert!(
                matches!(err, SandboxError::DisallowedCharacter { .. }),
                "{input}: {err:?}"
            );
        }
    }

    #[test]
    fn test_bare_math_is_rejected() {
        assert!(Tokenizer::new("Math").tokenize().is_err());
        assert!(Tokenizer::new("Math.(x)").tokenize().is_err());
    }

    #[test]
    fn test_math_prefix_only_before_library_names() {
        for input in ["Math.x", "Math.pi", "Math.random()", "Math.constructor"] {
            let err = Tokenizer::new(input).tokenize().unwrap_err();
            assert!(matches!(err, SandboxError::UnknownIdentifier(_)), "{input}: {err:?}");
        }
        assert_eq!(tokens("Math.E")[0], Token::Ident("E".into()));
        assert_eq!(tokens("Math.sqrt(x)")[0], Token::Ident("sqrt".into()));
    }
}
