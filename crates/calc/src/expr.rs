//! Arithmetic expression evaluator.
//!
//! Grammar, whitespace ignored:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('+' | '-') unary | atom
//! atom   := number | '(' expr ')'
//! number := digits ['.' digits] | '.' digits
//! ```
//!
//! Integer operands stay integers under `+ - *`; division always yields a
//! float.

use std::fmt;

/// Evaluation result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn to_json(self) -> serde_json::Value {
        match self {
            Number::Int(i) => serde_json::json!(i),
            Number::Float(f) => serde_json::json!(f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            // Whole floats keep a trailing ".0" so 100 / 4 reads "25.0".
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    InvalidCharacters,
    Syntax,
    DivisionByZero,
    Overflow,
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ExprError::InvalidCharacters => "Invalid characters in expression",
            ExprError::Syntax => "Invalid arithmetic expression",
            ExprError::DivisionByZero => "Division by zero",
            ExprError::Overflow => "Result out of range",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ExprError {}

/// Evaluate `input`. Only digits, `+ - * / ( ) .` and whitespace are allowed.
pub fn evaluate(input: &str) -> Result<Number, ExprError> {
    let compact: Vec<u8> = input.bytes().filter(|b| *b != b' ').collect();
    if compact.is_empty()
        || !compact
            .iter()
            .all(|b| b.is_ascii_digit() || b"+-*/().".contains(b))
    {
        return Err(ExprError::InvalidCharacters);
    }

    let mut parser = Parser {
        src: &compact,
        pos: 0,
    };
    let value = parser.expr()?;
    if parser.pos != compact.len() {
        return Err(ExprError::Syntax);
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut acc = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = apply(op, acc, rhs)?;
        }
        Ok(acc)
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut acc = self.unary()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = apply(op, acc, rhs)?;
        }
        Ok(acc)
    }

    fn unary(&mut self) -> Result<Number, ExprError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                apply(b'-', Number::Int(0), self.unary()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Number, ExprError> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(ExprError::Syntax);
                }
                self.pos += 1;
                Ok(value)
            }
            Some(b) if b.is_ascii_digit() || b == b'.' => self.number(),
            _ => Err(ExprError::Syntax),
        }
    }

    fn number(&mut self) -> Result<Number, ExprError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text = std::str::from_utf8(&self.src[start..self.pos]).map_err(|_| ExprError::Syntax)?;
        if text == "." {
            return Err(ExprError::Syntax);
        }
        if is_float {
            text.parse::<f64>()
                .map(Number::Float)
                .map_err(|_| ExprError::Syntax)
        } else {
            text.parse::<i64>()
                .map(Number::Int)
                .map_err(|_| ExprError::Overflow)
        }
    }
}

fn apply(op: u8, lhs: Number, rhs: Number) -> Result<Number, ExprError> {
    if op == b'/' {
        let divisor = rhs.as_f64();
        if divisor == 0.0 {
            return Err(ExprError::DivisionByZero);
        }
        return Ok(Number::Float(lhs.as_f64() / divisor));
    }

    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => {
            let result = match op {
                b'+' => a.checked_add(b),
                b'-' => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            result.map(Number::Int).ok_or(ExprError::Overflow)
        }
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            Ok(Number::Float(match op {
                b'+' => a + b,
                b'-' => a - b,
                _ => a * b,
            }))
        }
    }
}
