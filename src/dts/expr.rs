//! Integer literals and constant expressions found inside array cells.
//!
//! Fully preprocessed keymaps contain cells such as `((0x07 << 16) | 0x04)`
//! where a keycode macro was expanded. Only integer arithmetic is supported;
//! anything with an identifier in it evaluates to `None`.

/// Parses a decimal or `0x` hexadecimal literal, with optional sign and C
/// integer suffixes (`U`, `L`, `UL`, ...).
#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let body = body.trim_end_matches(['u', 'U', 'l', 'L']);
    if body.is_empty() {
        return None;
    }

    let value = if let Some(hex) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else {
        if !body.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        body.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}

/// Evaluates a C-style constant integer expression.
///
/// Supports parentheses, unary `- ~ +`, and binary `* / % + - << >> & ^ |`
/// with C precedence.
#[must_use]
pub fn evaluate(text: &str) -> Option<i64> {
    let tokens = lex(text)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let value = parser.binary(0)?;
    if parser.pos == parser.tokens.len() {
        Some(value)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExprToken {
    Number(i64),
    Op(&'static str),
    Open,
    Close,
}

fn lex(text: &str) -> Option<Vec<ExprToken>> {
    const OPERATORS: [&str; 11] = ["<<", ">>", "|", "&", "^", "+", "-", "*", "/", "%", "~"];

    let mut tokens = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('(') {
            tokens.push(ExprToken::Open);
            rest = after;
        } else if let Some(after) = rest.strip_prefix(')') {
            tokens.push(ExprToken::Close);
            rest = after;
        } else if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            tokens.push(ExprToken::Op(op));
            rest = &rest[op.len()..];
        } else {
            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            if end == 0 {
                return None;
            }
            tokens.push(ExprToken::Number(parse_integer(&rest[..end])?));
            rest = &rest[end..];
        }
        rest = rest.trim_start();
    }

    Some(tokens)
}

struct ExprParser {
    tokens: Vec<ExprToken>,
    pos: usize,
}

fn precedence(op: &str) -> Option<u8> {
    match op {
        "|" => Some(1),
        "^" => Some(2),
        "&" => Some(3),
        "<<" | ">>" => Some(4),
        "+" | "-" => Some(5),
        "*" | "/" | "%" => Some(6),
        _ => None,
    }
}

impl ExprParser {
    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn binary(&mut self, min: u8) -> Option<i64> {
        let mut left = self.unary()?;

        while let Some(ExprToken::Op(op)) = self.peek() {
            let op = *op;
            let Some(prec) = precedence(op).filter(|p| *p > min) else {
                break;
            };
            self.pos += 1;
            let right = self.binary(prec)?;
            left = apply(op, left, right)?;
        }

        Some(left)
    }

    fn unary(&mut self) -> Option<i64> {
        match self.peek()?.clone() {
            ExprToken::Op("-") => {
                self.pos += 1;
                self.unary()?.checked_neg()
            }
            ExprToken::Op("+") => {
                self.pos += 1;
                self.unary()
            }
            ExprToken::Op("~") => {
                self.pos += 1;
                Some(!self.unary()?)
            }
            ExprToken::Number(n) => {
                self.pos += 1;
                Some(n)
            }
            ExprToken::Open => {
                self.pos += 1;
                let value = self.binary(0)?;
                if self.peek() == Some(&ExprToken::Close) {
                    self.pos += 1;
                    Some(value)
                } else {
                    None
                }
            }
            ExprToken::Op(_) | ExprToken::Close => None,
        }
    }
}

fn apply(op: &str, left: i64, right: i64) -> Option<i64> {
    match op {
        "|" => Some(left | right),
        "^" => Some(left ^ right),
        "&" => Some(left & right),
        "<<" => u32::try_from(right).ok().and_then(|r| left.checked_shl(r)),
        ">>" => u32::try_from(right).ok().and_then(|r| left.checked_shr(r)),
        "+" => left.checked_add(right),
        "-" => left.checked_sub(right),
        "*" => left.checked_mul(right),
        "/" => left.checked_div(right),
        "%" => left.checked_rem(right),
        _ => None,
    }
}
