//! Devicetree tokenizer.
//!
//! Turns keymap text into a flat token stream. Comments and preprocessor
//! leftovers are blanked out first (keeping every newline, so positions stay
//! exact), then a single forward scan produces tokens. Angle-bracket arrays
//! are captured whole as one [`TokenKind::Array`] token.

use super::error::ParseError;
use crate::diagnostics::render_context;
use serde::Serialize;

/// Token categories produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// Node name, property name, label, or bare word
    Ident,
    /// Decimal or hexadecimal integer
    Number,
    /// Contents of a `"..."` literal, escapes resolved
    String,
    /// Contents of a `<...>` array, brackets stripped
    Array,
    /// Contents of a `[...]` byte string, brackets stripped
    Bytes,
    /// `&label`, text holds the label without `&`
    Reference,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `=`
    Equals,
    /// `,`
    Comma,
    /// `/`
    Slash,
    /// End of input
    Eof,
}

/// One token with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Category
    pub kind: TokenKind,
    /// Token text (see [`TokenKind`] for what each kind stores)
    pub text: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// Byte offset into the cleaned source
    pub offset: usize,
}

impl Token {
    /// True when the token is an identifier with exactly this text.
    #[must_use]
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }
}

/// Tokenizes devicetree source.
///
/// Fails only on unterminated strings or arrays, characters that cannot start a
/// token, or when the step ceiling is hit.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let cleaned = blank_preprocessor_lines(&strip_comments(source));
    Lexer::new(&cleaned, source).run()
}

/// Replaces `//` and `/* */` comments with spaces, keeping newlines.
///
/// Comment markers inside string literals are left alone. Block comments do not
/// nest, and an unclosed block comment runs to the end of input.
#[must_use]
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' | '\n' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                out.push(' ');
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                    out.push(' ');
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push_str("  ");
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        out.push(' ');
                        break;
                    }
                    out.push(if next == '\n' { '\n' } else { ' ' });
                    previous = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Blanks lines left behind by the C preprocessor.
///
/// A line whose first non-blank character is `#` and that has no `=` is a line
/// marker (`# 12 "file.keymap"`) or an unexpanded directive (`#include`,
/// `#define`). Backslash continuations of a blanked line are blanked too.
/// `#binding-cells = <2>;` survives because of its `=`.
#[must_use]
pub fn blank_preprocessor_lines(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut continuing = false;

    for (index, line) in source.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }

        let trimmed = line.trim_start();
        let directive = trimmed.starts_with('#') && !trimmed.contains('=');
        if continuing || directive {
            continuing = line.trim_end().ends_with('\\');
            continue;
        }
        out.push_str(line);
    }

    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '#' | ',' | '.' | '+' | '?' | '@')
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-')
}

struct Lexer<'a> {
    chars: Vec<char>,
    original: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    offset: usize,
    steps: usize,
    limit: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(cleaned: &str, original: &'a str) -> Self {
        let chars: Vec<char> = cleaned.chars().collect();
        let limit = chars.len() * 4 + 1024;
        Self {
            chars,
            original,
            pos: 0,
            line: 1,
            column: 1,
            offset: 0,
            steps: 0,
            limit,
            tokens: Vec::new(),
        }
    }

    /// Overrides the step ceiling.
    #[cfg(test)]
    fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn tick(&mut self) -> Result<(), ParseError> {
        self.steps += 1;
        if self.steps > self.limit {
            return Err(ParseError::IterationLimit {
                limit: self.limit,
                line: self.line,
                column: self.column,
            });
        }
        Ok(())
    }

    fn context(&self, line: usize, column: usize) -> String {
        render_context(self.original, line, column)
    }

    fn push(&mut self, kind: TokenKind, text: String, start: (usize, usize, usize)) {
        self.tokens.push(Token {
            kind,
            text,
            line: start.0,
            column: start.1,
            offset: start.2,
        });
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            self.tick()?;

            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }

            let start = (self.line, self.column, self.offset);
            let Some(c) = self.peek() else {
                self.push(TokenKind::Eof, String::new(), start);
                break;
            };

            let single = match c {
                '{' => Some(TokenKind::LBrace),
                '}' => Some(TokenKind::RBrace),
                ';' => Some(TokenKind::Semicolon),
                ':' => Some(TokenKind::Colon),
                '=' => Some(TokenKind::Equals),
                ',' => Some(TokenKind::Comma),
                '/' => Some(TokenKind::Slash),
                _ => None,
            };
            if let Some(kind) = single {
                self.bump();
                self.push(kind, c.to_string(), start);
                continue;
            }

            match c {
                '"' => self.string(start)?,
                '<' => self.bracketed('<', '>', TokenKind::Array, start)?,
                '[' => self.bracketed('[', ']', TokenKind::Bytes, start)?,
                '&' => self.reference(start)?,
                c if is_ident_char(c) => self.word(start)?,
                other => {
                    return Err(ParseError::UnexpectedCharacter {
                        ch: other,
                        line: start.0,
                        column: start.1,
                        context: self.context(start.0, start.1),
                    })
                }
            }
        }

        Ok(self.tokens)
    }

    fn string(&mut self, start: (usize, usize, usize)) -> Result<(), ParseError> {
        self.bump();
        let mut text = String::new();

        loop {
            self.tick()?;
            match self.bump() {
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) if other != '\n' => text.push(other),
                    _ => return Err(self.unterminated_string(start)),
                },
                Some('\n') | None => return Err(self.unterminated_string(start)),
                Some(other) => text.push(other),
            }
        }

        self.push(TokenKind::String, text, start);
        Ok(())
    }

    fn unterminated_string(&self, start: (usize, usize, usize)) -> ParseError {
        ParseError::UnterminatedString {
            line: start.0,
            column: start.1,
            context: self.context(start.0, start.1),
        }
    }

    /// Captures a bracketed group as one token. `<<` and `>>` are shift
    /// operators inside arrays and never change the depth.
    fn bracketed(
        &mut self,
        open: char,
        close: char,
        kind: TokenKind,
        start: (usize, usize, usize),
    ) -> Result<(), ParseError> {
        self.bump();
        let mut depth = 1usize;
        let mut text = String::new();

        loop {
            self.tick()?;
            let Some(c) = self.peek() else {
                return Err(ParseError::UnterminatedArray {
                    line: start.0,
                    column: start.1,
                    context: self.context(start.0, start.1),
                });
            };

            if open == '<' && (c == '<' || c == '>') && self.peek_at(1) == Some(c) {
                self.bump();
                self.bump();
                text.push(c);
                text.push(c);
                continue;
            }

            self.bump();
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            text.push(c);
        }

        self.push(kind, text, start);
        Ok(())
    }

    fn reference(&mut self, start: (usize, usize, usize)) -> Result<(), ParseError> {
        self.bump();
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| is_label_char(*c)) {
            self.tick()?;
            self.bump();
            text.push(c);
        }

        if text.is_empty() {
            return Err(ParseError::UnexpectedCharacter {
                ch: '&',
                line: start.0,
                column: start.1,
                context: self.context(start.0, start.1),
            });
        }

        self.push(TokenKind::Reference, text, start);
        Ok(())
    }

    fn word(&mut self, start: (usize, usize, usize)) -> Result<(), ParseError> {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            self.tick()?;
            self.bump();
            text.push(c);
        }

        let kind = if super::expr::parse_integer(&text).is_some() {
            TokenKind::Number
        } else {
            TokenKind::Ident
        };
        self.push(kind, text, start);
        Ok(())
    }
}
