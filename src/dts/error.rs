//! Fatal errors raised while reading devicetree source.

use crate::diagnostics::{Component, ConversionError, ErrorKind, Severity};
use thiserror::Error;

/// A structural problem that stops parsing of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `"` string ran into the end of its line or the file.
    #[error("unterminated string starting at line {line}, column {column}")]
    UnterminatedString {
        /// Line of the opening quote
        line: usize,
        /// Column of the opening quote
        column: usize,
        /// Rendered source excerpt
        context: String,
    },

    /// A `<` array was never closed.
    #[error("unterminated array starting at line {line}, column {column}")]
    UnterminatedArray {
        /// Line of the opening bracket
        line: usize,
        /// Column of the opening bracket
        column: usize,
        /// Rendered source excerpt
        context: String,
    },

    /// A character that cannot start any token.
    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedCharacter {
        /// The offending character
        ch: char,
        /// Line of the character
        line: usize,
        /// Column of the character
        column: usize,
        /// Rendered source excerpt
        context: String,
    },

    /// The tokenizer gave up instead of looping forever.
    #[error("tokenizer exceeded {limit} steps near line {line}, column {column}")]
    IterationLimit {
        /// Step ceiling that was hit
        limit: usize,
        /// Line reached when the ceiling was hit
        line: usize,
        /// Column reached when the ceiling was hit
        column: usize,
    },

    /// Grammar violation (missing `{`, missing `;`, invalid value, ...).
    #[error("{message} at line {line}, column {column}")]
    Syntax {
        /// What was expected or found
        message: String,
        /// Line of the offending token
        line: usize,
        /// Column of the offending token
        column: usize,
        /// Rendered source excerpt
        context: String,
    },

    /// Two different nodes declare the same label.
    #[error("duplicate label '{label}' on {first} and {second}")]
    DuplicateLabel {
        /// The label
        label: String,
        /// Path of the node that declared it first
        first: String,
        /// Path of the node that declared it again
        second: String,
    },

    /// A recoverable condition reached the error threshold.
    #[error(transparent)]
    Escalated(#[from] ConversionError),
}

impl ParseError {
    /// Source position, when the error has one.
    #[must_use]
    pub const fn position(&self) -> Option<(usize, usize)> {
        match self {
            Self::UnterminatedString { line, column, .. }
            | Self::UnterminatedArray { line, column, .. }
            | Self::UnexpectedCharacter { line, column, .. }
            | Self::IterationLimit { line, column, .. }
            | Self::Syntax { line, column, .. } => Some((*line, *column)),
            Self::DuplicateLabel { .. } => None,
            Self::Escalated(error) => match (error.line, error.column) {
                (Some(line), Some(column)) => Some((line, column)),
                _ => None,
            },
        }
    }

    /// Converts the error into a diagnostic record for the summary.
    #[must_use]
    pub fn to_diagnostic(&self) -> ConversionError {
        let context = match self {
            Self::UnterminatedString { context, .. }
            | Self::UnterminatedArray { context, .. }
            | Self::UnexpectedCharacter { context, .. }
            | Self::Syntax { context, .. } => Some(context.clone()),
            Self::IterationLimit { .. } | Self::DuplicateLabel { .. } => None,
            Self::Escalated(error) => return error.clone(),
        };

        let component = match self {
            Self::Syntax { .. } | Self::DuplicateLabel { .. } => Component::Parser,
            _ => Component::Tokenizer,
        };

        let mut diagnostic = ConversionError::new(ErrorKind::ParseError, component, self.to_string())
            .with_severity(Severity::Error);
        if let Some((line, column)) = self.position() {
            diagnostic = diagnostic.with_position(line, column);
        }
        if let Some(context) = context.filter(|c| !c.is_empty()) {
            diagnostic = diagnostic.with_context(context);
        }
        diagnostic
    }
}
