//! Diagnostic records produced by every conversion stage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How serious a reported condition is.
///
/// Severities are ordered, so `Severity::Warning < Severity::Error` holds and a
/// threshold comparison is a plain `>=`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Trace-level detail, only interesting while debugging a conversion
    Debug,
    /// Something was handled in a non-obvious way but nothing was lost
    Info,
    /// Input could not be translated faithfully; a placeholder or comment was emitted
    Warning,
    /// A structural problem that aborts the current document
    #[default]
    Error,
    /// The run cannot continue at all
    Critical,
}

impl Severity {
    /// All severities from least to most serious.
    pub const ALL: [Self; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Lowercase name used in summaries and config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" | "fatal" => Ok(Self::Critical),
            other => Err(format!(
                "unknown severity '{other}' (expected debug, info, warning, error or critical)"
            )),
        }
    }
}

/// Taxonomy of conditions the pipeline can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The external C preprocessor could not be run or failed
    PreprocessorFailure,
    /// Structural syntax problem in the devicetree source
    ParseError,
    /// A behavior or layer node could not be extracted and was skipped
    ExtractionError,
    /// A modifier expression such as `LC(` could not be parsed
    MalformedMacro,
    /// A binding referenced a behavior or layer that does not exist
    BindingResolutionError,
    /// A timing value was non-positive or implausibly large
    TimingValidationError,
}

impl ErrorKind {
    /// Severity a condition of this kind carries unless stated otherwise.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::PreprocessorFailure => Severity::Critical,
            Self::ParseError => Severity::Error,
            Self::ExtractionError
            | Self::MalformedMacro
            | Self::BindingResolutionError
            | Self::TimingValidationError => Severity::Warning,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreprocessorFailure => write!(f, "Preprocessor Failure"),
            Self::ParseError => write!(f, "Parse Error"),
            Self::ExtractionError => write!(f, "Extraction Error"),
            Self::MalformedMacro => write!(f, "Malformed Macro"),
            Self::BindingResolutionError => write!(f, "Binding Resolution Error"),
            Self::TimingValidationError => write!(f, "Timing Validation Error"),
        }
    }
}

/// Pipeline stage that reported a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    /// External C preprocessor invocation
    Preprocessor,
    /// Raw text to token stream
    Tokenizer,
    /// Token stream to node tree
    Parser,
    /// Node tree to keymap model
    Extractor,
    /// `LC(LS(A))` style expressions
    ModifierResolver,
    /// Key name lookups
    Keycodes,
    /// Hold-tap and layer-tap definitions
    HoldTap,
    /// Macro step scripts
    Macro,
    /// One-shot keys
    StickyKey,
    /// Layer switching behaviors
    Layer,
    /// Chords
    Combo,
    /// Tap-dance definitions
    TapDance,
    /// Mod-morph definitions
    ModMorph,
    /// Final text assembly
    Assembler,
}

impl Component {
    /// Stable kebab-case name used in summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preprocessor => "preprocessor",
            Self::Tokenizer => "tokenizer",
            Self::Parser => "parser",
            Self::Extractor => "extractor",
            Self::ModifierResolver => "modifier-resolver",
            Self::Keycodes => "keycodes",
            Self::HoldTap => "hold-tap",
            Self::Macro => "macro",
            Self::StickyKey => "sticky-key",
            Self::Layer => "layer",
            Self::Combo => "combo",
            Self::TapDance => "tap-dance",
            Self::ModMorph => "mod-morph",
            Self::Assembler => "assembler",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported condition with its source location and context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionError {
    /// What went wrong
    pub kind: ErrorKind,
    /// How serious it is
    pub severity: Severity,
    /// Which stage reported it
    pub component: Component,
    /// Human-readable description
    pub message: String,
    /// 1-based source line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based source column, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// Rendered source excerpt or node path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Optional hint for fixing the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ConversionError {
    /// Creates a diagnostic with the kind's default severity.
    pub fn new(kind: ErrorKind, component: Component, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            component,
            message: message.into(),
            line: None,
            column: None,
            context: None,
            suggestion: None,
        }
    }

    /// Overrides the severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the source position.
    #[must_use]
    pub const fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Sets the source line only.
    #[must_use]
    pub const fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attaches a context excerpt (rendered snippet, node path, property name).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets a suggestion for fixing the input.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// One-line rendering used in the summary section of generated files.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let location = match (self.line, self.column) {
            (Some(line), Some(column)) => format!(" (line {line}, column {column})"),
            (Some(line), None) => format!(" (line {line})"),
            _ => String::new(),
        };
        format!(
            "{}[{}] {}: {}{}",
            self.severity, self.component, self.kind, self.message, location
        )
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(
                f,
                "[{} {}:{}] {}: {}",
                self.component, line, column, self.kind, self.message
            )?,
            (Some(line), None) => write!(
                f,
                "[{} {}] {}: {}",
                self.component, line, self.kind, self.message
            )?,
            _ => write!(f, "[{}] {}: {}", self.component, self.kind, self.message)?,
        }

        if let Some(context) = &self.context {
            write!(f, "\n{context}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n    → {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ConversionError {}
