//! End-to-end conversion: source text (or file) to Kanata text plus metadata.
//!
//! Every call builds its own [`ErrorManager`], so one [`Converter`] can be
//! shared freely between conversions.

use crate::diagnostics::{ConversionError, ErrorManager, ErrorReport, Severity};
use crate::dts::{self, ParseError, Preprocessor, PreprocessorError};
use crate::extract::extract;
use crate::keycodes::{KeycodeDb, ModifierConvention};
use crate::models::KeymapConfig;
use crate::output::{assemble, AssembleOptions, ConversionMetadata};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Settings for a [`Converter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// GUI naming convention
    pub convention: ModifierConvention,
    /// Severity at which a diagnostic aborts the run
    pub threshold: Severity,
    /// Name written into the header; file conversions default to the file name
    pub source_name: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            convention: ModifierConvention::Pc,
            threshold: Severity::Error,
            source_name: None,
        }
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    /// Kanata configuration text
    pub kanata: String,
    /// Layer count, settings and diagnostics
    pub metadata: ConversionMetadata,
}

/// Result of extraction without assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// The keymap model
    pub config: KeymapConfig,
    /// Diagnostics collected while reading it
    pub error_report: ErrorReport,
}

/// Why a conversion produced no output.
#[derive(Debug, Error)]
pub enum ConversionFailure {
    /// The C preprocessor could not run or failed.
    #[error(transparent)]
    Preprocessor(#[from] PreprocessorError),

    /// The source is structurally invalid.
    #[error("parse error: {0}")]
    Parse(ParseError),

    /// A diagnostic reached the configured threshold.
    #[error("conversion stopped at {}: {}", .0.severity, .0)]
    Threshold(ConversionError),

    /// The input could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl From<ParseError> for ConversionFailure {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Escalated(error) => Self::Threshold(error),
            other => Self::Parse(other),
        }
    }
}

impl From<ConversionError> for ConversionFailure {
    fn from(error: ConversionError) -> Self {
        Self::Threshold(error)
    }
}

impl ConversionFailure {
    /// The failure as a diagnostic, for uniform reporting.
    #[must_use]
    pub fn to_diagnostic(&self) -> Option<ConversionError> {
        match self {
            Self::Preprocessor(error) => Some(error.to_diagnostic()),
            Self::Parse(error) => Some(error.to_diagnostic()),
            Self::Threshold(error) => Some(error.clone()),
            Self::Io { .. } => None,
        }
    }
}

/// Converts ZMK keymaps to Kanata configurations.
#[derive(Debug, Clone)]
pub struct Converter {
    options: ConvertOptions,
    keycodes: &'static KeycodeDb,
}

impl Converter {
    /// Creates a converter using the built-in keycode table.
    #[must_use]
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            keycodes: KeycodeDb::builtin(),
        }
    }

    /// The options this converter runs with.
    #[must_use]
    pub const fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Converts already-preprocessed source text.
    pub fn convert_str(&self, source: &str) -> Result<ConversionOutput, ConversionFailure> {
        self.convert_named(source, self.options.source_name.as_deref())
    }

    /// Reads (and, with a preprocessor, expands) `path`, then converts it.
    pub fn convert_file(
        &self,
        path: &Path,
        preprocessor: Option<&Preprocessor>,
    ) -> Result<ConversionOutput, ConversionFailure> {
        let source = read_source(path, preprocessor)?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let name = self.options.source_name.clone().or(file_name);
        self.convert_named(&source, name.as_deref())
    }

    /// Parses and extracts source text without generating output.
    pub fn extract_str(&self, source: &str) -> Result<Extraction, ConversionFailure> {
        let mut errors = ErrorManager::new(self.options.threshold);
        let root = dts::parse(source, &mut errors)?;
        let config = extract(&root, &mut errors)?;
        Ok(Extraction {
            config,
            error_report: errors.report_summary(),
        })
    }

    /// [`Converter::extract_str`] over a file.
    pub fn extract_file(
        &self,
        path: &Path,
        preprocessor: Option<&Preprocessor>,
    ) -> Result<Extraction, ConversionFailure> {
        let source = read_source(path, preprocessor)?;
        self.extract_str(&source)
    }

    fn convert_named(
        &self,
        source: &str,
        source_name: Option<&str>,
    ) -> Result<ConversionOutput, ConversionFailure> {
        let mut errors = ErrorManager::new(self.options.threshold);

        let root = dts::parse(source, &mut errors)?;
        let config = extract(&root, &mut errors)?;

        let options = AssembleOptions {
            keycodes: self.keycodes,
            convention: self.options.convention,
            source_name,
        };
        let assembled = assemble(&config, &options, &mut errors)?;
        let metadata = ConversionMetadata::new(&config, assembled.stats, &errors);

        info!(
            layers = metadata.layer_count,
            diagnostics = metadata.error_report.total,
            "conversion finished"
        );

        Ok(ConversionOutput {
            kanata: assembled.text,
            metadata,
        })
    }
}

fn read_source(path: &Path, preprocessor: Option<&Preprocessor>) -> Result<String, ConversionFailure> {
    match preprocessor {
        Some(preprocessor) => Ok(preprocessor.expand(path)?),
        None => std::fs::read_to_string(path).map_err(|source| ConversionFailure::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    const KEYMAP: &str = r#"
/ {
    keymap {
        compatible = "zmk,keymap";
        default_layer {
            bindings = <&kp A &kp B>;
        };
    };
};
"#;

    #[test]
    fn test_convert_str() {
        let output = Converter::new(ConvertOptions::default()).convert_str(KEYMAP).unwrap();
        assert!(output.kanata.contains("(deflayer default\n  a b\n)"));
        assert_eq!(output.metadata.layer_count, 1);
        assert_eq!(output.metadata.error_report.total, 0);
    }

    #[test]
    fn test_parse_failure() {
        let err = Converter::new(ConvertOptions::default())
            .convert_str("/ { keymap { bindings = <&kp A; }; };")
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::Parse(_)));
        assert!(err.to_diagnostic().is_some());
    }

    #[test]
    fn test_strict_threshold_stops_on_warning() {
        let options = ConvertOptions {
            threshold: Severity::Warning,
            ..ConvertOptions::default()
        };
        let source = KEYMAP.replace("&kp B", "&bogus");
        let err = Converter::new(options).convert_str(&source).unwrap_err();
        match err {
            ConversionFailure::Threshold(error) => {
                assert_eq!(error.kind, ErrorKind::BindingResolutionError);
            }
            other => panic!("expected threshold failure, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Converter::new(ConvertOptions::default())
            .convert_file(Path::new("/nonexistent/zmk-kanata/test.keymap"), None)
            .unwrap_err();
        assert!(matches!(err, ConversionFailure::Io { .. }));
    }
}
