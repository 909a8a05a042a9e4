//! Shared CLI plumbing: error type, exit codes and config/preprocessor setup.

use crate::config::Config;
use crate::dts::Preprocessor;
use crate::pipeline::ConversionFailure;
use std::fmt;
use std::path::{Path, PathBuf};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Conversion succeeded
    Success = 0,
    /// Conversion failed (preprocessor, parse, I/O, threshold)
    Failure = 1,
    /// Bad invocation or unusable configuration
    Usage = 2,
}

impl ExitCode {
    /// Numeric code passed to `std::process::exit`.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Error returned by a command's `execute`.
#[derive(Debug)]
pub struct CliError {
    /// How the process should exit
    pub exit_code: ExitCode,
    /// Message printed after `Error:`
    pub message: String,
}

impl CliError {
    /// A failed conversion or unreadable/unwritable file.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Failure,
            message: message.into(),
        }
    }

    /// A problem with the invocation itself.
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

impl From<ConversionFailure> for CliError {
    fn from(failure: ConversionFailure) -> Self {
        match failure.to_diagnostic() {
            Some(diagnostic) => Self::failure(diagnostic.to_string()),
            None => Self::failure(failure.to_string()),
        }
    }
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Options shared by every subcommand that reads a keymap.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions<'a> {
    /// `-I` directories from the command line
    pub include_dirs: &'a [PathBuf],
    /// `--no-preprocess`
    pub no_preprocess: bool,
    /// `--cpp`
    pub cpp: Option<&'a str>,
}

/// Loads the config file named on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> CliResult<Config> {
    let result = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::usage(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Config::load_from(path)
        }
        None => Config::load(),
    };
    result.map_err(|e| CliError::usage(format!("Failed to load config: {e:#}")))
}

/// Builds the preprocessor for a run, or `None` when preprocessing is disabled.
pub fn preprocessor_for(config: &Config, options: &SourceOptions<'_>) -> Option<Preprocessor> {
    if options.no_preprocess {
        return None;
    }
    let mut settings = config.preprocessor.clone();
    if let Some(cpp) = options.cpp {
        settings.command = cpp.to_string();
    }
    Some(settings.preprocessor(options.include_dirs))
}

/// Fails early with a readable message when the input is missing.
pub fn require_input(path: &Path) -> CliResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::failure(format!(
            "Keymap file not found: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Component, ConversionError, ErrorKind};

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(CliError::failure("x").exit_code.code(), 1);
        assert_eq!(CliError::usage("x").exit_code.code(), 2);
    }

    #[test]
    fn test_threshold_failure_message() {
        let failure = ConversionFailure::Threshold(ConversionError::new(
            ErrorKind::BindingResolutionError,
            Component::Extractor,
            "unknown behavior '&bogus'",
        ));
        let err = CliError::from(failure);
        assert_eq!(err.exit_code, ExitCode::Failure);
        assert!(err.message.contains("&bogus"));
    }

    #[test]
    fn test_preprocessor_disabled() {
        let config = Config::default();
        let options = SourceOptions {
            no_preprocess: true,
            ..SourceOptions::default()
        };
        assert!(preprocessor_for(&config, &options).is_none());
    }

    #[test]
    fn test_cpp_override() {
        let config = Config::default();
        let options = SourceOptions {
            cpp: Some("clang-cpp"),
            ..SourceOptions::default()
        };
        let preprocessor = preprocessor_for(&config, &options).unwrap();
        assert_eq!(preprocessor.command(), "clang-cpp");
    }
}
