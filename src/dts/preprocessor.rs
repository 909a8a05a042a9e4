//! C preprocessor invocation.
//!
//! ZMK keymaps `#include` devicetree headers and use `#define`d layer names,
//! so real inputs are expanded by the system preprocessor before tokenizing.
//! This is the only stage that can block, and its failure is fatal.

use crate::diagnostics::{Component, ConversionError, ErrorKind};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Default preprocessor executable.
pub const DEFAULT_COMMAND: &str = "cpp";

/// A `file:line:col: message` diagnostic printed by the preprocessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessorDiagnostic {
    /// File the preprocessor complained about
    pub file: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// Message text, e.g. `fatal error: keys.h: No such file or directory`
    pub message: String,
}

/// Why preprocessing failed.
#[derive(Debug, Error)]
pub enum PreprocessorError {
    /// The input path does not exist.
    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    /// The executable could not be started.
    #[error("failed to run preprocessor '{command}': {source}")]
    Launch {
        /// Executable that was attempted
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The preprocessor ran but exited unsuccessfully.
    #[error("preprocessor exited with {status}: {message}")]
    Failed {
        /// Exit status description
        status: String,
        /// First meaningful line of stderr
        message: String,
        /// Every parsed `file:line:col:` diagnostic
        diagnostics: Vec<PreprocessorDiagnostic>,
    },
}

impl PreprocessorError {
    /// Converts the failure into a critical diagnostic.
    #[must_use]
    pub fn to_diagnostic(&self) -> ConversionError {
        let mut error = ConversionError::new(
            ErrorKind::PreprocessorFailure,
            Component::Preprocessor,
            self.to_string(),
        );

        if let Self::Failed { diagnostics, .. } = self {
            if let Some(first) = diagnostics.first() {
                error = error
                    .with_position(first.line, first.column)
                    .with_context(first.file.clone());
            }
        }

        if matches!(self, Self::Launch { .. }) {
            error = error.with_suggestion(
                "install a C preprocessor, pass --cpp <path>, or use --no-preprocess",
            );
        }

        error
    }
}

/// Runs the system C preprocessor over keymap files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessor {
    command: String,
    include_dirs: Vec<PathBuf>,
    defines: Vec<String>,
}

impl Preprocessor {
    /// Creates a preprocessor that runs `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            include_dirs: Vec::new(),
            defines: vec!["__DTS__".to_string()],
        }
    }

    /// Adds include search directories; ones that do not exist are skipped.
    #[must_use]
    pub fn with_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for dir in dirs {
            let dir = dir.into();
            if dir.is_dir() {
                self.include_dirs.push(dir);
            } else {
                debug!("skipping missing include directory {}", dir.display());
            }
        }
        self
    }

    /// Adds a `-D` define.
    #[must_use]
    pub fn with_define(mut self, define: impl Into<String>) -> Self {
        let define = define.into();
        if !self.defines.contains(&define) {
            self.defines.push(define);
        }
        self
    }

    /// Executable this preprocessor runs.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Include directories that will be passed with `-I`.
    #[must_use]
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// Full argument list for expanding `path`.
    ///
    /// The input file's own directory is searched first so sibling headers
    /// resolve without extra flags.
    #[must_use]
    pub fn args_for(&self, path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-E", "-x", "c", "-P"]
            .iter()
            .map(OsString::from)
            .collect();

        for define in &self.defines {
            args.push(format!("-D{define}").into());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            args.push("-I".into());
            args.push(parent.as_os_str().to_owned());
        }
        for dir in &self.include_dirs {
            args.push("-I".into());
            args.push(dir.as_os_str().to_owned());
        }

        args.push(path.as_os_str().to_owned());
        args
    }

    /// Expands `path` and returns the preprocessed text.
    pub fn expand(&self, path: &Path) -> Result<String, PreprocessorError> {
        if !path.is_file() {
            return Err(PreprocessorError::MissingInput(path.to_path_buf()));
        }

        let args = self.args_for(path);
        debug!(command = %self.command, ?args, "running preprocessor");

        let output = Command::new(&self.command)
            .args(&args)
            .output()
            .map_err(|source| PreprocessorError::Launch {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostics = parse_diagnostics(&stderr);
            let message = diagnostics
                .first()
                .map(|d| d.message.clone())
                .or_else(|| stderr.lines().find(|l| !l.trim().is_empty()).map(str::to_string))
                .unwrap_or_else(|| "no output on stderr".to_string());
            return Err(PreprocessorError::Failed {
                status: output.status.to_string(),
                message,
                diagnostics,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND)
    }
}

/// Extracts `file:line:col: message` lines from preprocessor stderr.
#[must_use]
pub fn parse_diagnostics(stderr: &str) -> Vec<PreprocessorDiagnostic> {
    let pattern = Regex::new(r"^([^:\n]+):(\d+):(\d+):\s*(.+)$").unwrap();

    stderr
        .lines()
        .filter_map(|line| {
            let caps = pattern.captures(line.trim_end())?;
            Some(PreprocessorDiagnostic {
                file: caps[1].to_string(),
                line: caps[2].parse().ok()?,
                column: caps[3].parse().ok()?,
                message: caps[4].to_string(),
            })
        })
        .collect()
}
