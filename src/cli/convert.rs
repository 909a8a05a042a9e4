//! `convert`: ZMK keymap in, Kanata configuration out.

use crate::cli::common::{preprocessor_for, require_input, CliError, CliResult, SourceOptions};
use crate::config::Config;
use crate::diagnostics::Severity;
use crate::keycodes::ModifierConvention;
use crate::pipeline::{ConversionOutput, ConvertOptions, Converter};
use clap::Args;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Convert a ZMK keymap into a Kanata configuration
#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    /// ZMK `.keymap` file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Write the Kanata configuration here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Additional include directory for the preprocessor (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Use macOS names for the GUI modifier (lcmd/rcmd)
    #[arg(long)]
    pub mac: bool,

    /// Read the input as already preprocessed
    #[arg(long)]
    pub no_preprocess: bool,

    /// C preprocessor executable
    #[arg(long, value_name = "PATH", conflicts_with = "no_preprocess")]
    pub cpp: Option<String>,

    /// Also write conversion metadata as JSON
    #[arg(long, value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    /// Stop on the first warning
    #[arg(long)]
    pub strict: bool,
}

impl ConvertArgs {
    /// Converter settings after applying flags over `config`.
    #[must_use]
    pub fn options(&self, config: &Config) -> ConvertOptions {
        ConvertOptions {
            convention: if self.mac {
                ModifierConvention::Mac
            } else {
                config.output.convention
            },
            threshold: if self.strict {
                Severity::Warning
            } else {
                config.diagnostics.threshold
            },
            source_name: None,
        }
    }

    /// Execute the convert command
    pub fn execute(&self, config: &Config) -> CliResult<()> {
        require_input(&self.input)?;

        let source = SourceOptions {
            include_dirs: &self.include_dirs,
            no_preprocess: self.no_preprocess,
            cpp: self.cpp.as_deref(),
        };
        let preprocessor = preprocessor_for(config, &source);
        let converter = Converter::new(self.options(config));

        let output = converter.convert_file(&self.input, preprocessor.as_ref())?;

        match &self.output {
            Some(path) => {
                write_file(path, &output.kanata)?;
                report_written(path, &output);
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(output.kanata.as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(|e| CliError::failure(format!("Failed to write output: {e}")))?;
            }
        }

        if let Some(path) = &self.metadata {
            let json = output
                .metadata
                .to_json()
                .map_err(|e| CliError::failure(format!("Failed to serialize metadata: {e}")))?;
            write_file(path, &json)?;
            info!("wrote metadata to {}", path.display());
        }

        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> CliResult<()> {
    fs::write(path, content)
        .map_err(|e| CliError::failure(format!("Failed to write {}: {e}", path.display())))
}

fn report_written(path: &Path, output: &ConversionOutput) {
    let report = &output.metadata.error_report;
    let warnings = report.count(Severity::Warning);
    eprintln!(
        "✓ Wrote {} ({} layers, {} warnings)",
        path.display(),
        output.metadata.layer_count,
        warnings
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ConvertArgs,
    }

    fn parse(argv: &[&str]) -> ConvertArgs {
        TestCli::try_parse_from(std::iter::once("convert").chain(argv.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.diagnostics.threshold = Severity::Critical;

        let args = parse(&["in.keymap", "--mac", "--strict"]);
        let options = args.options(&config);
        assert_eq!(options.convention, ModifierConvention::Mac);
        assert_eq!(options.threshold, Severity::Warning);
    }

    #[test]
    fn test_config_used_without_flags() {
        let mut config = Config::default();
        config.output.convention = ModifierConvention::Mac;

        let options = parse(&["in.keymap"]).options(&config);
        assert_eq!(options.convention, ModifierConvention::Mac);
        assert_eq!(options.threshold, Severity::Error);
    }

    #[test]
    fn test_repeatable_includes() {
        let args = parse(&["in.keymap", "-I", "a", "--include", "b"]);
        assert_eq!(args.include_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_cpp_conflicts_with_no_preprocess() {
        let result = TestCli::try_parse_from(["convert", "in.keymap", "--no-preprocess", "--cpp", "cpp"]);
        assert!(result.is_err());
    }
}
