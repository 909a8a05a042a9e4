//! Configuration management for the converter.
//!
//! Settings live in a TOML file under the platform config directory. Every
//! field has a default, so a missing file or a missing section is not an
//! error. Command line flags take precedence over anything loaded here.

use crate::diagnostics::Severity;
use crate::dts::Preprocessor;
use crate::keycodes::ModifierConvention;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// C preprocessor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorConfig {
    /// Executable run with `-E`
    pub command: String,
    /// Extra `-I` directories, searched before the ones given on the command line
    pub include_dirs: Vec<PathBuf>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            command: "cpp".to_string(),
            include_dirs: Vec::new(),
        }
    }
}

impl PreprocessorConfig {
    /// Builds a preprocessor from these settings plus additional include dirs.
    #[must_use]
    pub fn preprocessor(&self, extra_include_dirs: &[PathBuf]) -> Preprocessor {
        Preprocessor::new(self.command.clone())
            .with_include_dirs(self.include_dirs.iter().chain(extra_include_dirs))
    }
}

/// Generated-file settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// GUI key naming (`pc` or `mac`)
    pub convention: ModifierConvention,
}

/// Diagnostic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Lowest severity that stops a conversion
    pub threshold: Severity,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            threshold: Severity::Error,
        }
    }
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/zmk-kanata/config.toml`
/// - macOS: `~/Library/Application Support/zmk-kanata/config.toml`
/// - Windows: `%APPDATA%\zmk-kanata\config.toml`
///
/// # Validation
///
/// - `preprocessor.command` must not be empty
/// - `diagnostics.threshold` must be `warning` or above; lower thresholds would
///   stop on purely informational notes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Preprocessor invocation
    pub preprocessor: PreprocessorConfig,
    /// Output formatting
    pub output: OutputConfig,
    /// Diagnostic threshold
    pub diagnostics: DiagnosticsConfig,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(crate::constants::APP_BINARY_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the default config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Loads configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the default config file.
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;
        self.save_to(&Self::config_file_path()?)
    }

    /// Writes configuration to `path` atomically (temp file + rename).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content).with_context(|| {
            format!("Failed to write temp config file: {}", temp_path.display())
        })?;

        fs::rename(&temp_path, path).with_context(|| {
            format!("Failed to rename temp config file to: {}", path.display())
        })?;

        Ok(())
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.preprocessor.command.trim().is_empty() {
            anyhow::bail!("preprocessor.command must not be empty");
        }

        if self.diagnostics.threshold < Severity::Warning {
            anyhow::bail!(
                "diagnostics.threshold must be warning, error or critical (got {})",
                self.diagnostics.threshold
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.preprocessor.command, "cpp");
        assert!(config.preprocessor.include_dirs.is_empty());
        assert_eq!(config.output.convention, ModifierConvention::Pc);
        assert_eq!(config.diagnostics.threshold, Severity::Error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::new();
        config.preprocessor.command = "gcc-cpp".to_string();
        config.preprocessor.include_dirs = vec![PathBuf::from("/opt/zmk/app/include")];
        config.output.convention = ModifierConvention::Mac;
        config.diagnostics.threshold = Severity::Warning;

        config.save_to(&path).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[output]\nconvention = \"mac\"\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output.convention, ModifierConvention::Mac);
        assert_eq!(loaded.preprocessor, PreprocessorConfig::default());
        assert_eq!(loaded.diagnostics.threshold, Severity::Error);
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::new();
        config.preprocessor.command = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.diagnostics.threshold = Severity::Info;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[output\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_preprocessor_include_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();

        let mut config = Config::new();
        config.preprocessor.include_dirs = vec![first.clone()];
        let preprocessor = config.preprocessor.preprocessor(&[second.clone()]);
        assert_eq!(preprocessor.include_dirs(), &[first, second]);
        assert_eq!(preprocessor.command(), "cpp");
    }
}
