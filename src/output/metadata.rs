//! Structured record accompanying the generated text.

use crate::diagnostics::{ErrorManager, ErrorReport};
use crate::models::{GlobalSettings, KeymapConfig};
use serde::Serialize;

/// Counts of the definitions written by the assembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Entries in `defalias`
    pub aliases: usize,
    /// `defmacro` blocks
    pub macros: usize,
    /// Entries in `defchordsv2`
    pub chords: usize,
}

/// Summary of one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionMetadata {
    /// Number of `deflayer` blocks
    pub layer_count: usize,
    /// `deflayer` names in order
    pub layer_names: Vec<String>,
    /// Resolved `tap-time` / `hold-time`
    pub global_settings: GlobalSettings,
    /// What the assembler emitted
    pub stats: AssemblyStats,
    /// Every diagnostic, counted by severity and grouped by component
    pub error_report: ErrorReport,
}

impl ConversionMetadata {
    /// Collects metadata after a run.
    #[must_use]
    pub fn new(config: &KeymapConfig, stats: AssemblyStats, errors: &ErrorManager) -> Self {
        Self {
            layer_count: config.layers.len(),
            layer_names: config.layer_names(),
            global_settings: config.global_settings,
            stats,
            error_report: errors.report_summary(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Component, ConversionError, ErrorKind, Severity};

    #[test]
    fn test_metadata_json() {
        let mut errors = ErrorManager::default();
        errors
            .report(ConversionError::new(
                ErrorKind::TimingValidationError,
                Component::Macro,
                "wait-ms = 0",
            ))
            .unwrap();

        let metadata = ConversionMetadata::new(&KeymapConfig::default(), AssemblyStats::default(), &errors);
        assert_eq!(metadata.error_report.count(Severity::Warning), 1);

        let json: serde_json::Value = serde_json::from_str(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(json["global_settings"]["tap_time_ms"], 200);
        assert_eq!(json["error_report"]["total"], 1);
        assert!(json["error_report"]["by_component"]["macro"].is_array());
    }
}
