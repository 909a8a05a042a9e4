//! Per-conversion collector for diagnostics.

// Allow format! appended to String - more readable for building messages
#![allow(clippy::format_push_string)]

use super::error::{Component, ConversionError, Severity};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Collects every condition reported during one conversion run.
///
/// Each run owns its own manager; nothing is shared between conversions.
/// Reporting a condition whose severity reaches the threshold also returns it
/// as an `Err`, so callers can bail out with `?`.
#[derive(Debug, Clone)]
pub struct ErrorManager {
    threshold: Severity,
    errors: Vec<ConversionError>,
}

impl ErrorManager {
    /// Creates an empty manager that raises at `threshold` and above.
    #[must_use]
    pub const fn new(threshold: Severity) -> Self {
        Self {
            threshold,
            errors: Vec::new(),
        }
    }

    /// The severity at which reports start raising.
    #[must_use]
    pub const fn threshold(&self) -> Severity {
        self.threshold
    }

    /// Records a condition and logs it.
    ///
    /// Returns `Err` with the same condition when its severity is at or above
    /// the threshold.
    pub fn report(&mut self, error: ConversionError) -> Result<(), ConversionError> {
        match error.severity {
            Severity::Debug => debug!(component = %error.component, "{}", error.message),
            Severity::Info => info!(component = %error.component, "{}", error.message),
            Severity::Warning => warn!(component = %error.component, "{}", error.message),
            Severity::Error | Severity::Critical => {
                error!(component = %error.component, "{}", error.message);
            }
        }

        let raise = error.severity >= self.threshold;
        self.errors.push(error.clone());

        if raise {
            Err(error)
        } else {
            Ok(())
        }
    }

    /// All recorded conditions in report order.
    #[must_use]
    pub fn errors(&self) -> &[ConversionError] {
        &self.errors
    }

    /// Conditions at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &ConversionError> {
        self.errors.iter().filter(move |e| e.severity >= severity)
    }

    /// Number of conditions with exactly `severity`.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.errors.iter().filter(|e| e.severity == severity).count()
    }

    /// True when nothing at Warning or above was reported.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.at_least(Severity::Warning).next().is_none()
    }

    /// Structured summary: counts by severity and conditions grouped by component.
    #[must_use]
    pub fn report_summary(&self) -> ErrorReport {
        let mut counts = BTreeMap::new();
        for severity in Severity::ALL {
            counts.insert(severity, self.count(severity));
        }

        let mut by_component: BTreeMap<Component, Vec<ConversionError>> = BTreeMap::new();
        for error in &self.errors {
            by_component
                .entry(error.component)
                .or_default()
                .push(error.clone());
        }

        ErrorReport {
            total: self.errors.len(),
            counts,
            by_component,
        }
    }

    /// Consumes the manager, returning the recorded conditions.
    #[must_use]
    pub fn into_errors(self) -> Vec<ConversionError> {
        self.errors
    }
}

impl Default for ErrorManager {
    fn default() -> Self {
        Self::new(Severity::default())
    }
}

/// Serializable error report attached to conversion metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Total number of recorded conditions
    pub total: usize,
    /// Count per severity, every severity present
    pub counts: BTreeMap<Severity, usize>,
    /// Conditions grouped by reporting component
    pub by_component: BTreeMap<Component, Vec<ConversionError>>,
}

impl ErrorReport {
    /// Count for one severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    /// Formats the report for terminal output.
    #[must_use]
    pub fn format_message(&self) -> String {
        let mut message = String::new();

        if self.total == 0 {
            return message;
        }

        message.push_str(&format!("{} diagnostics", self.total));
        let parts: Vec<String> = Severity::ALL
            .iter()
            .rev()
            .filter(|s| self.count(**s) > 0)
            .map(|s| format!("{} {}", self.count(*s), s))
            .collect();
        message.push_str(&format!(" ({})\n", parts.join(", ")));

        for (component, errors) in &self.by_component {
            message.push_str(&format!("  {component}:\n"));
            for error in errors {
                message.push_str(&format!("    - {}\n", error.summary_line()));
            }
        }

        message
    }
}
