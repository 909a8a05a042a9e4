//! `inspect`: show what the extractor reads from a keymap.

use crate::cli::common::{preprocessor_for, require_input, CliError, CliResult, SourceOptions};
use crate::config::Config;
use crate::diagnostics::Severity;
use crate::models::{Behavior, KeymapConfig};
use crate::pipeline::{ConvertOptions, Converter, Extraction};
use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Print the layers, behaviors and settings extracted from a keymap
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// ZMK `.keymap` file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Additional include directory for the preprocessor (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Read the input as already preprocessed
    #[arg(long)]
    pub no_preprocess: bool,

    /// C preprocessor executable
    #[arg(long, value_name = "PATH", conflicts_with = "no_preprocess")]
    pub cpp: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectArgs {
    /// Execute the inspect command
    pub fn execute(&self, config: &Config) -> CliResult<()> {
        require_input(&self.input)?;

        let source = SourceOptions {
            include_dirs: &self.include_dirs,
            no_preprocess: self.no_preprocess,
            cpp: self.cpp.as_deref(),
        };
        let preprocessor = preprocessor_for(config, &source);
        let converter = Converter::new(ConvertOptions {
            threshold: config.diagnostics.threshold,
            ..ConvertOptions::default()
        });

        let extraction = converter.extract_file(&self.input, preprocessor.as_ref())?;

        if self.json {
            let json = serde_json::to_string_pretty(&extraction)
                .map_err(|e| CliError::failure(format!("Failed to serialize JSON: {e}")))?;
            println!("{json}");
        } else {
            print!("{}", summarize(&extraction));
        }

        Ok(())
    }
}

fn behavior_detail(behavior: &Behavior, config: &KeymapConfig) -> String {
    let layer_name = |index: &usize| {
        config
            .layers
            .get(*index)
            .map_or_else(|| index.to_string(), |l| l.base_name().to_string())
    };
    match behavior {
        Behavior::HoldTap(ht) => ht.flavor.as_str().to_string(),
        Behavior::Macro(m) => format!("{} steps", m.steps.len()),
        Behavior::TapDance(td) => format!("{} bindings", td.bindings.len()),
        Behavior::Combo(combo) => {
            let positions: Vec<String> = combo.key_positions.iter().map(ToString::to_string).collect();
            format!("positions {}", positions.join(" "))
        }
        Behavior::ConditionalLayer(cl) => {
            let ifs: Vec<String> = cl.if_layers.iter().map(layer_name).collect();
            format!("{} -> {}", ifs.join(" + "), layer_name(&cl.then_layer))
        }
        Behavior::Unsupported { compatible, .. } => compatible.clone(),
        _ => String::new(),
    }
}

/// Human-readable report of an extraction.
#[must_use]
pub fn summarize(extraction: &Extraction) -> String {
    let config = &extraction.config;
    let mut out = String::new();

    let settings = config.global_settings;
    let _ = writeln!(
        out,
        "Global settings: tap-time {}ms, hold-time {}ms",
        settings.tap_time_ms, settings.hold_time_ms
    );

    let _ = writeln!(out, "\nLayers ({}):", config.layers.len());
    for (layer, name) in config.layers.iter().zip(config.layer_names()) {
        let _ = write!(
            out,
            "  {:>2}  {:<16} {} keys, {} rows",
            layer.index,
            name,
            layer.bindings.len(),
            layer.rows().len()
        );
        if let Some(display) = &layer.display_name {
            let _ = write!(out, "  \"{display}\"");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nBehaviors ({}):", config.behaviors.len());
    for (name, behavior) in &config.behaviors {
        let detail = behavior_detail(behavior, config);
        if detail.is_empty() {
            let _ = writeln!(out, "  {:<16} {}", name, behavior.type_name());
        } else {
            let _ = writeln!(out, "  {:<16} {:<18} {}", name, behavior.type_name(), detail);
        }
    }

    let report = &extraction.error_report;
    let _ = writeln!(
        out,
        "\nDiagnostics: {} total, {} warnings, {} errors",
        report.total,
        report.count(Severity::Warning),
        report.count(Severity::Error) + report.count(Severity::Critical)
    );
    for errors in report.by_component.values() {
        for error in errors {
            let _ = writeln!(out, "  {}", error.summary_line());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYMAP: &str = r#"
/ {
    behaviors {
        hm: homerow_mods {
            compatible = "zmk,behavior-hold-tap";
            #binding-cells = <2>;
            flavor = "balanced";
            bindings = <&kp>, <&kp>;
        };
    };
    keymap {
        compatible = "zmk,keymap";
        default_layer {
            display-name = "Base";
            bindings = <&hm LSHIFT A &kp B
                        &mo 1 &kp C>;
        };
        nav_layer {
            bindings = <&trans &trans &trans &trans>;
        };
    };
};
"#;

    #[test]
    fn test_summary_lists_layers_and_behaviors() {
        let extraction = Converter::new(ConvertOptions::default())
            .extract_str(KEYMAP)
            .unwrap();
        let text = summarize(&extraction);

        assert!(text.contains("Layers (2):"));
        assert!(text.contains("default"));
        assert!(text.contains("4 keys, 2 rows"));
        assert!(text.contains("\"Base\""));
        assert!(text.contains("nav"));
        assert!(text.contains("hm"));
        assert!(text.contains("hold-tap"));
        assert!(text.contains("balanced"));
        assert!(text.contains("Diagnostics: 0 total"));
    }
}
