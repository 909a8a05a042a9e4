//! Assembles the Kanata configuration text.

// Allow format! appended to String - more readable for building output
#![allow(clippy::format_push_string)]

use super::defsrc::source_keys;
use super::metadata::AssemblyStats;
use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager, Severity};
use crate::keycodes::{KeycodeDb, ModifierConvention};
use crate::models::{KeymapConfig, Layer};
use crate::transform::{combo, layer, Definition, Rendered, TransformContext, TRANSPARENT};
use indexmap::IndexMap;
use tracing::{debug, info};

/// First line of every generated file.
pub const HEADER: &str = ";; ZMK to Kanata Configuration";
/// Second line of every generated file.
pub const GENERATED_NOTICE: &str = ";; Generated automatically - DO NOT EDIT";
/// Heading of the trailing diagnostics section.
pub const SUMMARY_HEADING: &str = ";; Conversion summary";

/// Inputs the assembler needs besides the keymap.
#[derive(Debug, Clone, Copy)]
pub struct AssembleOptions<'a> {
    /// Key name table
    pub keycodes: &'a KeycodeDb,
    /// GUI naming convention
    pub convention: ModifierConvention,
    /// Input file name for the header
    pub source_name: Option<&'a str>,
}

/// Generated text plus what went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    /// The Kanata configuration
    pub text: String,
    /// Definition counts
    pub stats: AssemblyStats,
}

/// Definitions keyed by name, in order of first use.
#[derive(Debug, Default)]
struct DefinitionSet {
    entries: IndexMap<String, Definition>,
}

impl DefinitionSet {
    fn insert(&mut self, definition: Definition, errors: &mut ErrorManager) -> Result<(), ConversionError> {
        match self.entries.get(definition.name()) {
            None => {
                self.entries.insert(definition.name().to_string(), definition);
            }
            Some(existing) if existing.body() == definition.body() => {}
            Some(existing) => {
                errors.report(ConversionError::new(
                    ErrorKind::BindingResolutionError,
                    Component::Assembler,
                    format!(
                        "two different definitions are both named '{}'; keeping the first ({})",
                        existing.name(),
                        existing.body().replace('\n', "; ")
                    ),
                ))?;
            }
        }
        Ok(())
    }

    fn aliases(&self) -> impl Iterator<Item = (&str, &str, &[String])> {
        self.entries.values().filter_map(|d| match d {
            Definition::Alias { name, body, todos } => Some((name.as_str(), body.as_str(), todos.as_slice())),
            Definition::Macro { .. } => None,
        })
    }

    fn macros(&self) -> impl Iterator<Item = (&str, &[String], &[String])> {
        self.entries.values().filter_map(|d| match d {
            Definition::Macro { name, lines, todos } => {
                Some((name.as_str(), lines.as_slice(), todos.as_slice()))
            }
            Definition::Alias { .. } => None,
        })
    }
}

/// One rendered `deflayer` block.
#[derive(Debug)]
struct LayerBlock {
    name: String,
    rows: Vec<(Vec<String>, Vec<String>)>,
}

fn add(
    rendered: Rendered,
    definitions: &mut DefinitionSet,
    errors: &mut ErrorManager,
) -> Result<(String, Vec<String>), ConversionError> {
    for definition in rendered.definitions {
        definitions.insert(definition, errors)?;
    }
    Ok((rendered.action, rendered.comments))
}

fn render_layer(
    ctx: &mut TransformContext<'_>,
    layer: &Layer,
    name: &str,
    definitions: &mut DefinitionSet,
) -> Result<LayerBlock, ConversionError> {
    let width = ctx.source_keys.len();
    let mut rows = Vec::new();
    let mut emitted = 0usize;

    for row in layer.rows() {
        if emitted >= width {
            break;
        }
        let mut actions = Vec::with_capacity(row.len());
        let mut comments = Vec::new();
        for binding in row.iter().take(width - emitted) {
            let rendered = ctx.binding(binding)?;
            let (action, mut attached) = add(rendered, definitions, ctx.errors)?;
            actions.push(action);
            comments.append(&mut attached);
        }
        emitted += actions.len();
        rows.push((actions, comments));
    }

    let count = layer.bindings.len();
    if count != width {
        let adjustment = if count < width {
            format!("padded with {} transparent key(s)", width - count)
        } else {
            format!("{} extra key(s) dropped", count - width)
        };
        ctx.errors.report(ConversionError::new(
            ErrorKind::ExtractionError,
            Component::Assembler,
            format!(
                "layer '{}' has {count} bindings but the base layer has {width}; {adjustment}",
                layer.name
            ),
        ))?;
        if count < width {
            let padding = vec![TRANSPARENT.to_string(); width - count];
            match rows.last_mut() {
                Some((actions, _)) => actions.extend(padding),
                None => rows.push((padding, Vec::new())),
            }
        }
    }

    Ok(LayerBlock {
        name: name.to_string(),
        rows,
    })
}

/// Converts the keymap into Kanata configuration text.
///
/// Every diagnostic reported up to the end of assembly is listed in the
/// trailing summary section.
pub fn assemble(
    config: &KeymapConfig,
    options: &AssembleOptions<'_>,
    errors: &mut ErrorManager,
) -> Result<Assembled, ConversionError> {
    let keys = source_keys(config, options.keycodes, options.convention, errors)?;

    let mut definitions = DefinitionSet::default();
    let mut layers = Vec::with_capacity(config.layers.len());
    let mut chords: Vec<(String, Vec<String>)> = Vec::new();
    let mut conditional: Vec<String> = Vec::new();

    {
        let mut ctx = TransformContext::new(config, options.keycodes, options.convention, &keys, errors);
        let names = ctx.layer_names().to_vec();

        for (layer, name) in config.layers.iter().zip(&names) {
            let block = render_layer(&mut ctx, layer, name, &mut definitions)?;
            debug!(layer = %name, rows = block.rows.len(), "rendered layer");
            layers.push(block);
        }

        for (name, combo) in config.combos() {
            if let Some(rendered) = combo::render(&mut ctx, name, combo)? {
                chords.push(add(rendered, &mut definitions, ctx.errors)?);
            }
        }

        for (name, cl) in config.conditional_layers() {
            conditional.extend(layer::conditional_comment(&ctx, name, cl));
        }
        if config.conditional_layers().next().is_some() {
            ctx.errors.report(
                ConversionError::new(
                    ErrorKind::ExtractionError,
                    Component::Layer,
                    "conditional layers have no Kanata equivalent; written as comments",
                )
                .with_severity(Severity::Info),
            )?;
        }
    }

    let stats = AssemblyStats {
        aliases: definitions.aliases().count(),
        macros: definitions.macros().count(),
        chords: chords.len(),
    };
    info!(
        layers = layers.len(),
        aliases = stats.aliases,
        macros = stats.macros,
        chords = stats.chords,
        "assembled kanata configuration"
    );

    let mut out = String::new();

    out.push_str(HEADER);
    out.push('\n');
    out.push_str(GENERATED_NOTICE);
    out.push('\n');
    if let Some(source) = options.source_name {
        out.push_str(&format!(";; Source: {source}\n"));
    }
    out.push('\n');

    out.push_str("(defcfg\n  process-unmapped-keys yes\n");
    if !chords.is_empty() {
        out.push_str("  concurrent-tap-hold yes\n");
    }
    out.push_str(")\n\n");

    let settings = config.global_settings;
    out.push_str(&format!(
        "(defvar\n  tap-time {}\n  hold-time {}\n)\n\n",
        settings.tap_time_ms, settings.hold_time_ms
    ));

    out.push_str("(defsrc\n");
    let mut offset = 0;
    if let Some(base) = config.layers.first() {
        for row in base.rows() {
            let end = (offset + row.len()).min(keys.len());
            if offset >= end {
                break;
            }
            out.push_str(&format!("  {}\n", keys[offset..end].join(" ")));
            offset = end;
        }
    }
    out.push_str(")\n\n");

    if stats.aliases > 0 {
        out.push_str("(defalias\n");
        for (name, body, todos) in definitions.aliases() {
            for todo in todos {
                out.push_str(&format!("  {todo}\n"));
            }
            out.push_str(&format!("  {name} {body}\n"));
        }
        out.push_str(")\n\n");
    }

    for (name, lines, todos) in definitions.macros() {
        for todo in todos {
            out.push_str(&format!("{todo}\n"));
        }
        out.push_str(&format!("(defmacro {name}\n"));
        for line in lines {
            out.push_str(&format!("  {line}\n"));
        }
        out.push_str(")\n\n");
    }

    if !chords.is_empty() {
        out.push_str("(defchordsv2\n");
        for (line, comments) in &chords {
            for comment in comments {
                out.push_str(&format!("  {comment}\n"));
            }
            out.push_str(&format!("  {line}\n"));
        }
        out.push_str(")\n\n");
    }

    for block in &layers {
        out.push_str(&format!("(deflayer {}\n", block.name));
        for (actions, comments) in &block.rows {
            out.push_str(&format!("  {}\n", actions.join(" ")));
            for comment in comments {
                out.push_str(&format!("  {comment}\n"));
            }
        }
        out.push_str(")\n\n");
    }

    if !conditional.is_empty() {
        for line in &conditional {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str(&summary(errors));

    Ok(Assembled { text: out, stats })
}

/// The trailing summary section.
#[must_use]
pub fn summary(errors: &ErrorManager) -> String {
    let mut out = format!("{SUMMARY_HEADING}\n");
    let all = errors.errors();
    if all.is_empty() {
        out.push_str(";; No issues found\n");
        return out;
    }

    let counts: Vec<String> = Severity::ALL
        .iter()
        .rev()
        .filter(|s| errors.count(**s) > 0)
        .map(|s| format!("{} {}", errors.count(*s), s))
        .collect();
    out.push_str(&format!(";; {} diagnostic(s): {}\n", all.len(), counts.join(", ")));
    for error in all {
        out.push_str(&format!(";;   {}\n", error.summary_line()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Behavior, BehaviorRef, Binding, Builtin, Combo, HoldTap, Param};

    fn kp(key: &str, line: usize) -> Binding {
        Binding::builtin(Builtin::KeyPress, vec![Param::Key(key.into())], line, 1)
    }

    fn layer(name: &str, index: usize, bindings: Vec<Binding>) -> Layer {
        Layer {
            name: name.into(),
            display_name: None,
            index,
            bindings,
        }
    }

    fn run(config: &KeymapConfig) -> (Assembled, ErrorManager) {
        let mut errors = ErrorManager::default();
        let options = AssembleOptions {
            keycodes: KeycodeDb::builtin(),
            convention: ModifierConvention::Pc,
            source_name: Some("test.keymap"),
        };
        let assembled = assemble(config, &options, &mut errors).unwrap();
        (assembled, errors)
    }

    fn hm(key: &str, tap: &str, line: usize) -> Binding {
        Binding::new(
            BehaviorRef::Defined("hm".into()),
            vec![Param::Key(key.into()), Param::Key(tap.into())],
            line,
            1,
        )
    }

    #[test]
    fn test_rows_and_defaults() {
        let config = KeymapConfig {
            layers: vec![layer(
                "default_layer",
                0,
                vec![kp("A", 1), kp("B", 1), kp("C", 1), kp("D", 2), kp("E", 2), kp("F", 2)],
            )],
            ..KeymapConfig::default()
        };
        let (assembled, _) = run(&config);
        let text = &assembled.text;

        assert!(text.starts_with(";; ZMK to Kanata Configuration\n;; Generated automatically - DO NOT EDIT\n"));
        assert!(text.contains("tap-time 200\n  hold-time 250"));
        assert!(text.contains("(defsrc\n  a b c\n  d e f\n)"));
        assert!(text.contains("(deflayer default\n  a b c\n  d e f\n)"));
        assert!(text.contains(";; Conversion summary\n;; No issues found"));
        assert!(!text.contains("(defalias"));
    }

    #[test]
    fn test_alias_defined_once_and_referenced_per_use() {
        let mut config = KeymapConfig {
            layers: vec![
                layer("base", 0, vec![hm("LGUI", "A", 1), kp("B", 1)]),
                layer("two", 1, vec![hm("LGUI", "A", 1), kp("C", 1)]),
                layer("three", 2, vec![hm("LGUI", "A", 1), kp("D", 1)]),
            ],
            ..KeymapConfig::default()
        };
        config
            .behaviors
            .insert("hm".into(), Behavior::HoldTap(HoldTap::mod_tap()));

        let (assembled, _) = run(&config);
        let text = &assembled.text;
        assert_eq!(text.matches("  hm_lgui_a (tap-hold-press").count(), 1);
        assert_eq!(text.matches("@hm_lgui_a").count(), 3);
        assert_eq!(assembled.stats.aliases, 1);
    }

    #[test]
    fn test_determinism() {
        let mut config = KeymapConfig {
            layers: vec![layer("base", 0, vec![hm("LSHIFT", "S", 1), kp("X", 1)])],
            ..KeymapConfig::default()
        };
        config
            .behaviors
            .insert("hm".into(), Behavior::HoldTap(HoldTap::mod_tap()));
        config.behaviors.insert(
            "c".into(),
            Behavior::Combo(Combo {
                key_positions: vec![0, 1],
                timeout_ms: 50,
                bindings: vec![kp("ESC", 1)],
                layers: vec![],
                require_prior_idle_ms: None,
                slow_release: false,
            }),
        );
        assert_eq!(run(&config).0.text, run(&config).0.text);
        assert!(run(&config).0.text.contains("concurrent-tap-hold yes"));
        assert!(run(&config).0.text.contains("(defchordsv2\n  (s x) esc 50 all-released ()\n)"));
    }

    #[test]
    fn test_short_layer_padded_and_reported() {
        let config = KeymapConfig {
            layers: vec![
                layer("base", 0, vec![kp("A", 1), kp("B", 1), kp("C", 1)]),
                layer("short", 1, vec![kp("X", 1)]),
            ],
            ..KeymapConfig::default()
        };
        let (assembled, errors) = run(&config);
        assert!(assembled.text.contains("(deflayer short\n  x _ _\n)"));
        assert_eq!(errors.count(Severity::Warning), 1);
        assert!(assembled.text.contains("warning[assembler]"));
    }

    #[test]
    fn test_comments_follow_row() {
        let config = KeymapConfig {
            layers: vec![layer(
                "base",
                0,
                vec![kp("A", 1), Binding::new(BehaviorRef::Unknown("bogus".into()), vec![], 1, 5)],
            )],
            ..KeymapConfig::default()
        };
        let (assembled, _) = run(&config);
        assert!(assembled
            .text
            .contains("(deflayer base\n  a XX\n  ;; unknown behavior &bogus\n)"));
    }

    #[test]
    fn test_alias_collision_keeps_first() {
        let mut definitions = DefinitionSet::default();
        let mut errors = ErrorManager::default();
        let alias = |body: &str| Definition::Alias {
            name: "x".into(),
            body: body.into(),
            todos: vec![],
        };
        definitions.insert(alias("(a)"), &mut errors).unwrap();
        definitions.insert(alias("(a)"), &mut errors).unwrap();
        definitions.insert(alias("(b)"), &mut errors).unwrap();
        assert_eq!(definitions.entries.len(), 1);
        assert_eq!(definitions.entries["x"].body(), "(a)");
        assert_eq!(errors.count(Severity::Warning), 1);
    }
}
