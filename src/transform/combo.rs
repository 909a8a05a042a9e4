//! Combos to `(defchordsv2 ...)` entries.

use super::{Rendered, TransformContext};
use crate::diagnostics::{Component, ConversionError, ErrorKind};
use crate::models::Combo;

/// Chord release behavior written for every entry.
pub const RELEASE_BEHAVIOR: &str = "all-released";

/// Renders one `(keys...) action timeout all-released (disabled-layers...)`
/// line, or `None` (after reporting) when the combo cannot be expressed.
pub fn render(
    ctx: &mut TransformContext<'_>,
    name: &str,
    combo: &Combo,
) -> Result<Option<Rendered>, ConversionError> {
    let Some(binding) = combo.bindings.first() else {
        skip(ctx, name, "has no bindings")?;
        return Ok(None);
    };
    if combo.key_positions.is_empty() {
        skip(ctx, name, "has no key-positions")?;
        return Ok(None);
    }

    let mut keys = Vec::with_capacity(combo.key_positions.len());
    for position in &combo.key_positions {
        match ctx.source_keys.get(*position) {
            Some(key) => keys.push(key.clone()),
            None => {
                let reason = format!(
                    "uses key position {position}, but the keymap has {} positions",
                    ctx.source_keys.len()
                );
                skip(ctx, name, &reason)?;
                return Ok(None);
            }
        }
    }

    if combo.bindings.len() > 1 {
        ctx.errors.report(ConversionError::new(
            ErrorKind::ExtractionError,
            Component::Combo,
            format!("combo '{name}' has {} bindings; only the first is used", combo.bindings.len()),
        ))?;
    }

    let mut rendered = Rendered::default();
    let action = ctx.binding(binding)?;
    let action = rendered.absorb(action);

    let disabled: Vec<String> = if combo.layers.is_empty() {
        Vec::new()
    } else {
        ctx.config
            .layers
            .iter()
            .zip(ctx.layer_names())
            .filter(|(layer, _)| !combo.layers.contains(&layer.index))
            .map(|(_, name)| name.clone())
            .collect()
    };

    if let Some(ms) = combo.require_prior_idle_ms.filter(|&ms| ms > 0) {
        rendered.comments.push(format!(
            ";; TODO: combo {name}: require-prior-idle-ms {ms} has no Kanata equivalent"
        ));
    }
    if combo.slow_release {
        rendered.comments.push(format!(
            ";; TODO: combo {name}: slow-release has no Kanata equivalent"
        ));
    }

    rendered.action = format!(
        "({}) {action} {} {RELEASE_BEHAVIOR} ({})",
        keys.join(" "),
        combo.timeout_ms,
        disabled.join(" ")
    );
    Ok(Some(rendered))
}

fn skip(ctx: &mut TransformContext<'_>, name: &str, reason: &str) -> Result<(), ConversionError> {
    ctx.errors.report(
        ConversionError::new(
            ErrorKind::ExtractionError,
            Component::Combo,
            format!("combo '{name}' {reason}; skipped"),
        )
        .with_suggestion("a combo needs key-positions and a binding"),
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::diagnostics::{ErrorManager, Severity};
    use crate::keycodes::{KeycodeDb, ModifierConvention};

    fn combo(positions: Vec<usize>, bindings: usize, layers: Vec<usize>) -> Combo {
        Combo {
            key_positions: positions,
            timeout_ms: 40,
            bindings: (0..bindings).map(|_| kp("ESC")).collect(),
            layers,
            require_prior_idle_ms: None,
            slow_release: false,
        }
    }

    #[test]
    fn test_combo_line() {
        let config = config_with_layers(&["base", "nav", "sym"]);
        let mut errors = ErrorManager::default();
        let keys = source_keys();
        let mut ctx = TransformContext::new(
            &config,
            KeycodeDb::builtin(),
            ModifierConvention::Pc,
            &keys,
            &mut errors,
        );

        let all = render(&mut ctx, "esc", &combo(vec![0, 1], 1, vec![])).unwrap().unwrap();
        assert_eq!(all.action, "(a b) esc 40 all-released ()");

        let base_only = render(&mut ctx, "esc", &combo(vec![1, 2], 1, vec![0])).unwrap().unwrap();
        assert_eq!(base_only.action, "(b c) esc 40 all-released (nav sym)");
    }

    #[test]
    fn test_incomplete_combos_are_skipped() {
        let config = config_with_layers(&["base"]);
        let mut errors = ErrorManager::default();
        let keys = source_keys();
        let mut ctx = TransformContext::new(
            &config,
            KeycodeDb::builtin(),
            ModifierConvention::Pc,
            &keys,
            &mut errors,
        );

        assert!(render(&mut ctx, "a", &combo(vec![], 1, vec![])).unwrap().is_none());
        assert!(render(&mut ctx, "b", &combo(vec![0, 1], 0, vec![])).unwrap().is_none());
        assert!(render(&mut ctx, "c", &combo(vec![0, 99], 1, vec![])).unwrap().is_none());
        assert_eq!(errors.count(Severity::Warning), 3);
    }
}
