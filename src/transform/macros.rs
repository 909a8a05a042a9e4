//! Macros to `(defmacro ...)` blocks.
//!
//! A macro is a replay script. `&macro_tap`, `&macro_press` and
//! `&macro_release` only switch the current mode; each key step that follows
//! is emitted as `tap`, `press` or `release` accordingly.

use super::{alias_name, Definition, Rendered, TransformContext};
use crate::diagnostics::{Component, ConversionError, ErrorKind};
use crate::models::{BehaviorRef, Binding, Builtin, Macro, MacroMode, MacroStep, Param};

const fn verb(mode: MacroMode) -> &'static str {
    match mode {
        MacroMode::Tap => "tap",
        MacroMode::Press => "press",
        MacroMode::Release => "release",
    }
}

fn is_key_press(ctx: &TransformContext<'_>, behavior: &BehaviorRef) -> bool {
    match behavior {
        BehaviorRef::Builtin(builtin) => *builtin == Builtin::KeyPress,
        BehaviorRef::Defined(name) => ctx
            .config
            .behaviors
            .get(name)
            .and_then(crate::models::Behavior::as_builtin)
            == Some(Builtin::KeyPress),
        BehaviorRef::Unknown(_) => false,
    }
}

/// Renders a macro binding as `@name` plus its `defmacro` block.
///
/// Parameterized macros get one block per distinct parameter list.
pub fn render(
    ctx: &mut TransformContext<'_>,
    name: &str,
    definition: &Macro,
    binding: &Binding,
) -> Result<Rendered, ConversionError> {
    let mut rendered = Rendered::default();
    let mut lines = Vec::new();
    let mut todos = Vec::new();
    let mut mode = MacroMode::Tap;
    let mut pending: Option<(Param, u8)> = None;

    for step in &definition.steps {
        match step {
            MacroStep::Mode(next) => mode = *next,
            MacroStep::Wait(ms) => lines.push(format!("delay {ms}")),
            MacroStep::TapTime(ms) => todos.push(format!(
                ";; TODO: {name}: tap time {ms} ms has no Kanata equivalent"
            )),
            MacroStep::PauseForRelease => todos.push(format!(
                ";; TODO: {name}: steps after pause-for-release run immediately"
            )),
            MacroStep::Param { from, to } => {
                match binding.params.get(usize::from(*from).saturating_sub(1)) {
                    Some(param) => pending = Some((param.clone(), *to)),
                    None => {
                        ctx.errors.report(
                            ConversionError::new(
                                ErrorKind::BindingResolutionError,
                                Component::Macro,
                                format!(
                                    "macro '{name}' reads parameter {from}, but {} passes {}",
                                    binding.source_text(),
                                    binding.params.len()
                                ),
                            )
                            .with_position(binding.line, binding.column),
                        )?;
                    }
                }
            }
            MacroStep::Key(step) => {
                let mut step = step.clone();
                if let Some((param, to)) = pending.take() {
                    let slot = usize::from(to).saturating_sub(1);
                    if step.params.len() <= slot {
                        step.params.resize(slot + 1, param.clone());
                    }
                    step.params[slot] = param;
                }

                if is_key_press(ctx, &step.behavior) {
                    let key = ctx.binding(&step)?;
                    let key = rendered.absorb(key);
                    lines.push(format!("{} {key}", verb(mode)));
                } else {
                    ctx.errors.report(
                        ConversionError::new(
                            ErrorKind::BindingResolutionError,
                            Component::Macro,
                            format!(
                                "{} in macro '{name}' is not a key press; left as a comment",
                                step.source_text()
                            ),
                        )
                        .with_position(step.line, step.column),
                    )?;
                    lines.push(format!(";; TODO: {}", step.source_text()));
                }
            }
        }
    }

    let macro_name = alias_name(name, &binding.params);
    rendered.definitions.push(Definition::Macro {
        name: macro_name.clone(),
        lines,
        todos,
    });
    rendered.action = format!("@{macro_name}");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::diagnostics::ErrorManager;
    use crate::keycodes::{KeycodeDb, ModifierConvention};
    use crate::models::{Behavior, KeymapConfig};

    fn control(builtin: Builtin) -> MacroStep {
        match builtin {
            Builtin::MacroTap => MacroStep::Mode(MacroMode::Tap),
            Builtin::MacroPress => MacroStep::Mode(MacroMode::Press),
            Builtin::MacroRelease => MacroStep::Mode(MacroMode::Release),
            other => panic!("not a mode token: {other:?}"),
        }
    }

    fn macro_lines(definition: Macro, params: Vec<Param>) -> (Rendered, Vec<String>) {
        let mut config = KeymapConfig::default();
        config.behaviors.insert("m".into(), Behavior::Macro(definition));
        let mut errors = ErrorManager::default();
        let keys = source_keys();
        let mut ctx = TransformContext::new(
            &config,
            KeycodeDb::builtin(),
            ModifierConvention::Pc,
            &keys,
            &mut errors,
        );
        let binding = Binding::new(BehaviorRef::Defined("m".into()), params, 1, 1);
        let rendered = ctx.binding(&binding).unwrap();
        let lines = match rendered.definitions.last() {
            Some(Definition::Macro { lines, .. }) => lines.clone(),
            other => panic!("expected macro, got {other:?}"),
        };
        (rendered, lines)
    }

    fn macro_of(steps: Vec<MacroStep>, param_count: usize) -> Macro {
        Macro {
            wait_ms: Macro::DEFAULT_WAIT_MS,
            tap_ms: Macro::DEFAULT_TAP_MS,
            steps,
            param_count,
        }
    }

    #[test]
    fn test_press_tap_release_order() {
        let steps = vec![
            control(Builtin::MacroPress),
            MacroStep::Key(kp("LSHIFT")),
            control(Builtin::MacroTap),
            MacroStep::Key(kp("A")),
            control(Builtin::MacroRelease),
            MacroStep::Key(kp("LSHIFT")),
        ];
        let (rendered, lines) = macro_lines(macro_of(steps, 0), vec![]);
        assert_eq!(rendered.action, "@m");
        assert_eq!(lines, vec!["press lsft", "tap a", "release lsft"]);
    }

    #[test]
    fn test_wait_and_default_tap_mode() {
        let steps = vec![
            MacroStep::Key(kp("H")),
            MacroStep::Wait(100),
            MacroStep::Key(kp("I")),
        ];
        let (_, lines) = macro_lines(macro_of(steps, 0), vec![]);
        assert_eq!(lines, vec!["tap h", "delay 100", "tap i"]);
    }

    #[test]
    fn test_param_substitution() {
        let steps = vec![
            MacroStep::Param { from: 1, to: 1 },
            MacroStep::Key(Binding::builtin(Builtin::KeyPress, vec![], 1, 1)),
            MacroStep::Key(kp("RET")),
        ];
        let (rendered, lines) = macro_lines(macro_of(steps, 1), vec![Param::Key("X".into())]);
        assert_eq!(rendered.action, "@m_x");
        assert_eq!(lines, vec!["tap x", "tap ret"]);
    }
}
