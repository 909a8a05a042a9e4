//! Mod-morph behaviors to `(fork ...)` aliases.
//!
//! The morphed key is wrapped in `unmod` so the modifiers that picked it are
//! not sent along with it, except those listed in `keep-mods`.

use super::{alias_name, Definition, Rendered, TransformContext};
use crate::diagnostics::ConversionError;
use crate::models::{Binding, ModMorph, Modifier};

/// Kanata key names of the modifiers in `mask`.
#[must_use]
pub fn modifier_keys(ctx: &TransformContext<'_>, mask: u8) -> Vec<String> {
    Modifier::from_mask(mask)
        .into_iter()
        .filter_map(|m| ctx.keycodes.modifier_for(m))
        .map(|def| def.kanata(ctx.convention).to_string())
        .collect()
}

/// True when `action` is a single key name that `unmod` can wrap.
fn is_plain_key(action: &str) -> bool {
    !action.is_empty() && action.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Renders `(fork <default> (unmod (<released>) <morphed>) (<mods>))`.
///
/// The triggering modifiers are released around the morphed key unless
/// `keep-mods` lists them.
pub fn render(
    ctx: &mut TransformContext<'_>,
    name: &str,
    morph: &ModMorph,
    binding: &Binding,
) -> Result<Rendered, ConversionError> {
    let mut rendered = Rendered::default();
    let default = ctx.binding(&morph.default)?;
    let default = rendered.absorb(default);
    let morphed = ctx.binding(&morph.morphed)?;
    let morphed = rendered.absorb(morphed);

    let released = modifier_keys(ctx, morph.mods & !morph.keep_mods);
    let mut todos = Vec::new();
    let morphed = if released.is_empty() {
        morphed
    } else if is_plain_key(&morphed) {
        format!("(unmod ({}) {morphed})", released.join(" "))
    } else {
        todos.push(format!(
            ";; TODO: {name}: {} stay held for {morphed}",
            released.join(" ")
        ));
        morphed
    };

    let alias = alias_name(name, &binding.params);
    rendered.definitions.push(Definition::Alias {
        name: alias.clone(),
        body: format!(
            "(fork {default} {morphed} ({}))",
            modifier_keys(ctx, morph.mods).join(" ")
        ),
        todos,
    });
    rendered.action = format!("@{alias}");
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::diagnostics::ErrorManager;
    use crate::keycodes::{KeycodeDb, ModifierConvention};
    use crate::models::{Behavior, BehaviorRef, KeymapConfig};

    fn render_morph(morph: ModMorph) -> Definition {
        let mut config = KeymapConfig::default();
        config
            .behaviors
            .insert("morph".into(), Behavior::ModMorph(morph));
        let mut errors = ErrorManager::default();
        let keys = source_keys();
        let mut ctx = TransformContext::new(
            &config,
            KeycodeDb::builtin(),
            ModifierConvention::Pc,
            &keys,
            &mut errors,
        );

        let binding = Binding::new(BehaviorRef::Defined("morph".into()), vec![], 1, 1);
        let rendered = ctx.binding(&binding).unwrap();
        assert_eq!(rendered.action, "@morph");
        rendered.definitions[0].clone()
    }

    #[test]
    fn test_fork_alias() {
        let definition = render_morph(ModMorph {
            default: kp("BSPC"),
            morphed: kp("DEL"),
            mods: 0x22,
            keep_mods: 0,
        });
        match definition {
            Definition::Alias { body, todos, .. } => {
                assert_eq!(body, "(fork bspc (unmod (lsft rsft) del) (lsft rsft))");
                assert!(todos.is_empty());
            }
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn test_keep_mods_stay_held() {
        let definition = render_morph(ModMorph {
            default: kp("BSPC"),
            morphed: kp("DEL"),
            mods: 0x22,
            keep_mods: 0x20,
        });
        match definition {
            Definition::Alias { body, todos, .. } => {
                assert_eq!(body, "(fork bspc (unmod (lsft) del) (lsft rsft))");
                assert!(todos.is_empty());
            }
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn test_all_mods_kept_needs_no_unmod() {
        let definition = render_morph(ModMorph {
            default: kp("COMMA"),
            morphed: kp("SEMI"),
            mods: 0x02,
            keep_mods: 0x02,
        });
        match definition {
            Definition::Alias { body, .. } => {
                assert!(!body.contains("unmod"));
                assert!(body.starts_with("(fork "));
            }
            other => panic!("expected alias, got {other:?}"),
        }
    }
}
