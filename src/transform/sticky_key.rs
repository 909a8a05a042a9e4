//! Sticky keys (`&sk` and `zmk,behavior-sticky-key` nodes) to Kanata one-shots.

use super::{alias_name, Definition, Rendered, TransformContext};
use crate::diagnostics::ConversionError;
use crate::models::{Binding, StickyKey};

/// Renders a sticky-key binding as a `one-shot-release` (or, with
/// `quick-release`, `one-shot-press`) alias.
pub fn render(
    ctx: &mut TransformContext<'_>,
    name: &str,
    sticky: &StickyKey,
    binding: &Binding,
) -> Result<Rendered, ConversionError> {
    let mut rendered = Rendered::default();
    let inner = ctx.apply(&sticky.binding, &binding.params, binding)?;
    let inner = rendered.absorb(inner);

    let form = if sticky.quick_release {
        "one-shot-press"
    } else {
        "one-shot-release"
    };

    let mut todos = Vec::new();
    if sticky.ignore_modifiers {
        todos.push(format!(";; TODO: {name}: ignore-modifiers has no Kanata equivalent"));
    }

    let alias = alias_name(name, &binding.params);
    rendered.definitions.push(Definition::Alias {
        name: alias.clone(),
        body: format!("({form} {} {inner})", sticky.release_after_ms),
        todos,
    });
    rendered.action = format!("@{alias}");
    Ok(rendered)
}
