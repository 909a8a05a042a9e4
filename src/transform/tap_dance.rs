//! Tap-dance behaviors to `(tap-dance ...)` aliases.

use super::{alias_name, Definition, Rendered, TransformContext};
use crate::diagnostics::ConversionError;
use crate::models::{Binding, TapDance};

/// Renders `(tap-dance <term> (a b ...))`, one action per tap count.
pub fn render(
    ctx: &mut TransformContext<'_>,
    name: &str,
    tap_dance: &TapDance,
    binding: &Binding,
) -> Result<Rendered, ConversionError> {
    let mut rendered = Rendered::default();
    let mut actions = Vec::with_capacity(tap_dance.bindings.len());
    for step in &tap_dance.bindings {
        let action = ctx.binding(step)?;
        actions.push(rendered.absorb(action));
    }

    let alias = alias_name(name, &binding.params);
    rendered.definitions.push(Definition::Alias {
        name: alias.clone(),
        body: format!(
            "(tap-dance {} ({}))",
            tap_dance.tapping_term_ms,
            actions.join(" ")
        ),
        todos: Vec::new(),
    });
    rendered.action = format!("@{alias}");
    Ok(rendered)
}
