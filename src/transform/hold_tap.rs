//! Hold-tap behaviors (`&mt`, `&lt`, and `zmk,behavior-hold-tap` nodes) to
//! Kanata's `tap-hold` family.

use super::{alias_name, Definition, Rendered, TransformContext};
use crate::diagnostics::ConversionError;
use crate::models::{Binding, Flavor, HoldTap, Param};

/// Timing variables declared by the `defvar` block.
pub const TAP_TIME_VAR: &str = "$tap-time";
/// See [`TAP_TIME_VAR`].
pub const HOLD_TIME_VAR: &str = "$hold-time";

/// Kanata action name for a flavor.
#[must_use]
pub const fn kanata_form(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::TapPreferred => "tap-hold",
        Flavor::HoldPreferred | Flavor::TapUnlessInterrupted => "tap-hold-press",
        Flavor::Balanced => "tap-hold-release",
    }
}

/// Properties with no Kanata counterpart, as comment lines.
#[must_use]
pub fn todos(name: &str, hold_tap: &HoldTap) -> Vec<String> {
    let mut todos = Vec::new();
    if hold_tap.flavor == Flavor::TapUnlessInterrupted {
        todos.push(format!(
            ";; TODO: {name}: flavor tap-unless-interrupted approximated with tap-hold-press"
        ));
    }
    if hold_tap.retro_tap {
        todos.push(format!(";; TODO: {name}: retro-tap has no Kanata equivalent"));
    }
    if hold_tap.hold_trigger_on_release {
        todos.push(format!(
            ";; TODO: {name}: hold-trigger-on-release has no Kanata equivalent"
        ));
    }
    if let Some(ms) = hold_tap.require_prior_idle_ms.filter(|&ms| ms > 0) {
        todos.push(format!(
            ";; TODO: {name}: require-prior-idle-ms {ms} has no Kanata equivalent"
        ));
    }
    todos
}

/// Renders `binding` (two parameters: hold, then tap) as a `tap-hold` alias.
pub fn render(
    ctx: &mut TransformContext<'_>,
    name: &str,
    hold_tap: &HoldTap,
    binding: &Binding,
) -> Result<Rendered, ConversionError> {
    let params = &binding.params;
    let hold_param: Vec<Param> = params.first().cloned().into_iter().collect();
    let tap_param: Vec<Param> = params.get(1).cloned().into_iter().collect();

    let mut rendered = Rendered::default();
    let hold = ctx.apply(&hold_tap.hold, &hold_param, binding)?;
    let hold = rendered.absorb(hold);
    let tap = ctx.apply(&hold_tap.tap, &tap_param, binding)?;
    let tap = rendered.absorb(tap);

    let tap_timeout = hold_tap
        .quick_tap_ms
        .map_or_else(|| TAP_TIME_VAR.to_string(), |ms| ms.to_string());
    let hold_timeout = hold_tap
        .tapping_term_ms
        .or(hold_tap.hold_time_ms)
        .map_or_else(|| HOLD_TIME_VAR.to_string(), |ms| ms.to_string());

    let body = if hold_tap.hold_trigger_positions.is_empty() {
        format!(
            "({} {tap_timeout} {hold_timeout} {tap} {hold})",
            kanata_form(hold_tap.flavor)
        )
    } else {
        let early_tap: Vec<&str> = ctx
            .source_keys
            .iter()
            .enumerate()
            .filter(|(position, _)| !hold_tap.hold_trigger_positions.contains(position))
            .map(|(_, key)| key.as_str())
            .collect();
        format!(
            "(tap-hold-release-keys {tap_timeout} {hold_timeout} {tap} {hold} ({}))",
            early_tap.join(" ")
        )
    };

    let alias = alias_name(name, params);
    let definition = Definition::Alias {
        name: alias.clone(),
        body,
        todos: todos(name, hold_tap),
    };
    rendered.definitions.push(definition);
    rendered.action = format!("@{alias}");
    Ok(rendered)
}
