//! Layer switching (`&mo`, `&to`, `&tog`, `&sl`) and conditional layers.

use super::{Rendered, TransformContext};
use crate::diagnostics::{Component, ConversionError};
use crate::models::{Binding, ConditionalLayer, LayerKind};

/// Release timeout used for `&sl`, matching ZMK's sticky-key default.
pub const STICKY_LAYER_TIMEOUT_MS: u32 = 1000;

/// Kanata action for switching to `layer`.
#[must_use]
pub fn action(kind: LayerKind, layer: &str) -> String {
    match kind {
        LayerKind::Momentary => format!("(layer-while-held {layer})"),
        LayerKind::To => format!("(layer-switch {layer})"),
        LayerKind::Toggle => format!("(layer-toggle {layer})"),
        LayerKind::Sticky => format!(
            "(one-shot-release {STICKY_LAYER_TIMEOUT_MS} (layer-while-held {layer}))"
        ),
    }
}

/// Renders a layer binding; the first parameter names the layer.
pub fn render(
    ctx: &mut TransformContext<'_>,
    kind: LayerKind,
    binding: &Binding,
) -> Result<Rendered, ConversionError> {
    match ctx.layer_ref(binding.params.first(), Component::Layer, binding)? {
        Some(layer) => Ok(Rendered::inline(action(kind, &layer))),
        None => Ok(Rendered::placeholder(format!(
            ";; ERROR: {} refers to a missing layer",
            binding.source_text()
        ))),
    }
}

/// Comment block for a conditional layer, which Kanata cannot express.
#[must_use]
pub fn conditional_comment(
    ctx: &TransformContext<'_>,
    name: &str,
    conditional: &ConditionalLayer,
) -> Vec<String> {
    let layer_name = |index: usize| {
        ctx.config
            .layers
            .iter()
            .position(|l| l.index == index)
            .and_then(|position| ctx.layer_names().get(position).cloned())
            .unwrap_or_else(|| format!("<layer {index}>"))
    };

    let ifs: Vec<String> = conditional.if_layers.iter().map(|i| layer_name(*i)).collect();
    vec![
        format!(";; TODO: conditional layer {name} has no Kanata equivalent"),
        format!(
            ";;   when {} are all active, {} should activate",
            ifs.join(" and "),
            layer_name(conditional.then_layer)
        ),
    ]
}
