//! Node tree to [`KeymapConfig`].
//!
//! Extraction never aborts on a single bad node: each problem is reported to
//! the run's [`ErrorManager`] and the offending behavior, layer or property is
//! skipped. Only a report that reaches the threshold stops it.

pub mod behaviors;
pub mod bindings;
pub mod layers;
pub mod settings;
pub mod view;

pub use bindings::{is_firmware_only, parse_bindings, resolve_behavior, CellEntry, CellTable};
pub use view::NodeView;

use crate::diagnostics::{ConversionError, ErrorManager};
use crate::dts::Root;
use crate::models::KeymapConfig;
use tracing::info;

/// Builds the keymap model from a parsed tree.
pub fn extract(root: &Root, errors: &mut ErrorManager) -> Result<KeymapConfig, ConversionError> {
    let global_settings = settings::extract_global_settings(root, errors)?;

    let nodes = behaviors::behavior_nodes(root);
    let table = behaviors::cell_table(root, &nodes);
    let builtins = behaviors::extract_builtin_overrides(root, &table, errors)?;
    let behaviors = behaviors::extract_behaviors(root, &nodes, &table, errors)?;
    let layers = layers::extract_layers(root, &table, errors)?;

    info!(
        layers = layers.len(),
        behaviors = behaviors.len(),
        "keymap extracted"
    );

    Ok(KeymapConfig {
        layers,
        behaviors,
        global_settings,
        builtins,
    })
}
