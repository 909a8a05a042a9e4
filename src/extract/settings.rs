//! Keymap-wide `tap-time` / `hold-time` settings.

use super::view::NodeView;
use crate::diagnostics::{Component, ConversionError, ErrorManager};
use crate::dts::{NodeId, Root};
use crate::models::GlobalSettings;
use tracing::debug;

/// Reads `tap-time` and `hold-time` from the root node and from any node named
/// `global`, later sources winning. Unset values keep their defaults.
pub fn extract_global_settings(
    root: &Root,
    errors: &mut ErrorManager,
) -> Result<GlobalSettings, ConversionError> {
    let mut settings = GlobalSettings::default();

    let mut sources = vec![NodeId::ROOT];
    sources.extend(root.find_all_by_name("global"));

    for id in sources {
        let view = NodeView::new(root, id);
        if let Some(ms) = view.timing("tap-time", Component::Extractor, errors)? {
            settings.tap_time_ms = ms;
        }
        if let Some(ms) = view.timing("hold-time", Component::Extractor, errors)? {
            settings.hold_time_ms = ms;
        }
    }

    debug!(
        tap_time = settings.tap_time_ms,
        hold_time = settings.hold_time_ms,
        "global settings"
    );
    Ok(settings)
}
