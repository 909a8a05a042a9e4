//! The `defsrc` key list.
//!
//! Kanata maps layers positionally onto `defsrc`, so it needs one distinct
//! physical key name per ZMK key position. Positions whose base-layer binding
//! names a plain key use that key; the rest are filled from unused keys.

use crate::diagnostics::{Component, ConversionError, ErrorKind, ErrorManager, Severity};
use crate::keycodes::{numeric, KeycodeDb, ModifierConvention, KEYBOARD_PAGE};
use crate::models::{Behavior, BehaviorRef, Binding, Builtin, KeymapConfig, Param};
use std::collections::HashSet;
use tracing::debug;

fn plain_key(param: &Param, db: &KeycodeDb, convention: ModifierConvention) -> Option<String> {
    match param {
        Param::Key(name) => {
            if let Some(modifier) = db.modifier(name) {
                return Some(modifier.kanata(convention).to_string());
            }
            db.get(name)
                .filter(|def| def.implicit_mods == 0 && def.page == KEYBOARD_PAGE)
                .map(|def| def.kanata.clone())
        }
        Param::Number(value) => {
            let encoded = numeric::decode(*value)?;
            if encoded.modifiers != 0 || encoded.page != KEYBOARD_PAGE {
                return None;
            }
            db.by_usage(encoded.page, encoded.usage, convention)
        }
        Param::Modifier(_) | Param::Malformed(_) => None,
    }
}

/// The key a base-layer binding naturally sits on, if any.
fn natural_key(
    binding: &Binding,
    config: &KeymapConfig,
    db: &KeycodeDb,
    convention: ModifierConvention,
) -> Option<String> {
    let tap_is_key = |tap: &BehaviorRef| *tap == BehaviorRef::Builtin(Builtin::KeyPress);
    let param = match &binding.behavior {
        BehaviorRef::Builtin(Builtin::KeyPress) => binding.params.first(),
        BehaviorRef::Builtin(Builtin::ModTap) if tap_is_key(&config.builtins.mod_tap.tap) => {
            binding.params.get(1)
        }
        BehaviorRef::Builtin(Builtin::LayerTap) if tap_is_key(&config.builtins.layer_tap.tap) => {
            binding.params.get(1)
        }
        BehaviorRef::Defined(name) => match config.behaviors.get(name) {
            Some(Behavior::KeyPress) => binding.params.first(),
            Some(Behavior::HoldTap(hold_tap)) if tap_is_key(&hold_tap.tap) => binding.params.get(1),
            _ => None,
        },
        _ => None,
    }?;
    plain_key(param, db, convention)
}

/// Keys available for positions without a natural key, in a fixed order.
fn filler_pool(db: &KeycodeDb, convention: ModifierConvention) -> Vec<String> {
    let mut pool: Vec<String> = db
        .iter()
        .filter(|def| def.implicit_mods == 0 && def.page == KEYBOARD_PAGE)
        .map(|def| def.kanata.clone())
        .collect();
    for modifier in crate::models::Modifier::ALL {
        if let Some(def) = db.modifier_for(modifier) {
            pool.push(def.kanata(convention).to_string());
        }
    }
    pool
}

/// One distinct source key per key position of the first layer.
///
/// Running out of distinct keys is reported at Error severity.
pub fn source_keys(
    config: &KeymapConfig,
    db: &KeycodeDb,
    convention: ModifierConvention,
    errors: &mut ErrorManager,
) -> Result<Vec<String>, ConversionError> {
    let Some(base) = config.layers.first() else {
        return Ok(Vec::new());
    };

    let mut used: HashSet<String> = HashSet::new();
    let mut slots: Vec<Option<String>> = base
        .bindings
        .iter()
        .map(|binding| {
            natural_key(binding, config, db, convention).filter(|key| used.insert(key.clone()))
        })
        .collect();

    let mut pool = filler_pool(db, convention)
        .into_iter()
        .filter(|key| !used.contains(key));
    let mut filled = 0usize;
    for slot in &mut slots {
        if slot.is_none() {
            *slot = pool.next();
            filled += 1;
        }
    }

    let missing = slots.iter().filter(|s| s.is_none()).count();
    if missing > 0 {
        errors.report(
            ConversionError::new(
                ErrorKind::ExtractionError,
                Component::Assembler,
                format!(
                    "layer '{}' has {} key positions, more than there are distinct source keys",
                    base.name,
                    slots.len()
                ),
            )
            .with_severity(Severity::Error),
        )?;
    }

    debug!(keys = slots.len(), filled, "built defsrc");
    Ok(slots.into_iter().flatten().collect())
}
